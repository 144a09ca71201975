// primitives/src/roles.rs

use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Role enumeration for access checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Administrative authority over the owning aggregate
    Owner,
    /// May mint tokens (subject to cap and tap)
    Minter,
    /// May record off-chain purchases on a sale
    Cashier,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::Minter => "minter",
            Role::Cashier => "cashier",
        };
        f.write_str(name)
    }
}

/// Access control failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Unauthorized: {caller} is not a {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("Cannot remove the last owner")]
    LastOwner,
}

/// Role registry: maps roles to duplicate-free sets of addresses.
///
/// Granting a present member and revoking an absent one are no-ops that
/// report `false`. The owner set can never become empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    members: HashMap<Role, BTreeSet<Address>>,
}

impl RoleRegistry {
    /// Create a registry whose only member is `owner`
    pub fn with_owner(owner: Address) -> Self {
        let mut registry = Self::default();
        registry.grant(Role::Owner, owner);
        registry
    }

    /// Check if an address has a role
    pub fn has_role(&self, role: Role, address: &Address) -> bool {
        self.members
            .get(&role)
            .map(|set| set.contains(address))
            .unwrap_or(false)
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.has_role(Role::Owner, address)
    }

    pub fn is_minter(&self, address: &Address) -> bool {
        self.has_role(Role::Minter, address)
    }

    pub fn is_cashier(&self, address: &Address) -> bool {
        self.has_role(Role::Cashier, address)
    }

    /// Fail with `Unauthorized` unless `caller` holds `role`
    pub fn require(&self, role: Role, caller: &Address) -> Result<(), AccessError> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            tracing::warn!("Rejected call from {}: {} role required", caller, role);
            Err(AccessError::Unauthorized { role, caller: *caller })
        }
    }

    /// Add an address to a role. Returns `true` if it was not yet a member.
    pub fn grant(&mut self, role: Role, address: Address) -> bool {
        self.members.entry(role).or_default().insert(address)
    }

    /// Remove an address from a role. Returns `true` if it was a member.
    pub fn revoke(&mut self, role: Role, address: &Address) -> Result<bool, AccessError> {
        let Some(set) = self.members.get_mut(&role) else {
            return Ok(false);
        };

        if !set.contains(address) {
            return Ok(false);
        }

        if role == Role::Owner && set.len() == 1 {
            return Err(AccessError::LastOwner);
        }

        Ok(set.remove(address))
    }

    /// Members of a role in address order
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, role: Role) -> usize {
        self.members.get(&role).map(BTreeSet::len).unwrap_or(0)
    }
}
