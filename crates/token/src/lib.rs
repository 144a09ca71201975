// token/src/lib.rs

//! Mintable, capped LTY token
//!
//! This crate implements:
//! - Balance ledger with transfer and burn
//! - Owner/minter gating on top of `RoleRegistry`
//! - Supply cap and a finalize-time reserve path
//! - Rate-limited minting allowance (mint tap)

pub mod events;
pub mod mint_tap;
pub mod token;

pub use events::TokenEvent;
pub use mint_tap::MintTap;
pub use token::{Token, TokenConfig};

use lty_primitives::{AccessError, Address, Amount, Role};

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Errors that can occur in token operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Unauthorized: {caller} is not a {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("Cannot remove the last owner")]
    LastOwner,

    #[error("Minting is finished")]
    MintingFinished,

    #[error("Supply cap exceeded: cap {cap}, would have {would_have}")]
    CapExceeded { cap: Amount, would_have: Amount },

    #[error("Mint tap exceeded: requested {requested}, remaining {remaining}")]
    TapExceeded { requested: Amount, remaining: Amount },

    #[error("Invalid cap {requested}: below total supply {total_supply}")]
    InvalidCap { requested: Amount, total_supply: Amount },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<AccessError> for TokenError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized { role, caller } => TokenError::Unauthorized { role, caller },
            AccessError::LastOwner => TokenError::LastOwner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_error_mapping() {
        let caller = Address::from_label("x");
        let err: TokenError = AccessError::Unauthorized { role: Role::Minter, caller }.into();
        assert_eq!(err, TokenError::Unauthorized { role: Role::Minter, caller });

        let err: TokenError = AccessError::LastOwner.into();
        assert_eq!(err, TokenError::LastOwner);
    }
}
