// primitives/src/lib.rs

//! Shared primitives for the LTY token and crowdsale
//!
//! This crate provides:
//! - Account addresses
//! - Bounded (uint256) token and value amounts
//! - Call context carrying caller identity, attached value and time
//! - Role registry used for owner/minter/cashier gating

pub mod address;
pub mod amount;
pub mod context;
pub mod roles;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use context::CallContext;
pub use roles::{AccessError, Role, RoleRegistry};

/// Timestamp in Unix epoch seconds
pub type Timestamp = u64;

/// Wei per ether (value amounts are denominated in wei)
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
