// crowdsale/src/lib.rs

//! LTY Crowdsale
//!
//! Accepts value contributions during configured bonus phases, prices them
//! in US cents through a price oracle, mints LTY to buyers and forwards the
//! raised value to a list of payout wallets. Finalization mints the reserve
//! allocation and locks the sale.

pub mod events;
pub mod oracle;
pub mod phases;
pub mod sale;
pub mod wallets;

pub use events::SaleEvent;
pub use oracle::{FixedPriceOracle, PriceOracle};
pub use phases::{Phase, PhaseSchedule};
pub use sale::{
    Crowdsale, CrowdsaleConfig, FinalizeReceipt, Purchase, SaleSnapshot, SaleState, UsdcAccounting,
    RESERVE_SHARE_PERCENT,
};
pub use wallets::WalletSplitter;

use lty_primitives::{AccessError, Address, Amount, Role, Timestamp};
use lty_token::TokenError;

/// Result type for crowdsale operations
pub type CrowdsaleResult<T> = Result<T, CrowdsaleError>;

/// Errors that can occur in crowdsale operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrowdsaleError {
    #[error("Unauthorized: {caller} is not a {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("Cannot remove the last owner")]
    LastOwner,

    #[error("No active phase at {0}")]
    NoActivePhase(Timestamp),

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid phase window: {0}")]
    InvalidWindow(String),

    #[error("Crowdsale already finalized")]
    AlreadyFinalized,

    #[error("Wallet list is empty")]
    EmptyWalletList,

    #[error("Contribution carries no value")]
    ZeroValue,

    #[error("Purchase of {usdc} cents is below the minimum of {minimum} cents")]
    BelowMinimumPurchase { usdc: Amount, minimum: Amount },

    #[error("Phases cannot change once contributions have been received")]
    PhasesLocked,

    #[error("Token mismatch: sale is bound to {expected}, got {actual}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl From<AccessError> for CrowdsaleError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthorized { role, caller } => CrowdsaleError::Unauthorized { role, caller },
            AccessError::LastOwner => CrowdsaleError::LastOwner,
        }
    }
}
