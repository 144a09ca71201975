// token/src/events.rs

use lty_primitives::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Observable token state changes, collected in emission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    OwnerAdded { owner: Address },
    OwnerRemoved { owner: Address },
    MinterAdded { minter: Address },
    MinterRemoved { minter: Address },
    MintTapSet { amount: Amount, period_start: Timestamp },
    Mint { to: Address, amount: Amount },
    MintFinished,
    CapChanged { cap: Amount },
    Transfer { from: Address, to: Address, amount: Amount },
    Burn { burner: Address, amount: Amount },
}

impl TokenEvent {
    /// Event name as exposed to log consumers
    pub fn name(&self) -> &'static str {
        match self {
            TokenEvent::OwnerAdded { .. } => "OwnerAdded",
            TokenEvent::OwnerRemoved { .. } => "OwnerRemoved",
            TokenEvent::MinterAdded { .. } => "MinterAdded",
            TokenEvent::MinterRemoved { .. } => "MinterRemoved",
            TokenEvent::MintTapSet { .. } => "MintTapSet",
            TokenEvent::Mint { .. } => "Mint",
            TokenEvent::MintFinished => "MintFinished",
            TokenEvent::CapChanged { .. } => "CapChanged",
            TokenEvent::Transfer { .. } => "Transfer",
            TokenEvent::Burn { .. } => "Burn",
        }
    }
}
