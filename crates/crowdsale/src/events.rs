// crowdsale/src/events.rs

use crate::phases::Phase;
use lty_primitives::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Observable sale state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    OwnerAdded { owner: Address },
    OwnerRemoved { owner: Address },
    CashierAdded { cashier: Address },
    CashierRemoved { cashier: Address },
    TotalPhasesChanged { total: usize },
    SetPhase { index: usize, phase: Phase },
    DelPhase { index: usize },
    WalletAdded { wallet: Address },
    WalletRemoved { index: usize, wallet: Address },
    OracleChanged { price_usdc_per_eth: Amount },
    TokenPurchase {
        purchaser: Address,
        beneficiary: Address,
        value: Amount,
        amount: Amount,
        bonus_percent: u32,
    },
    OffChainTokenPurchase {
        beneficiary: Address,
        tokens_sold: Amount,
        usdc_amount: Amount,
    },
    Finalized { reserve_recipient: Address, reserve: Amount },
}

impl SaleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SaleEvent::OwnerAdded { .. } => "OwnerAdded",
            SaleEvent::OwnerRemoved { .. } => "OwnerRemoved",
            SaleEvent::CashierAdded { .. } => "CashierAdded",
            SaleEvent::CashierRemoved { .. } => "CashierRemoved",
            SaleEvent::TotalPhasesChanged { .. } => "TotalPhasesChanged",
            SaleEvent::SetPhase { .. } => "SetPhase",
            SaleEvent::DelPhase { .. } => "DelPhase",
            SaleEvent::WalletAdded { .. } => "WalletAdded",
            SaleEvent::WalletRemoved { .. } => "WalletRemoved",
            SaleEvent::OracleChanged { .. } => "OracleChanged",
            SaleEvent::TokenPurchase { .. } => "TokenPurchase",
            SaleEvent::OffChainTokenPurchase { .. } => "OffChainTokenPurchase",
            SaleEvent::Finalized { .. } => "Finalized",
        }
    }
}
