// crowdsale/src/wallets.rs

use crate::{CrowdsaleError, CrowdsaleResult};
use lty_primitives::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Payout destinations for raised value.
///
/// Deletion swaps the last wallet into the freed slot, so indices are not
/// stable across deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSplitter {
    wallets: Vec<Address>,
}

impl WalletSplitter {
    /// Start with a single seed wallet at index 0
    pub fn new(seed: Address) -> Self {
        Self {
            wallets: vec![seed],
        }
    }

    pub fn count(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn all(&self) -> &[Address] {
        &self.wallets
    }

    pub fn get(&self, index: usize) -> CrowdsaleResult<Address> {
        self.wallets
            .get(index)
            .copied()
            .ok_or(CrowdsaleError::IndexOutOfRange {
                index,
                len: self.wallets.len(),
            })
    }

    pub fn add(&mut self, wallet: Address) {
        self.wallets.push(wallet);
    }

    /// Swap-and-pop removal; returns the removed wallet
    pub fn remove(&mut self, index: usize) -> CrowdsaleResult<Address> {
        if index >= self.wallets.len() {
            return Err(CrowdsaleError::IndexOutOfRange {
                index,
                len: self.wallets.len(),
            });
        }
        Ok(self.wallets.swap_remove(index))
    }

    /// Even split of `amount` across all wallets, remainder to wallet 0.
    ///
    /// Returns the payout plan in wallet order; shares always sum to
    /// `amount`.
    pub fn distribute(&self, amount: &Amount) -> CrowdsaleResult<Vec<(Address, Amount)>> {
        if self.wallets.is_empty() {
            return Err(CrowdsaleError::EmptyWalletList);
        }

        let count = Amount::from_u64(self.wallets.len() as u64);
        let share = amount
            .checked_div(&count)
            .ok_or_else(|| CrowdsaleError::Overflow("Wallet share".into()))?;
        let remainder = amount
            .checked_rem(&count)
            .ok_or_else(|| CrowdsaleError::Overflow("Wallet share remainder".into()))?;
        let first = share
            .checked_add(&remainder)
            .ok_or_else(|| CrowdsaleError::Overflow("Wallet share".into()))?;

        let plan = self
            .wallets
            .iter()
            .enumerate()
            .map(|(index, wallet)| {
                let payout = if index == 0 { first.clone() } else { share.clone() };
                (*wallet, payout)
            })
            .collect();

        tracing::debug!("Distribution of {} across {} wallets", amount, self.wallets.len());
        Ok(plan)
    }
}
