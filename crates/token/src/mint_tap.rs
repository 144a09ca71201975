// token/src/mint_tap.rs

use crate::{TokenError, TokenResult};
use lty_primitives::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Per-period minting allowance.
///
/// A zero tap blocks minting entirely, which is the state right after
/// construction. Periods advance in whole multiples of `period_length` from
/// the point the tap was last set, so windows stay aligned no matter when
/// the next mint happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTap {
    /// Allowance per period
    tap_amount: Amount,
    /// Start of the current period
    period_start: Timestamp,
    /// Amount minted since `period_start`
    minted_in_period: Amount,
    /// Period length in seconds
    period_length: u64,
}

impl MintTap {
    /// Default period length (one hour)
    pub const DEFAULT_PERIOD_SECS: u64 = 3_600;

    /// Create a closed tap with the given period length
    pub fn new(period_length: u64) -> TokenResult<Self> {
        if period_length == 0 {
            return Err(TokenError::InvalidConfiguration(
                "Mint tap period must be at least one second".into(),
            ));
        }

        Ok(Self {
            tap_amount: Amount::zero(),
            period_start: 0,
            minted_in_period: Amount::zero(),
            period_length,
        })
    }

    pub fn tap_amount(&self) -> &Amount {
        &self.tap_amount
    }

    pub fn period_start(&self) -> Timestamp {
        self.period_start
    }

    pub fn minted_in_period(&self) -> &Amount {
        &self.minted_in_period
    }

    pub fn period_length(&self) -> u64 {
        self.period_length
    }

    /// Reset the allowance and restart the period at `now`
    pub fn set(&mut self, amount: Amount, now: Timestamp) {
        self.tap_amount = amount;
        self.period_start = now;
        self.minted_in_period = Amount::zero();
    }

    /// Start of the period containing `now`, and whether it differs from
    /// the stored one. Times before the stored start count as the current
    /// period.
    fn window(&self, now: Timestamp) -> (Timestamp, bool) {
        let elapsed = now.saturating_sub(self.period_start);
        if elapsed < self.period_length {
            return (self.period_start, false);
        }

        let periods = elapsed / self.period_length;
        (self.period_start + periods * self.period_length, true)
    }

    /// Allowance left in the period containing `now`
    pub fn remaining(&self, now: Timestamp) -> Amount {
        let (_, rolled) = self.window(now);
        if rolled {
            self.tap_amount.clone()
        } else {
            self.tap_amount.saturating_sub(&self.minted_in_period)
        }
    }

    /// Charge `amount` against the allowance. Leaves the tap untouched on
    /// failure.
    pub fn consume(&mut self, amount: &Amount, now: Timestamp) -> TokenResult<()> {
        let (start, rolled) = self.window(now);
        let minted = if rolled {
            Amount::zero()
        } else {
            self.minted_in_period.clone()
        };

        let next = minted
            .checked_add(amount)
            .ok_or_else(|| TokenError::Overflow("Minted in period overflow".into()))?;

        if next > self.tap_amount {
            return Err(TokenError::TapExceeded {
                requested: amount.clone(),
                remaining: self.tap_amount.saturating_sub(&minted),
            });
        }

        if rolled {
            tracing::debug!(
                "Mint tap period rolled from {} to {}",
                self.period_start,
                start
            );
        }

        self.period_start = start;
        self.minted_in_period = next;
        Ok(())
    }
}

impl Default for MintTap {
    fn default() -> Self {
        Self {
            tap_amount: Amount::zero(),
            period_start: 0,
            minted_in_period: Amount::zero(),
            period_length: Self::DEFAULT_PERIOD_SECS,
        }
    }
}
