// crowdsale/src/oracle.rs

use lty_primitives::{Amount, WEI_PER_ETHER};
use std::fmt;

/// Source of the ether price in US cents.
///
/// The feed behind it (exchange API, on-chain oracle) lives outside this
/// workspace; the sale only ever asks for the current quote.
pub trait PriceOracle: fmt::Debug + Send + Sync {
    /// US cents per 1 ether
    fn price_usdc_per_eth(&self) -> Amount;
}

/// Oracle returning a constant price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPriceOracle {
    price: Amount,
}

impl FixedPriceOracle {
    pub fn new(price_usdc_per_eth: impl Into<Amount>) -> Self {
        Self {
            price: price_usdc_per_eth.into(),
        }
    }
}

impl PriceOracle for FixedPriceOracle {
    fn price_usdc_per_eth(&self) -> Amount {
        self.price.clone()
    }
}

/// `wei * price / 10^18`, truncating
pub fn usdc_value(wei: &Amount, price_usdc_per_eth: &Amount) -> Option<Amount> {
    wei.checked_mul(price_usdc_per_eth)?
        .checked_div(&Amount::from_u128(WEI_PER_ETHER))
}

/// Token units bought with `usdc` cents at `bonus_percent`.
///
/// One token is priced at one US dollar, so the cent value is scaled by
/// `10^decimals / 100` and by `(100 + bonus) / 100` with a single truncating
/// division at the end.
pub fn token_amount(usdc: &Amount, bonus_percent: u32, decimals: u8) -> Option<Amount> {
    let multiplier = Amount::from_u64(100 + u64::from(bonus_percent));
    usdc.checked_mul(&Amount::pow10(u32::from(decimals)))?
        .checked_mul(&multiplier)?
        .checked_div(&Amount::from_u64(100 * 100))
}
