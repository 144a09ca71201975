// cli/src/quote.rs
use crate::simulate::{format_eth, format_scaled, format_usd};
use lty_crowdsale::oracle;
use lty_primitives::Amount;
use serde::Serialize;
use std::fmt;

/// Price of a contribution without touching any sale state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub wei: Amount,
    pub price_usdc_per_eth: Amount,
    pub bonus_percent: u32,
    pub decimals: u8,
    pub usdc_value: Amount,
    pub token_amount: Amount,
}

pub fn quote(price_usdc_per_eth: Amount, wei: Amount, bonus_percent: u32, decimals: u8) -> anyhow::Result<Quote> {
    let usdc_value = oracle::usdc_value(&wei, &price_usdc_per_eth)
        .ok_or_else(|| anyhow::anyhow!("USD value of {} wei overflows", wei))?;
    let token_amount = oracle::token_amount(&usdc_value, bonus_percent, decimals)
        .ok_or_else(|| anyhow::anyhow!("token amount for {} cents overflows", usdc_value))?;

    Ok(Quote {
        wei,
        price_usdc_per_eth,
        bonus_percent,
        decimals,
        usdc_value,
        token_amount,
    })
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "value:  {} ({} wei)", format_eth(&self.wei), self.wei)?;
        writeln!(f, "price:  {} per ETH", format_usd(&self.price_usdc_per_eth))?;
        writeln!(f, "usd:    {} ({} cents)", format_usd(&self.usdc_value), self.usdc_value)?;
        writeln!(
            f,
            "tokens: {} ({} units, bonus {}%)",
            format_scaled(&self.token_amount, u32::from(self.decimals)),
            self.token_amount,
            self.bonus_percent
        )
    }
}
