// cli/src/simulate.rs
use crate::config::{resolve_account, to_timestamp, SaleConfig};
use anyhow::Context;
use chrono::{DateTime, Utc};
use lty_crowdsale::{Crowdsale, FinalizeReceipt, FixedPriceOracle, SaleSnapshot};
use lty_primitives::{Address, Amount, CallContext, Timestamp};
use lty_token::Token;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One replayed contribution and how the sale answered it
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub at: DateTime<Utc>,
    /// `purchase` or `offchain`
    pub action: &'static str,
    pub account: Address,
    pub beneficiary: Address,
    /// Tokens minted; `None` when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl StepOutcome {
    pub fn accepted(&self) -> bool {
        self.tokens.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenSummary {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: Amount,
    pub cap: Amount,
    pub minting_finished: bool,
    pub holders: BTreeMap<Address, Amount>,
}

/// Final state of a simulated sale
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub token: TokenSummary,
    pub sale: SaleSnapshot,
    pub steps: Vec<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalize: Option<FinalizeReceipt>,
}

enum Step<'a> {
    Purchase(&'a crate::config::PurchaseEntry),
    OffChain(&'a crate::config::OffChainEntry),
}

impl Step<'_> {
    fn at(&self) -> DateTime<Utc> {
        match self {
            Step::Purchase(p) => p.at,
            Step::OffChain(o) => o.at,
        }
    }
}

/// Deploy token and sale as described by `config`, replay every
/// contribution in time order and finalize if requested.
///
/// Rejected contributions are recorded in the report; configuration
/// errors abort the run.
pub fn run(config: &SaleConfig) -> anyhow::Result<SimulationReport> {
    config.validate()?;
    let owner = resolve_account(&config.owner).context("owner")?;
    let deployed_at = to_timestamp(&config.sale.deployed_at)?;
    let deployer = CallContext::new(owner, deployed_at);

    let mut token = Token::new(
        resolve_account(&config.token.address).context("token address")?,
        owner,
        config.token_config(),
    )?;
    let mut sale = Crowdsale::new(
        resolve_account(&config.sale.address).context("sale address")?,
        owner,
        &token,
        Box::new(FixedPriceOracle::new(config.sale.price_usdc_per_eth.clone())),
        config.crowdsale_config(),
    );

    token.add_minter(&deployer, sale.address())?;
    token.add_owner(&deployer, sale.address())?;
    token.set_mint_tap(&deployer, config.token.tap_amount.clone())?;

    configure_sale(config, &mut sale, &deployer)?;

    let mut steps: Vec<Step> = config
        .purchases
        .iter()
        .map(Step::Purchase)
        .chain(config.offchain.iter().map(Step::OffChain))
        .collect();
    steps.sort_by_key(Step::at);

    let mut outcomes = Vec::with_capacity(steps.len());
    for step in steps {
        outcomes.push(replay(step, &mut sale, &mut token)?);
    }

    let finalize = match &config.finalize {
        Some(section) => {
            let recipient = resolve_account(&section.reserve_recipient).context("reserve recipient")?;
            let ctx = CallContext::new(owner, to_timestamp(&section.at)?);
            Some(sale.finalize_crowdsale(&ctx, &mut token, recipient)?)
        }
        None => None,
    };

    tracing::info!(
        "Simulation done: {} steps, supply {} {}",
        outcomes.len(),
        token.total_supply(),
        token.symbol()
    );

    Ok(SimulationReport {
        token: TokenSummary {
            address: token.address(),
            name: token.name().to_string(),
            symbol: token.symbol().to_string(),
            decimals: token.decimals(),
            total_supply: token.total_supply().clone(),
            cap: token.cap().clone(),
            minting_finished: token.minting_finished(),
            holders: token.holders().map(|(a, b)| (*a, b.clone())).collect(),
        },
        sale: sale.snapshot(),
        steps: outcomes,
        finalize,
    })
}

fn configure_sale(config: &SaleConfig, sale: &mut Crowdsale, deployer: &CallContext) -> anyhow::Result<()> {
    for (index, phase) in config.phases.iter().enumerate() {
        sale.add_phase(
            deployer,
            to_timestamp(&phase.start)?,
            to_timestamp(&phase.end)?,
            phase.bonus_percent,
        )
        .with_context(|| format!("phase {}", index))?;
    }

    if let Some((first, rest)) = config.wallets.split_first() {
        // the first wallet goes in last so that removing the deployer's
        // slot swaps it into index 0
        for wallet in rest.iter().chain(std::iter::once(first)) {
            sale.add_wallet(deployer, resolve_account(wallet).context("wallet")?)?;
        }
        sale.del_wallet(deployer, 0)?;
    }

    for cashier in &config.cashiers {
        sale.add_cashier(deployer, resolve_account(cashier).context("cashier")?)?;
    }

    Ok(())
}

fn replay(step: Step, sale: &mut Crowdsale, token: &mut Token) -> anyhow::Result<StepOutcome> {
    let at = step.at();
    let now: Timestamp = to_timestamp(&at)?;

    let outcome = match step {
        Step::Purchase(entry) => {
            let payer = resolve_account(&entry.from).context("purchase payer")?;
            let beneficiary = match &entry.beneficiary {
                Some(b) => resolve_account(b).context("purchase beneficiary")?,
                None => payer,
            };
            let ctx = CallContext::new(payer, now).with_value(entry.wei.clone());

            let (tokens, rejection) = match sale.buy_tokens(&ctx, token, beneficiary) {
                Ok(purchase) => (Some(purchase.tokens), None),
                Err(e) => (None, Some(e.to_string())),
            };
            StepOutcome {
                at,
                action: "purchase",
                account: payer,
                beneficiary,
                tokens,
                rejection,
            }
        }
        Step::OffChain(entry) => {
            let cashier = resolve_account(&entry.cashier).context("cashier")?;
            let beneficiary = resolve_account(&entry.beneficiary).context("off-chain beneficiary")?;
            let ctx = CallContext::new(cashier, now);

            let result = sale.off_chain_purchase(
                &ctx,
                token,
                beneficiary,
                entry.tokens.clone(),
                entry.usdc.clone(),
            );
            let (tokens, rejection) = match result {
                Ok(()) => (Some(entry.tokens.clone()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            StepOutcome {
                at,
                action: "offchain",
                account: cashier,
                beneficiary,
                tokens,
                rejection,
            }
        }
    };

    if let Some(reason) = &outcome.rejection {
        tracing::warn!("{} by {} rejected: {}", outcome.action, outcome.account, reason);
    }
    Ok(outcome)
}

/// `amount` scaled down by `10^scale`, or the raw integer when it does not
/// fit a decimal
pub fn format_scaled(amount: &Amount, scale: u32) -> String {
    amount
        .to_u128()
        .and_then(|v| i128::try_from(v).ok())
        .and_then(|v| Decimal::try_from_i128_with_scale(v, scale).ok())
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("{}e-{}", amount, scale))
}

/// US cents rendered as dollars
pub fn format_usd(cents: &Amount) -> String {
    format!("${}", format_scaled(cents, 2))
}

/// Wei rendered as ether
pub fn format_eth(wei: &Amount) -> String {
    format!("{} ETH", format_scaled(wei, 18).trim_end_matches('0').trim_end_matches('.'))
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = u32::from(self.token.decimals);
        let tokens = |a: &Amount| format!("{} {}", format_scaled(a, decimals), self.token.symbol);

        writeln!(f, "Token {} ({}) at {}", self.token.name, self.token.symbol, self.token.address)?;
        writeln!(f, "  total supply: {}", tokens(&self.token.total_supply))?;
        writeln!(f, "  cap:          {}", tokens(&self.token.cap))?;

        writeln!(f, "Sale: {:?}", self.sale.state)?;
        writeln!(f, "  price:        {} per ETH", format_usd(&self.sale.price_usdc_per_eth))?;
        writeln!(f, "  raised:       {}", format_eth(&self.sale.wei_raised))?;
        writeln!(f, "  raised (USD): {}", format_usd(&self.sale.usdc_raised))?;

        writeln!(f, "Steps:")?;
        for step in &self.steps {
            let at = step.at.to_rfc3339();
            match (&step.tokens, &step.rejection) {
                (Some(minted), _) => writeln!(
                    f,
                    "  {} {:<8} {} -> {}: {}",
                    at,
                    step.action,
                    step.account,
                    step.beneficiary,
                    tokens(minted)
                )?,
                (None, reason) => writeln!(
                    f,
                    "  {} {:<8} {} rejected: {}",
                    at,
                    step.action,
                    step.account,
                    reason.as_deref().unwrap_or("unknown")
                )?,
            }
        }

        writeln!(f, "Wallets:")?;
        for wallet in &self.sale.wallets {
            let forwarded = self.sale.forwarded.get(wallet).cloned().unwrap_or_default();
            writeln!(f, "  {} {}", wallet, format_eth(&forwarded))?;
        }

        if let Some(receipt) = &self.finalize {
            writeln!(
                f,
                "Finalized: reserve {} to {}",
                tokens(&receipt.reserve),
                receipt.reserve_recipient
            )?;
        }

        writeln!(f, "Holders:")?;
        for (holder, balance) in &self.token.holders {
            writeln!(f, "  {} {}", holder, tokens(balance))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lty_crowdsale::SaleState;

    fn label(s: &str) -> Address {
        Address::from_label(s)
    }

    #[test]
    fn test_default_config_simulation() {
        let report = run(&SaleConfig::default()).unwrap();

        let accepted: Vec<_> = report.steps.iter().map(StepOutcome::accepted).collect();
        assert_eq!(accepted, vec![true, true, false, true]);
        assert!(report.steps[2]
            .rejection
            .as_deref()
            .unwrap()
            .contains("below the minimum"));

        assert_eq!(report.token.holders[&label("alice")], Amount::from_u64(15_007));
        assert_eq!(report.token.holders[&label("bob")], Amount::from_u64(15_007));
        assert_eq!(report.token.holders[&label("dave")], Amount::from_u64(9_876));
        assert!(!report.token.holders.contains_key(&label("carol")));

        // 39890 sold, reserve 569 * 30
        let receipt = report.finalize.as_ref().unwrap();
        assert_eq!(receipt.reserve, Amount::from_u64(17_070));
        assert_eq!(report.token.total_supply, Amount::from_u64(56_960));
        assert_eq!(report.token.cap, Amount::from_u64(113_920));
        assert_eq!(report.sale.state, SaleState::Finalized);
        assert_eq!(report.sale.usdc_raised, Amount::from_u64(86_804));
    }

    #[test]
    fn test_configured_wallets_replace_deployer() {
        let report = run(&SaleConfig::default()).unwrap();

        assert_eq!(report.sale.wallets, vec![label("treasury"), label("operations")]);
        let each = Amount::from_u128(76_569_678_407_350_750);
        assert_eq!(report.sale.forwarded[&label("treasury")], each);
        assert_eq!(report.sale.forwarded[&label("operations")], each);
        assert!(!report.sale.forwarded.contains_key(&label("owner")));
    }

    #[test]
    fn test_owner_as_wallet_aborts() {
        let mut config = SaleConfig::default();
        config.wallets = vec!["owner".into(), "treasury".into()];

        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate wallet owner"));
    }

    #[test]
    fn test_steps_replayed_in_time_order() {
        let mut config = SaleConfig::default();
        config.finalize = None;
        config.offchain[0].at = config.purchases[0].at - chrono::Duration::seconds(50);

        let report = run(&config).unwrap();
        assert_eq!(report.steps[0].action, "offchain");
        assert_eq!(report.sale.state, SaleState::Active);
        assert!(report.finalize.is_none());
    }

    #[test]
    fn test_overlapping_phases_abort() {
        let mut config = SaleConfig::default();
        config.phases[1].start = config.phases[0].end;

        let err = run(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("phase 1"));
    }

    #[test]
    fn test_report_rendering() {
        let report = run(&SaleConfig::default()).unwrap();
        let text = report.to_string();

        assert!(text.contains("total supply: 569.60 LTY"));
        assert!(text.contains("raised (USD): $868.04"));
        assert!(text.contains("price:        $1306.71 per ETH"));
        assert!(text.contains("rejected"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["token"]["total_supply"], "56960");
        assert_eq!(json["steps"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_usd(&Amount::from_u64(10_005)), "$100.05");
        assert_eq!(format_eth(&Amount::from_u128(1_500_000_000_000_000_000)), "1.5 ETH");
        assert_eq!(format_eth(&Amount::zero()), "0 ETH");
        assert_eq!(format_scaled(&Amount::from_u64(7), 0), "7");
    }
}
