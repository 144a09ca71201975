// cli/src/config.rs
use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use lty_crowdsale::{CrowdsaleConfig, UsdcAccounting};
use lty_primitives::{Address, Amount, Timestamp};
use lty_token::TokenConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Scripted sale: deployment parameters plus the contributions to replay.
///
/// Accounts are either `0x`-prefixed hex addresses or free-form labels
/// that are hashed into an address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Deployer of both token and sale
    pub owner: String,
    /// Payout wallets; replaces the deployer wallet when non-empty.
    /// Entries must be distinct and must not name the owner.
    #[serde(default)]
    pub wallets: Vec<String>,
    #[serde(default)]
    pub cashiers: Vec<String>,
    pub token: TokenSection,
    pub sale: SaleSection,
    #[serde(default)]
    pub phases: Vec<PhaseEntry>,
    #[serde(default)]
    pub purchases: Vec<PurchaseEntry>,
    #[serde(default)]
    pub offchain: Vec<OffChainEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalize: Option<FinalizeSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSection {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<Amount>,
    pub tap_period_secs: u64,
    /// Per-period mint allowance set right after deployment
    pub tap_amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSection {
    pub address: String,
    pub deployed_at: DateTime<Utc>,
    /// US cents per ether
    pub price_usdc_per_eth: Amount,
    pub min_purchase_usdc: Amount,
    pub lock_phases_after_first_purchase: bool,
    #[serde(default)]
    pub usdc_accounting: UsdcAccounting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub bonus_percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseEntry {
    pub from: String,
    /// Defaults to the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary: Option<String>,
    pub wei: Amount,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffChainEntry {
    pub cashier: String,
    pub beneficiary: String,
    pub tokens: Amount,
    /// US cents received
    pub usdc: Amount,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeSection {
    pub reserve_recipient: String,
    pub at: DateTime<Utc>,
}

fn utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

impl Default for SaleConfig {
    fn default() -> Self {
        let token = TokenConfig::default();
        let sale = CrowdsaleConfig::default();

        Self {
            owner: "owner".into(),
            wallets: vec!["treasury".into(), "operations".into()],
            cashiers: vec!["cashier".into()],
            token: TokenSection {
                address: "lty-token".into(),
                name: token.name,
                symbol: token.symbol,
                decimals: token.decimals,
                cap: token.cap,
                tap_period_secs: token.tap_period_secs,
                tap_amount: Amount::from_u64(10_000_000),
            },
            sale: SaleSection {
                address: "lty-crowdsale".into(),
                deployed_at: utc(1_519_862_400), // 2018-03-01
                price_usdc_per_eth: Amount::from_u64(130_671),
                min_purchase_usdc: sale.min_purchase_usdc,
                lock_phases_after_first_purchase: sale.lock_phases_after_first_purchase,
                usdc_accounting: sale.usdc_accounting,
            },
            phases: vec![
                PhaseEntry {
                    start: utc(1_520_000_000),
                    end: utc(1_539_999_999),
                    bonus_percent: 50,
                },
                PhaseEntry {
                    start: utc(1_540_000_000),
                    end: utc(1_553_000_000),
                    bonus_percent: 30,
                },
            ],
            purchases: vec![
                PurchaseEntry {
                    from: "alice".into(),
                    beneficiary: None,
                    wei: Amount::from_u128(76_569_678_407_350_600),
                    at: utc(1_520_000_100),
                },
                PurchaseEntry {
                    from: "bob".into(),
                    beneficiary: None,
                    wei: Amount::from_u128(76_569_678_407_350_900),
                    at: utc(1_520_000_200),
                },
                PurchaseEntry {
                    from: "carol".into(),
                    beneficiary: None,
                    wei: Amount::from_u128(757_627_935_808_251),
                    at: utc(1_520_000_300),
                },
            ],
            offchain: vec![OffChainEntry {
                cashier: "cashier".into(),
                beneficiary: "dave".into(),
                tokens: Amount::from_u64(9_876),
                usdc: Amount::from_u64(56_789),
                at: utc(1_520_000_400),
            }],
            finalize: Some(FinalizeSection {
                reserve_recipient: "team".into(),
                at: utc(1_553_000_001),
            }),
        }
    }
}

impl SaleConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
        let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).with_context(|| format!("writing {}", path))?;
        Ok(())
    }

    /// Checks the account lists before anything is deployed
    pub fn validate(&self) -> anyhow::Result<()> {
        let owner = resolve_account(&self.owner).context("owner")?;
        let mut seen = BTreeSet::new();
        for wallet in &self.wallets {
            let address = resolve_account(wallet).context("wallet")?;
            if address == owner || !seen.insert(address) {
                anyhow::bail!("duplicate wallet {}", wallet);
            }
        }
        Ok(())
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            name: self.token.name.clone(),
            symbol: self.token.symbol.clone(),
            decimals: self.token.decimals,
            cap: self.token.cap.clone(),
            tap_period_secs: self.token.tap_period_secs,
        }
    }

    pub fn crowdsale_config(&self) -> CrowdsaleConfig {
        CrowdsaleConfig {
            min_purchase_usdc: self.sale.min_purchase_usdc.clone(),
            lock_phases_after_first_purchase: self.sale.lock_phases_after_first_purchase,
            usdc_accounting: self.sale.usdc_accounting,
        }
    }
}

/// `0x` hex address, or a label hashed into one
pub fn resolve_account(account: &str) -> anyhow::Result<Address> {
    let account = account.trim();
    if account.is_empty() {
        anyhow::bail!("empty account");
    }

    if account.starts_with("0x") {
        Address::from_hex(account).with_context(|| format!("invalid address {}", account))
    } else {
        Ok(Address::from_label(account))
    }
}

/// Unix seconds for a configured instant; pre-epoch times are rejected
pub fn to_timestamp(at: &DateTime<Utc>) -> anyhow::Result<Timestamp> {
    Timestamp::try_from(at.timestamp()).with_context(|| format!("{} is before the Unix epoch", at))
}
