// crowdsale/src/sale.rs

use crate::{
    events::SaleEvent,
    oracle::{self, PriceOracle},
    phases::{Phase, PhaseSchedule},
    wallets::WalletSplitter,
    CrowdsaleError, CrowdsaleResult,
};
use lty_primitives::{Address, Amount, CallContext, Role, RoleRegistry, Timestamp};
use lty_token::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of the post-finalization supply minted as reserve, in percent
pub const RESERVE_SHARE_PERCENT: u64 = 30;

/// Sale lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleState {
    /// Accepting contributions and configuration changes
    Active,
    /// Terminal: reserve minted, nothing else accepted
    Finalized,
}

/// How `usdc_raised` grows on each on-chain purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsdcAccounting {
    /// Add the cent value of the cumulative wei raised after the purchase,
    /// as the deployed LTY sale counts it
    #[default]
    CumulativeWei,
    /// Add the cent value of the purchase itself
    PerPurchase,
}

/// Sale configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrowdsaleConfig {
    /// Smallest accepted contribution in US cents
    pub min_purchase_usdc: Amount,
    /// Reject phase changes once any wei has been raised
    pub lock_phases_after_first_purchase: bool,
    #[serde(default)]
    pub usdc_accounting: UsdcAccounting,
}

impl Default for CrowdsaleConfig {
    fn default() -> Self {
        Self {
            min_purchase_usdc: Amount::from_u64(1_000), // 10 USD
            lock_phases_after_first_purchase: true,
            usdc_accounting: UsdcAccounting::CumulativeWei,
        }
    }
}

/// Result of a successful on-chain purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub purchaser: Address,
    pub beneficiary: Address,
    /// Wei received
    pub value: Amount,
    /// Cent value of `value`
    pub usdc_value: Amount,
    pub bonus_percent: u32,
    /// Token units minted to the beneficiary
    pub tokens: Amount,
    /// Value forwarded to each wallet
    pub payouts: Vec<(Address, Amount)>,
}

/// Result of finalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    pub reserve_recipient: Address,
    pub reserve: Amount,
    pub total_supply: Amount,
    pub cap: Amount,
}

/// Read-only view of the sale state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSnapshot {
    pub state: SaleState,
    pub wei_raised: Amount,
    pub usdc_raised: Amount,
    pub price_usdc_per_eth: Amount,
    pub phases: Vec<Option<Phase>>,
    pub wallets: Vec<Address>,
    pub owners: Vec<Address>,
    pub cashiers: Vec<Address>,
    pub forwarded: BTreeMap<Address, Amount>,
}

/// Crowdsale bound to one token.
///
/// Every operation validates all of its preconditions (including the token
/// mint) before writing any sale state, so a failed call changes nothing.
#[derive(Debug)]
pub struct Crowdsale {
    /// Sale identity, used as caller when minting
    address: Address,
    /// Token this sale mints
    token: Address,
    token_decimals: u8,
    state: SaleState,
    /// Owner and cashier sets
    roles: RoleRegistry,
    phases: PhaseSchedule,
    wallets: WalletSplitter,
    oracle: Box<dyn PriceOracle>,
    config: CrowdsaleConfig,
    wei_raised: Amount,
    usdc_raised: Amount,
    /// Total value forwarded per wallet
    forwarded: BTreeMap<Address, Amount>,
    events: Vec<SaleEvent>,
}

impl Crowdsale {
    /// Deploy a sale at `address` for `token`. The deployer becomes the
    /// sole owner and the seed payout wallet.
    pub fn new(
        address: Address,
        deployer: Address,
        token: &Token,
        oracle: Box<dyn PriceOracle>,
        config: CrowdsaleConfig,
    ) -> Self {
        tracing::info!(
            "Crowdsale deployed at {} for token {} ({}), price {} cents/ETH",
            address,
            token.address(),
            token.symbol(),
            oracle.price_usdc_per_eth()
        );

        Self {
            address,
            token: token.address(),
            token_decimals: token.decimals(),
            state: SaleState::Active,
            roles: RoleRegistry::with_owner(deployer),
            phases: PhaseSchedule::new(),
            wallets: WalletSplitter::new(deployer),
            oracle,
            config,
            wei_raised: Amount::zero(),
            usdc_raised: Amount::zero(),
            forwarded: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    // ---- reads ----

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token_address(&self) -> Address {
        self.token
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == SaleState::Finalized
    }

    pub fn config(&self) -> &CrowdsaleConfig {
        &self.config
    }

    pub fn wei_raised(&self) -> &Amount {
        &self.wei_raised
    }

    pub fn usdc_raised(&self) -> &Amount {
        &self.usdc_raised
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.roles.is_owner(address)
    }

    pub fn is_cashier(&self, address: &Address) -> bool {
        self.roles.is_cashier(address)
    }

    pub fn price_usdc_per_eth(&self) -> Amount {
        self.oracle.price_usdc_per_eth()
    }

    pub fn phases(&self) -> &PhaseSchedule {
        &self.phases
    }

    pub fn total_phases(&self) -> usize {
        self.phases.total_phases()
    }

    pub fn phase(&self, index: usize) -> CrowdsaleResult<Option<Phase>> {
        self.phases.phase(index)
    }

    pub fn is_in_phase(&self, now: Timestamp) -> bool {
        self.phases.is_in_phase(now)
    }

    pub fn bonus_percent(&self, now: Timestamp) -> CrowdsaleResult<u32> {
        self.phases.bonus_percent(now)
    }

    pub fn validate_phase_dates(&self, start: Timestamp, end: Timestamp) -> bool {
        self.phases.validate_phase_dates(start, end)
    }

    pub fn wallets_count(&self) -> usize {
        self.wallets.count()
    }

    pub fn wallet(&self, index: usize) -> CrowdsaleResult<Address> {
        self.wallets.get(index)
    }

    /// Total value forwarded to `wallet` so far
    pub fn forwarded_to(&self, wallet: &Address) -> Amount {
        self.forwarded.get(wallet).cloned().unwrap_or_else(Amount::zero)
    }

    /// Cent value of `wei` at the current oracle price
    pub fn calculate_usdc_value(&self, wei: &Amount) -> CrowdsaleResult<Amount> {
        oracle::usdc_value(wei, &self.oracle.price_usdc_per_eth())
            .ok_or_else(|| CrowdsaleError::Overflow("USD value".into()))
    }

    /// Token units bought by `wei` at `bonus_percent`
    pub fn calculate_token_amount(&self, wei: &Amount, bonus_percent: u32) -> CrowdsaleResult<Amount> {
        let usdc = self.calculate_usdc_value(wei)?;
        oracle::token_amount(&usdc, bonus_percent, self.token_decimals)
            .ok_or_else(|| CrowdsaleError::Overflow("Token amount".into()))
    }

    pub fn snapshot(&self) -> SaleSnapshot {
        SaleSnapshot {
            state: self.state,
            wei_raised: self.wei_raised.clone(),
            usdc_raised: self.usdc_raised.clone(),
            price_usdc_per_eth: self.price_usdc_per_eth(),
            phases: self.phases.slots().to_vec(),
            wallets: self.wallets.all().to_vec(),
            owners: self.roles.members(Role::Owner),
            cashiers: self.roles.members(Role::Cashier),
            forwarded: self.forwarded.clone(),
        }
    }

    /// Drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<SaleEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- guards ----

    fn ensure_active(&self) -> CrowdsaleResult<()> {
        match self.state {
            SaleState::Active => Ok(()),
            SaleState::Finalized => Err(CrowdsaleError::AlreadyFinalized),
        }
    }

    fn ensure_owner_active(&self, ctx: &CallContext) -> CrowdsaleResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        self.ensure_active()
    }

    fn ensure_phases_unlocked(&self) -> CrowdsaleResult<()> {
        if self.config.lock_phases_after_first_purchase && !self.wei_raised.is_zero() {
            return Err(CrowdsaleError::PhasesLocked);
        }
        Ok(())
    }

    fn ensure_token(&self, token: &Token) -> CrowdsaleResult<()> {
        if token.address() != self.token {
            return Err(CrowdsaleError::TokenMismatch {
                expected: self.token,
                actual: token.address(),
            });
        }
        Ok(())
    }

    // ---- roles ----

    pub fn add_owner(&mut self, ctx: &CallContext, owner: Address) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        if self.roles.grant(Role::Owner, owner) {
            tracing::info!("Sale owner added: {}", owner);
            self.events.push(SaleEvent::OwnerAdded { owner });
        }
        Ok(())
    }

    pub fn del_owner(&mut self, ctx: &CallContext, owner: Address) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        if self.roles.revoke(Role::Owner, &owner)? {
            tracing::info!("Sale owner removed: {}", owner);
            self.events.push(SaleEvent::OwnerRemoved { owner });
        }
        Ok(())
    }

    pub fn add_cashier(&mut self, ctx: &CallContext, cashier: Address) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        if self.roles.grant(Role::Cashier, cashier) {
            tracing::info!("Cashier added: {}", cashier);
            self.events.push(SaleEvent::CashierAdded { cashier });
        }
        Ok(())
    }

    pub fn del_cashier(&mut self, ctx: &CallContext, cashier: Address) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        if self.roles.revoke(Role::Cashier, &cashier)? {
            tracing::info!("Cashier removed: {}", cashier);
            self.events.push(SaleEvent::CashierRemoved { cashier });
        }
        Ok(())
    }

    // ---- configuration ----

    pub fn set_oracle(&mut self, ctx: &CallContext, oracle: Box<dyn PriceOracle>) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        let price = oracle.price_usdc_per_eth();
        self.oracle = oracle;

        tracing::info!("Price oracle changed, {} cents/ETH", price);
        self.events.push(SaleEvent::OracleChanged {
            price_usdc_per_eth: price,
        });
        Ok(())
    }

    pub fn set_total_phases(&mut self, ctx: &CallContext, total: usize) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        self.ensure_phases_unlocked()?;
        self.phases.set_total_phases(total);

        tracing::info!("Total phases set to {}", total);
        self.events.push(SaleEvent::TotalPhasesChanged { total });
        Ok(())
    }

    pub fn set_phase(
        &mut self,
        ctx: &CallContext,
        index: usize,
        start_time: Timestamp,
        end_time: Timestamp,
        bonus_percent: u32,
    ) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        self.ensure_phases_unlocked()?;
        let phase = Phase::new(start_time, end_time, bonus_percent);
        self.phases.set_phase(index, phase)?;

        tracing::info!(
            "Phase {} set: [{}, {}] bonus {}%",
            index,
            start_time,
            end_time,
            bonus_percent
        );
        self.events.push(SaleEvent::SetPhase { index, phase });
        Ok(())
    }

    /// Append a phase; returns its index
    pub fn add_phase(
        &mut self,
        ctx: &CallContext,
        start_time: Timestamp,
        end_time: Timestamp,
        bonus_percent: u32,
    ) -> CrowdsaleResult<usize> {
        self.ensure_owner_active(ctx)?;
        self.ensure_phases_unlocked()?;
        let phase = Phase::new(start_time, end_time, bonus_percent);
        let index = self.phases.add_phase(phase)?;

        tracing::info!(
            "Phase {} added: [{}, {}] bonus {}%",
            index,
            start_time,
            end_time,
            bonus_percent
        );
        self.events.push(SaleEvent::SetPhase { index, phase });
        Ok(index)
    }

    pub fn del_phase(&mut self, ctx: &CallContext, index: usize) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        self.ensure_phases_unlocked()?;
        self.phases.del_phase(index)?;

        tracing::info!("Phase {} deleted", index);
        self.events.push(SaleEvent::DelPhase { index });
        Ok(())
    }

    pub fn add_wallet(&mut self, ctx: &CallContext, wallet: Address) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        self.wallets.add(wallet);

        tracing::info!("Wallet added: {} (count {})", wallet, self.wallets.count());
        self.events.push(SaleEvent::WalletAdded { wallet });
        Ok(())
    }

    /// Swap-and-pop removal. The last wallet of an active sale cannot go.
    pub fn del_wallet(&mut self, ctx: &CallContext, index: usize) -> CrowdsaleResult<()> {
        self.ensure_owner_active(ctx)?;
        self.wallets.get(index)?;
        if self.wallets.count() == 1 {
            return Err(CrowdsaleError::EmptyWalletList);
        }

        let wallet = self.wallets.remove(index)?;
        tracing::info!("Wallet removed: {} (count {})", wallet, self.wallets.count());
        self.events.push(SaleEvent::WalletRemoved { index, wallet });
        Ok(())
    }

    // ---- purchases ----

    /// Buy tokens for `beneficiary` with the value attached to `ctx`
    pub fn buy_tokens(
        &mut self,
        ctx: &CallContext,
        token: &mut Token,
        beneficiary: Address,
    ) -> CrowdsaleResult<Purchase> {
        self.ensure_active()?;
        self.ensure_token(token)?;

        let value = ctx.value.clone();
        if value.is_zero() {
            return Err(CrowdsaleError::ZeroValue);
        }

        let bonus_percent = self.phases.bonus_percent(ctx.timestamp)?;
        let usdc_value = self.calculate_usdc_value(&value)?;
        if usdc_value < self.config.min_purchase_usdc {
            return Err(CrowdsaleError::BelowMinimumPurchase {
                usdc: usdc_value,
                minimum: self.config.min_purchase_usdc.clone(),
            });
        }
        let tokens = self.calculate_token_amount(&value, bonus_percent)?;

        let payouts = self.wallets.distribute(&value)?;
        let forwarded = self.plan_forwarding(&payouts)?;

        let wei_raised = self
            .wei_raised
            .checked_add(&value)
            .ok_or_else(|| CrowdsaleError::Overflow("Wei raised".into()))?;
        let usdc_increment = match self.config.usdc_accounting {
            UsdcAccounting::PerPurchase => usdc_value.clone(),
            UsdcAccounting::CumulativeWei => self.calculate_usdc_value(&wei_raised)?,
        };
        let usdc_raised = self
            .usdc_raised
            .checked_add(&usdc_increment)
            .ok_or_else(|| CrowdsaleError::Overflow("USD raised".into()))?;

        // Last fallible step
        token.mint(&ctx.forward(self.address), beneficiary, tokens.clone())?;

        self.wei_raised = wei_raised;
        self.usdc_raised = usdc_raised;
        self.forwarded.extend(forwarded);

        tracing::info!(
            "Purchase: {} wei ({} cents, bonus {}%) -> {} tokens for {}",
            value,
            usdc_value,
            bonus_percent,
            tokens,
            beneficiary
        );
        self.events.push(SaleEvent::TokenPurchase {
            purchaser: ctx.caller,
            beneficiary,
            value: value.clone(),
            amount: tokens.clone(),
            bonus_percent,
        });

        Ok(Purchase {
            purchaser: ctx.caller,
            beneficiary,
            value,
            usdc_value,
            bonus_percent,
            tokens,
            payouts,
        })
    }

    /// New forwarded totals for every wallet touched by `payouts`
    fn plan_forwarding(&self, payouts: &[(Address, Amount)]) -> CrowdsaleResult<BTreeMap<Address, Amount>> {
        let mut totals = BTreeMap::new();
        for (wallet, share) in payouts {
            let current = totals
                .get(wallet)
                .cloned()
                .unwrap_or_else(|| self.forwarded_to(wallet));
            let next = current
                .checked_add(share)
                .ok_or_else(|| CrowdsaleError::Overflow("Forwarded value".into()))?;
            totals.insert(*wallet, next);
        }
        Ok(totals)
    }

    /// Record a purchase paid outside the chain (fiat, other currencies).
    /// Cashier only; no phase is required.
    pub fn off_chain_purchase(
        &mut self,
        ctx: &CallContext,
        token: &mut Token,
        beneficiary: Address,
        tokens: Amount,
        usdc_amount: Amount,
    ) -> CrowdsaleResult<()> {
        self.roles.require(Role::Cashier, &ctx.caller)?;
        self.ensure_active()?;
        self.ensure_token(token)?;

        let usdc_raised = self
            .usdc_raised
            .checked_add(&usdc_amount)
            .ok_or_else(|| CrowdsaleError::Overflow("USD raised".into()))?;

        token.mint(&ctx.forward(self.address), beneficiary, tokens.clone())?;
        self.usdc_raised = usdc_raised;

        tracing::info!(
            "Off-chain purchase by {}: {} tokens for {} ({} cents)",
            ctx.caller,
            tokens,
            beneficiary,
            usdc_amount
        );
        self.events.push(SaleEvent::OffChainTokenPurchase {
            beneficiary,
            tokens_sold: tokens,
            usdc_amount,
        });
        Ok(())
    }

    // ---- finalization ----

    /// Mint the reserve to `reserve_recipient` and lock the sale.
    ///
    /// The reserve makes up `RESERVE_SHARE_PERCENT` of the resulting supply:
    /// `reserve = supply / 70 * 30`, truncating. The token cap is reset to
    /// twice the resulting supply. Runs exactly once.
    pub fn finalize_crowdsale(
        &mut self,
        ctx: &CallContext,
        token: &mut Token,
        reserve_recipient: Address,
    ) -> CrowdsaleResult<FinalizeReceipt> {
        self.ensure_owner_active(ctx)?;
        self.ensure_token(token)?;

        let reserve = token
            .total_supply()
            .checked_div(&Amount::from_u64(100 - RESERVE_SHARE_PERCENT))
            .and_then(|unit| unit.checked_mul(&Amount::from_u64(RESERVE_SHARE_PERCENT)))
            .ok_or_else(|| CrowdsaleError::Overflow("Reserve".into()))?;

        token.mint_reserve(&ctx.forward(self.address), reserve_recipient, reserve.clone())?;
        self.state = SaleState::Finalized;

        tracing::info!(
            "Crowdsale finalized: reserve {} to {}, supply {}, cap {}",
            reserve,
            reserve_recipient,
            token.total_supply(),
            token.cap()
        );
        self.events.push(SaleEvent::Finalized {
            reserve_recipient,
            reserve: reserve.clone(),
        });

        Ok(FinalizeReceipt {
            reserve_recipient,
            reserve,
            total_supply: token.total_supply().clone(),
            cap: token.cap().clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FixedPriceOracle;
    use lty_token::{TokenConfig, TokenError};

    const NOW: Timestamp = 1_520_000_000;

    fn amt(v: u64) -> Amount {
        Amount::from_u64(v)
    }

    fn ctx(label: &str) -> CallContext {
        CallContext::new(Address::from_label(label), NOW)
    }

    /// Token and sale wired the way a deployment script does it: the sale
    /// is minter and owner of the token and the tap is open.
    fn setup() -> (Token, Crowdsale) {
        let owner = ctx("owner");
        let mut token = Token::new(Address::from_label("token"), owner.caller, TokenConfig::default()).unwrap();
        let sale = Crowdsale::new(
            Address::from_label("sale"),
            owner.caller,
            &token,
            Box::new(FixedPriceOracle::new(130_671u64)),
            CrowdsaleConfig::default(),
        );
        token.add_minter(&owner, sale.address()).unwrap();
        token.add_owner(&owner, sale.address()).unwrap();
        token.set_mint_tap(&owner, amt(10_000_000)).unwrap();
        (token, sale)
    }

    fn open_phase(sale: &mut Crowdsale) {
        let owner = ctx("owner");
        sale.set_total_phases(&owner, 1).unwrap();
        sale.set_phase(&owner, 0, 0, 10_000_000_000_000_000_000, 50).unwrap();
    }

    fn contribution(label: &str, wei: u128) -> CallContext {
        ctx(label).with_value(Amount::from_u128(wei))
    }

    #[test]
    fn test_initial_state() {
        let (_, sale) = setup();
        let owner = Address::from_label("owner");

        assert!(sale.is_owner(&owner));
        assert_eq!(sale.wallet(0), Ok(owner));
        assert_eq!(sale.wallets_count(), 1);
        assert_eq!(sale.total_phases(), 0);
        assert_eq!(sale.state(), SaleState::Active);
        assert_eq!(sale.price_usdc_per_eth(), amt(130_671));
        assert!(sale.wei_raised().is_zero());
    }

    #[test]
    fn test_view_calculations() {
        let (_, sale) = setup();
        let wei = Amount::from_u128(235_615_100_000_000_000);
        assert_eq!(sale.calculate_usdc_value(&wei), Ok(amt(30_788)));
        assert_eq!(sale.calculate_token_amount(&wei, 45), Ok(amt(44_642)));
    }

    #[test]
    fn test_purchase_without_phase_rejected() {
        let (mut token, mut sale) = setup();
        let buyer = contribution("buyer", 1_000_000_000_000_000_000);

        assert_eq!(
            sale.buy_tokens(&buyer, &mut token, buyer.caller),
            Err(CrowdsaleError::NoActivePhase(NOW))
        );
    }

    #[test]
    fn test_zero_and_small_contributions_rejected() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);

        let empty = ctx("buyer");
        assert_eq!(
            sale.buy_tokens(&empty, &mut token, empty.caller),
            Err(CrowdsaleError::ZeroValue)
        );

        let small = contribution("buyer", 757_627_935_808_251);
        assert_eq!(
            sale.buy_tokens(&small, &mut token, small.caller),
            Err(CrowdsaleError::BelowMinimumPurchase { usdc: amt(98), minimum: amt(1_000) })
        );
        assert!(sale.wei_raised().is_zero());
    }

    #[test]
    fn test_purchase_mints_and_accounts() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        sale.take_events();

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        let purchase = sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap();

        assert_eq!(purchase.usdc_value, amt(10_005));
        assert_eq!(purchase.tokens, amt(15_007));
        assert_eq!(purchase.bonus_percent, 50);
        assert_eq!(token.balance_of(&buyer.caller), amt(15_007));
        assert_eq!(sale.wei_raised(), &Amount::from_u128(76_569_678_407_350_600));
        assert_eq!(sale.usdc_raised(), &amt(10_005));
        assert_eq!(
            sale.forwarded_to(&Address::from_label("owner")),
            Amount::from_u128(76_569_678_407_350_600)
        );

        let names: Vec<_> = sale.take_events().iter().map(SaleEvent::name).collect();
        assert_eq!(names, vec!["TokenPurchase"]);
    }

    #[test]
    fn test_failed_mint_changes_nothing() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        let owner = ctx("owner");
        token.del_minter(&owner, sale.address()).unwrap();

        let before = sale.snapshot();
        let buyer = contribution("buyer", 76_569_678_407_350_600);
        let err = sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap_err();

        assert!(matches!(err, CrowdsaleError::Token(TokenError::Unauthorized { .. })));
        assert_eq!(sale.snapshot(), before);
        assert!(token.total_supply().is_zero());
    }

    #[test]
    fn test_tap_exhaustion_propagates() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        token.set_mint_tap(&ctx("owner"), amt(15_000)).unwrap();

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        assert!(matches!(
            sale.buy_tokens(&buyer, &mut token, buyer.caller),
            Err(CrowdsaleError::Token(TokenError::TapExceeded { .. }))
        ));
        assert!(sale.wei_raised().is_zero());
    }

    #[test]
    fn test_wrong_token_rejected() {
        let (_, mut sale) = setup();
        open_phase(&mut sale);
        let mut other = Token::new(Address::from_label("other"), Address::from_label("owner"), TokenConfig::default()).unwrap();

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        assert!(matches!(
            sale.buy_tokens(&buyer, &mut other, buyer.caller),
            Err(CrowdsaleError::TokenMismatch { .. })
        ));
    }

    #[test]
    fn test_phases_locked_after_first_purchase() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        let owner = ctx("owner");

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap();

        assert_eq!(sale.set_total_phases(&owner, 2), Err(CrowdsaleError::PhasesLocked));
        assert_eq!(sale.del_phase(&owner, 0), Err(CrowdsaleError::PhasesLocked));
        assert_eq!(sale.total_phases(), 1);
    }

    #[test]
    fn test_phases_unlocked_when_configured() {
        let owner = ctx("owner");
        let mut token = Token::new(Address::from_label("token"), owner.caller, TokenConfig::default()).unwrap();
        let config = CrowdsaleConfig {
            lock_phases_after_first_purchase: false,
            ..CrowdsaleConfig::default()
        };
        let mut sale = Crowdsale::new(
            Address::from_label("sale"),
            owner.caller,
            &token,
            Box::new(FixedPriceOracle::new(130_671u64)),
            config,
        );
        token.add_minter(&owner, sale.address()).unwrap();
        token.set_mint_tap(&owner, amt(10_000_000)).unwrap();
        open_phase(&mut sale);

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap();
        sale.set_phase(&owner, 0, 0, 10_000_000_000_000_000_000, 20).unwrap();
        assert_eq!(sale.bonus_percent(NOW), Ok(20));
    }

    #[test]
    fn test_default_usdc_accounting_is_cumulative() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        assert_eq!(sale.config().usdc_accounting, UsdcAccounting::CumulativeWei);

        let first = contribution("a3", 76_569_678_407_350_600);
        sale.buy_tokens(&first, &mut token, first.caller).unwrap();
        assert_eq!(sale.usdc_raised(), &amt(10_005));

        let second = contribution("a5", 76_569_678_407_350_900);
        sale.buy_tokens(&second, &mut token, second.caller).unwrap();
        assert_eq!(token.total_supply(), &amt(30_014));
        assert_eq!(sale.usdc_raised(), &amt(30_015));
    }

    #[test]
    fn test_per_purchase_usdc_accounting() {
        let owner = ctx("owner");
        let mut token = Token::new(Address::from_label("token"), owner.caller, TokenConfig::default()).unwrap();
        let config = CrowdsaleConfig {
            usdc_accounting: UsdcAccounting::PerPurchase,
            ..CrowdsaleConfig::default()
        };
        let mut sale = Crowdsale::new(
            Address::from_label("sale"),
            owner.caller,
            &token,
            Box::new(FixedPriceOracle::new(130_671u64)),
            config,
        );
        token.add_minter(&owner, sale.address()).unwrap();
        token.add_owner(&owner, sale.address()).unwrap();
        token.set_mint_tap(&owner, amt(10_000_000)).unwrap();
        open_phase(&mut sale);

        let first = contribution("a3", 76_569_678_407_350_600);
        sale.buy_tokens(&first, &mut token, first.caller).unwrap();
        let second = contribution("a5", 76_569_678_407_350_900);
        sale.buy_tokens(&second, &mut token, second.caller).unwrap();

        assert_eq!(token.total_supply(), &amt(30_014));
        assert_eq!(sale.usdc_raised(), &amt(20_010));
    }

    #[test]
    fn test_off_chain_purchase_requires_cashier() {
        let (mut token, mut sale) = setup();
        let owner = ctx("owner");
        let cashier = ctx("cashier");
        let buyer = Address::from_label("fiat-buyer");

        assert!(matches!(
            sale.off_chain_purchase(&owner, &mut token, buyer, amt(9_876), amt(56_789)),
            Err(CrowdsaleError::Unauthorized { role: Role::Cashier, .. })
        ));

        sale.add_cashier(&owner, cashier.caller).unwrap();
        sale.off_chain_purchase(&cashier, &mut token, buyer, amt(9_876), amt(56_789))
            .unwrap();
        assert_eq!(token.balance_of(&buyer), amt(9_876));
        assert_eq!(sale.usdc_raised(), &amt(56_789));
        assert!(sale.wei_raised().is_zero());

        sale.del_cashier(&owner, cashier.caller).unwrap();
        assert!(sale
            .off_chain_purchase(&cashier, &mut token, buyer, amt(1), amt(1))
            .is_err());
    }

    #[test]
    fn test_oracle_change() {
        let (_, mut sale) = setup();
        let stranger = ctx("stranger");
        let owner = ctx("owner");

        assert!(sale
            .set_oracle(&stranger, Box::new(FixedPriceOracle::new(87_654u64)))
            .is_err());
        sale.set_oracle(&owner, Box::new(FixedPriceOracle::new(87_654u64)))
            .unwrap();

        assert_eq!(sale.price_usdc_per_eth(), amt(87_654));
        assert_eq!(
            sale.calculate_usdc_value(&Amount::from_u128(lty_primitives::WEI_PER_ETHER)),
            Ok(amt(87_654))
        );
        assert!(sale.take_events().iter().any(|e| e.name() == "OracleChanged"));
    }

    #[test]
    fn test_last_wallet_cannot_be_deleted() {
        let (_, mut sale) = setup();
        let owner = ctx("owner");

        assert_eq!(sale.del_wallet(&owner, 0), Err(CrowdsaleError::EmptyWalletList));
        assert_eq!(
            sale.del_wallet(&owner, 1),
            Err(CrowdsaleError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(sale.wallets_count(), 1);
    }

    #[test]
    fn test_finalize_reserve() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        let owner = ctx("owner");
        let team = Address::from_label("team");

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap();

        let receipt = sale.finalize_crowdsale(&owner, &mut token, team).unwrap();
        assert_eq!(receipt.reserve, amt(6_420));
        assert_eq!(receipt.total_supply, amt(21_427));
        assert_eq!(receipt.cap, amt(42_854));
        assert!(sale.is_finalized());
    }

    #[test]
    fn test_finalize_requires_owner() {
        let (mut token, mut sale) = setup();
        let stranger = ctx("stranger");

        assert!(matches!(
            sale.finalize_crowdsale(&stranger, &mut token, stranger.caller),
            Err(CrowdsaleError::Unauthorized { role: Role::Owner, .. })
        ));
        assert!(!sale.is_finalized());
    }

    #[test]
    fn test_failed_finalize_leaves_sale_active() {
        let (mut token, mut sale) = setup();
        open_phase(&mut sale);
        let owner = ctx("owner");

        let buyer = contribution("buyer", 76_569_678_407_350_600);
        sale.buy_tokens(&buyer, &mut token, buyer.caller).unwrap();

        // sale is a minter but not a token owner
        token.del_owner(&owner, sale.address()).unwrap();
        assert!(matches!(
            sale.finalize_crowdsale(&owner, &mut token, owner.caller),
            Err(CrowdsaleError::Token(TokenError::Unauthorized { role: Role::Owner, .. }))
        ));
        assert_eq!(sale.state(), SaleState::Active);
        assert_eq!(token.total_supply(), &amt(15_007));
    }

    #[test]
    fn test_configuration_closed_after_finalize() {
        let (mut token, mut sale) = setup();
        let owner = ctx("owner");
        sale.finalize_crowdsale(&owner, &mut token, owner.caller).unwrap();

        assert_eq!(sale.add_wallet(&owner, owner.caller), Err(CrowdsaleError::AlreadyFinalized));
        assert_eq!(sale.set_total_phases(&owner, 1), Err(CrowdsaleError::AlreadyFinalized));
        assert_eq!(sale.add_cashier(&owner, owner.caller), Err(CrowdsaleError::AlreadyFinalized));
        assert_eq!(
            sale.off_chain_purchase(&owner, &mut token, owner.caller, amt(1), amt(1)),
            Err(CrowdsaleError::Unauthorized { role: Role::Cashier, caller: owner.caller })
        );
    }
}
