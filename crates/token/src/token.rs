// token/src/token.rs

use crate::{events::TokenEvent, mint_tap::MintTap, TokenError, TokenResult};
use lty_primitives::{Address, Amount, CallContext, Role, RoleRegistry, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Largest decimals value whose unit (`10^decimals`) fits in 256 bits
const MAX_DECIMALS: u8 = 77;

/// Token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Initial supply cap; `None` means unlimited until a cap is set
    #[serde(default)]
    pub cap: Option<Amount>,
    /// Mint tap period length in seconds
    pub tap_period_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Longevity".into(),
            symbol: "LTY".into(),
            decimals: 2,
            cap: None,
            tap_period_secs: MintTap::DEFAULT_PERIOD_SECS,
        }
    }
}

/// Capped, tap-limited mintable token
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// Token identity
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    /// Owner and minter sets
    roles: RoleRegistry,
    /// Minting rate limit
    tap: MintTap,
    balances: HashMap<Address, Amount>,
    total_supply: Amount,
    cap: Amount,
    minting_finished: bool,
    /// Pending events, drained by `take_events`
    #[serde(skip)]
    events: Vec<TokenEvent>,
}

impl Token {
    /// Deploy a token at `address`; `deployer` becomes the sole owner.
    pub fn new(address: Address, deployer: Address, config: TokenConfig) -> TokenResult<Self> {
        if config.decimals > MAX_DECIMALS {
            return Err(TokenError::InvalidConfiguration(format!(
                "decimals {} exceeds {}",
                config.decimals, MAX_DECIMALS
            )));
        }

        let tap = MintTap::new(config.tap_period_secs)?;
        let cap = config.cap.unwrap_or_else(Amount::max_value);

        tracing::info!(
            "Token {} ({}) deployed at {} by {}, cap {}",
            config.name,
            config.symbol,
            address,
            deployer,
            cap
        );

        Ok(Self {
            address,
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            roles: RoleRegistry::with_owner(deployer),
            tap,
            balances: HashMap::new(),
            total_supply: Amount::zero(),
            cap,
            minting_finished: false,
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).cloned().unwrap_or_else(Amount::zero)
    }

    pub fn total_supply(&self) -> &Amount {
        &self.total_supply
    }

    pub fn cap(&self) -> &Amount {
        &self.cap
    }

    pub fn minting_finished(&self) -> bool {
        self.minting_finished
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.roles.is_owner(address)
    }

    pub fn is_minter(&self, address: &Address) -> bool {
        self.roles.is_minter(address)
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Raw tap state
    pub fn mint_tap(&self) -> &MintTap {
        &self.tap
    }

    /// Allowance left in the tap period containing `now`
    pub fn tap_remaining(&self, now: Timestamp) -> Amount {
        self.tap.remaining(now)
    }

    /// Accounts holding a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter().filter(|(_, amount)| !amount.is_zero())
    }

    /// Drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }

    // ---- roles ----

    pub fn add_owner(&mut self, ctx: &CallContext, owner: Address) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if self.roles.grant(Role::Owner, owner) {
            tracing::info!("Token owner added: {}", owner);
            self.events.push(TokenEvent::OwnerAdded { owner });
        }
        Ok(())
    }

    pub fn del_owner(&mut self, ctx: &CallContext, owner: Address) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if self.roles.revoke(Role::Owner, &owner)? {
            tracing::info!("Token owner removed: {}", owner);
            self.events.push(TokenEvent::OwnerRemoved { owner });
        }
        Ok(())
    }

    pub fn add_minter(&mut self, ctx: &CallContext, minter: Address) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if self.roles.grant(Role::Minter, minter) {
            tracing::info!("Minter added: {}", minter);
            self.events.push(TokenEvent::MinterAdded { minter });
        }
        Ok(())
    }

    pub fn del_minter(&mut self, ctx: &CallContext, minter: Address) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if self.roles.revoke(Role::Minter, &minter)? {
            tracing::info!("Minter removed: {}", minter);
            self.events.push(TokenEvent::MinterRemoved { minter });
        }
        Ok(())
    }

    // ---- minting ----

    /// Reset the per-period minting allowance, starting a new period now
    pub fn set_mint_tap(&mut self, ctx: &CallContext, amount: Amount) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        self.tap.set(amount.clone(), ctx.timestamp);

        tracing::info!("Mint tap set to {} per {}s", amount, self.tap.period_length());
        self.events.push(TokenEvent::MintTapSet {
            amount,
            period_start: ctx.timestamp,
        });
        Ok(())
    }

    /// Mint `amount` to `to`. Caller must be a minter.
    pub fn mint(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> TokenResult<()> {
        self.roles.require(Role::Minter, &ctx.caller)?;
        let cap = self.cap.clone();
        self.apply_mint(to, amount, &cap, ctx.timestamp)
    }

    /// Reserve mint used when a sale is finalized.
    ///
    /// Mints `amount` to `to` and resets the cap to twice the resulting
    /// supply. Caller must be both owner and minter; the tap applies as for
    /// any other mint. Nothing changes if any check fails.
    pub fn mint_reserve(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        self.roles.require(Role::Minter, &ctx.caller)?;

        let new_supply = self
            .total_supply
            .checked_add(&amount)
            .ok_or_else(|| TokenError::Overflow("Total supply overflow".into()))?;
        let new_cap = new_supply
            .checked_mul(&Amount::from_u64(2))
            .ok_or_else(|| TokenError::Overflow("Cap overflow".into()))?;

        self.apply_mint(to, amount, &new_cap, ctx.timestamp)?;

        self.cap = new_cap.clone();
        tracing::info!("Cap reset to {} after reserve mint", new_cap);
        self.events.push(TokenEvent::CapChanged { cap: new_cap });
        Ok(())
    }

    /// Shared mint path: every check runs before the first write.
    fn apply_mint(&mut self, to: Address, amount: Amount, cap: &Amount, now: Timestamp) -> TokenResult<()> {
        if self.minting_finished {
            return Err(TokenError::MintingFinished);
        }

        let new_supply = self
            .total_supply
            .checked_add(&amount)
            .ok_or_else(|| TokenError::Overflow("Total supply overflow".into()))?;

        if &new_supply > cap {
            return Err(TokenError::CapExceeded {
                cap: cap.clone(),
                would_have: new_supply,
            });
        }

        let new_balance = self
            .balance_of(&to)
            .checked_add(&amount)
            .ok_or_else(|| TokenError::Overflow("Balance overflow".into()))?;

        // Last fallible step; it only mutates the tap on success
        self.tap.consume(&amount, now)?;

        self.balances.insert(to, new_balance);
        self.total_supply = new_supply;

        tracing::info!("Minted {} {} to {}", amount, self.symbol, to);
        self.events.push(TokenEvent::Mint { to, amount });
        Ok(())
    }

    /// Stop all further minting
    pub fn finish_minting(&mut self, ctx: &CallContext) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if self.minting_finished {
            return Err(TokenError::MintingFinished);
        }

        self.minting_finished = true;
        tracing::info!("Minting finished for {}", self.symbol);
        self.events.push(TokenEvent::MintFinished);
        Ok(())
    }

    // ---- cap ----

    /// Replace the cap; it may not drop below the current supply
    pub fn raise_cap(&mut self, ctx: &CallContext, new_cap: Amount) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        if new_cap < self.total_supply {
            return Err(TokenError::InvalidCap {
                requested: new_cap,
                total_supply: self.total_supply.clone(),
            });
        }

        tracing::info!("Cap changed from {} to {}", self.cap, new_cap);
        self.cap = new_cap.clone();
        self.events.push(TokenEvent::CapChanged { cap: new_cap });
        Ok(())
    }

    /// Set the cap to twice the current supply
    pub fn set_cap(&mut self, ctx: &CallContext) -> TokenResult<()> {
        self.roles.require(Role::Owner, &ctx.caller)?;
        let new_cap = self
            .total_supply
            .checked_mul(&Amount::from_u64(2))
            .ok_or_else(|| TokenError::Overflow("Cap overflow".into()))?;
        self.raise_cap(ctx, new_cap)
    }

    // ---- holder operations ----

    /// Move the caller's own tokens
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> TokenResult<()> {
        let from = ctx.caller;
        let from_balance = self.balance_of(&from);
        let remaining = from_balance
            .checked_sub(&amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                have: from_balance.clone(),
                need: amount.clone(),
            })?;

        if from != to {
            let to_balance = self
                .balance_of(&to)
                .checked_add(&amount)
                .ok_or_else(|| TokenError::Overflow("Balance overflow".into()))?;
            self.balances.insert(from, remaining);
            self.balances.insert(to, to_balance);
        }

        tracing::debug!("Transfer {} from {} to {}", amount, from, to);
        self.events.push(TokenEvent::Transfer { from, to, amount });
        Ok(())
    }

    /// Destroy the caller's own tokens
    pub fn burn(&mut self, ctx: &CallContext, amount: Amount) -> TokenResult<()> {
        let burner = ctx.caller;
        let balance = self.balance_of(&burner);
        let remaining = balance
            .checked_sub(&amount)
            .ok_or_else(|| TokenError::InsufficientBalance {
                have: balance.clone(),
                need: amount.clone(),
            })?;

        // Supply always covers any single balance
        self.total_supply = self.total_supply.saturating_sub(&amount);
        self.balances.insert(burner, remaining);

        tracing::info!("Burned {} {} from {}", amount, self.symbol, burner);
        self.events.push(TokenEvent::Burn { burner, amount });
        Ok(())
    }
}
