//! Simulation scenarios
//!
//! A scenario file describes a small market (assets, venues, opening
//! balances), the oracle's quotes, and the triggers to feed the router.
//! Amounts are human-readable decimal strings scaled by the asset's decimals.
//!
//! ```toml
//! [[asset]]
//! symbol = "WETH"
//! address = "0x00000000000000000000000000000000000000a1"
//! decimals = 18
//!
//! [[venue]]
//! address = "0x1000000000000000000000000000000000000001"
//! kind = "direct_quote"
//! assets = ["WETH", "USDC"]
//! reserves = ["1000", "2000000"]
//!
//! [[balance]]
//! holder = "0xe000000000000000000000000000000000000001"
//! asset = "WETH"
//! amount = "10"
//!
//! [[quote]]
//! source = "0x1000000000000000000000000000000000000001"
//! primary = true
//! estimated_profit = "0.05"
//! venues = ["0x1000...0001", "0x1000...0002"]
//! assets = ["WETH", "USDC", "WETH"]
//!
//! [[trigger]]
//! source = "0x1000000000000000000000000000000000000001"
//! amount = "1.5"
//! primary = true
//! beneficiary = "0x0000000000000000000000000000000000000004"
//! ```

use alloy::primitives::{Address, Sign, I256, U256};
use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;
use tracing::info;

use crate::backrun::{BackrunRouter, PassThrough};
use crate::oracle::StaticOracle;
use crate::types::{BackrunTrigger, ConfigId, RouteQuote, VenueFlags, VenueKind};
use crate::venues::{CallbackPool, ConstantProductPair, Venue};

fn default_fee_bps() -> u32 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "asset")]
    pub assets: Vec<AssetDef>,
    #[serde(default, rename = "venue")]
    pub venues: Vec<VenueDef>,
    #[serde(default, rename = "balance")]
    pub balances: Vec<BalanceDef>,
    #[serde(default, rename = "quote")]
    pub quotes: Vec<QuoteDef>,
    #[serde(default, rename = "trigger")]
    pub triggers: Vec<TriggerDef>,
    /// Run the triggers through the batch entry point
    #[serde(default)]
    pub batch: bool,
    /// Transfer run ahead of a batch (implies `batch`)
    pub pass_through: Option<TransferDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDef {
    pub symbol: String,
    pub address: Address,
    pub decimals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKindDef {
    DirectQuote,
    CallbackSettled,
}

impl From<VenueKindDef> for VenueKind {
    fn from(def: VenueKindDef) -> Self {
        match def {
            VenueKindDef::DirectQuote => VenueKind::DirectQuote,
            VenueKindDef::CallbackSettled => VenueKind::CallbackSettled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueDef {
    pub address: Address,
    pub kind: VenueKindDef,
    /// Symbols, primary first
    pub assets: [String; 2],
    pub reserves: [String; 2],
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceDef {
    pub holder: Address,
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteDef {
    pub source: Address,
    pub primary: bool,
    /// In units of the route's first asset; may be negative
    pub estimated_profit: String,
    pub venues: Vec<Address>,
    /// Wire tags; taken from the scenario's venues when omitted
    pub kinds: Option<Vec<u8>>,
    #[serde(default)]
    pub flags: Vec<u32>,
    pub assets: Vec<String>,
    #[serde(default)]
    pub start_hop_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerDef {
    pub source: Address,
    pub amount: String,
    pub primary: bool,
    pub beneficiary: Address,
    #[serde(default)]
    pub config_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferDef {
    pub asset: String,
    pub from: Address,
    pub to: Address,
    pub amount: String,
}

/// Scale a decimal string by `decimals` into raw units
pub fn parse_amount(amount: &str, decimals: u32) -> Result<U256> {
    let value = Decimal::from_str(amount.trim())
        .with_context(|| format!("Invalid amount: {}", amount))?;
    if value.is_sign_negative() {
        bail!("Amount must not be negative: {}", amount);
    }
    if value.scale() > decimals {
        bail!("Amount {} has more than {} decimal places", amount, decimals);
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let factor = U256::from(10u64).pow(U256::from(decimals - value.scale()));
    mantissa
        .checked_mul(factor)
        .ok_or_else(|| anyhow!("Amount overflows: {}", amount))
}

/// Raw units as a decimal number of tokens. None if it does not fit a Decimal.
pub fn format_amount(amount: U256, decimals: u32) -> Option<Decimal> {
    let raw: u128 = amount.try_into().ok()?;
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .ok()
        .map(|d| d.normalize())
}

/// `format_amount` with the symbol, falling back to raw units
pub fn display_amount(amount: U256, asset: Option<&AssetDef>) -> String {
    match asset {
        Some(def) => match format_amount(amount, def.decimals) {
            Some(value) => format!("{} {}", value, def.symbol),
            None => format!("{} raw {}", amount, def.symbol),
        },
        None => amount.to_string(),
    }
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse scenario TOML")
    }

    /// Look up an asset by symbol (case-insensitive)
    pub fn asset(&self, symbol: &str) -> Result<&AssetDef> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| anyhow!("Unknown asset: {}", symbol))
    }

    pub fn asset_by_address(&self, address: Address) -> Option<&AssetDef> {
        self.assets.iter().find(|a| a.address == address)
    }

    fn venue_def(&self, address: Address) -> Option<&VenueDef> {
        self.venues.iter().find(|v| v.address == address)
    }

    fn amount(&self, symbol: &str, amount: &str) -> Result<(Address, U256)> {
        let asset = self.asset(symbol)?;
        Ok((asset.address, parse_amount(amount, asset.decimals)?))
    }

    pub fn runs_batch(&self) -> bool {
        self.batch || self.pass_through.is_some()
    }

    /// Oracle answering with the scenario's quotes
    pub fn oracle(&self) -> Result<StaticOracle> {
        let label = if self.name.is_empty() { "scenario" } else { self.name.as_str() };
        let mut oracle = StaticOracle::new(label);

        for (i, def) in self.quotes.iter().enumerate() {
            let assets = def
                .assets
                .iter()
                .map(|symbol| self.asset(symbol))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("quote {}", i))?;

            let kinds = match &def.kinds {
                Some(kinds) => kinds.clone(),
                None => def
                    .venues
                    .iter()
                    .map(|venue| {
                        self.venue_def(*venue)
                            .map(|v| VenueKind::from(v.kind).tag())
                            .ok_or_else(|| anyhow!("quote {}: unknown venue {:?}, give kinds explicitly", i, venue))
                    })
                    .collect::<Result<Vec<_>>>()?,
            };
            let flags = if def.flags.is_empty() {
                vec![VenueFlags::default(); def.venues.len()]
            } else {
                def.flags.iter().map(|f| VenueFlags(*f)).collect()
            };

            let decimals = assets.first().map_or(0, |a| a.decimals);
            let estimated_profit = parse_signed(&def.estimated_profit, decimals)
                .with_context(|| format!("quote {}: estimated_profit", i))?;

            oracle.insert(
                def.source,
                def.primary,
                RouteQuote {
                    estimated_profit,
                    venues: def.venues.clone(),
                    venue_kinds: kinds,
                    venue_flags: flags,
                    assets: assets.iter().map(|a| a.address).collect(),
                    start_hop_index: def.start_hop_index,
                },
            );
        }

        Ok(oracle)
    }

    /// Register the venues and seed reserves and balances
    pub fn install(&self, router: &BackrunRouter) -> Result<()> {
        for def in &self.venues {
            let (asset0, reserve0) = self.amount(&def.assets[0], &def.reserves[0])?;
            let (asset1, reserve1) = self.amount(&def.assets[1], &def.reserves[1])?;

            let venue: Rc<dyn Venue> = match def.kind {
                VenueKindDef::DirectQuote => Rc::new(ConstantProductPair::new(def.address, asset0, asset1, def.fee_bps)),
                VenueKindDef::CallbackSettled => Rc::new(CallbackPool::new(def.address, asset0, asset1, def.fee_bps)),
            };
            router.register_venue(venue);
            router.credit(asset0, def.address, reserve0)?;
            router.credit(asset1, def.address, reserve1)?;
        }

        for balance in &self.balances {
            let (asset, amount) = self.amount(&balance.asset, &balance.amount)?;
            router.credit(asset, balance.holder, amount)?;
        }

        info!(
            "Scenario installed: {} assets, {} venues, {} balances",
            self.assets.len(),
            self.venues.len(),
            self.balances.len()
        );
        Ok(())
    }

    /// Triggers in file order. Amounts use the decimals of the asset the
    /// trigger starts from on its source venue.
    pub fn triggers(&self) -> Result<Vec<BackrunTrigger>> {
        self.triggers
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let venue = self
                    .venue_def(def.source)
                    .ok_or_else(|| anyhow!("trigger {}: unknown source venue {:?}", i, def.source))?;
                let symbol = if def.primary { &venue.assets[0] } else { &venue.assets[1] };
                let (_, amount) = self
                    .amount(symbol, &def.amount)
                    .with_context(|| format!("trigger {}", i))?;
                Ok(BackrunTrigger::new(def.source, amount, def.primary, def.beneficiary)
                    .with_config(ConfigId(def.config_id)))
            })
            .collect()
    }

    pub fn pass_through(&self) -> Result<PassThrough> {
        match &self.pass_through {
            Some(def) => {
                let (asset, amount) = self.amount(&def.asset, &def.amount)?;
                Ok(PassThrough::transfer(asset, def.from, def.to, amount))
            }
            None => Ok(PassThrough::noop()),
        }
    }
}

fn parse_signed(amount: &str, decimals: u32) -> Result<I256> {
    let trimmed = amount.trim();
    match trimmed.strip_prefix('-') {
        Some(magnitude) => {
            let raw = parse_amount(magnitude, decimals)?;
            I256::checked_from_sign_and_abs(Sign::Negative, raw)
                .ok_or_else(|| anyhow!("Amount overflows: {}", amount))
        }
        None => {
            let raw = parse_amount(trimmed, decimals)?;
            I256::checked_from_sign_and_abs(Sign::Positive, raw)
                .ok_or_else(|| anyhow!("Amount overflows: {}", amount))
        }
    }
}
