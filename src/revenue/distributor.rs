//! Revenue Distributor
//!
//! Owns the configuration table and computes exact splits.
//!
//! Split rules:
//!     - share_i = floor(total * shares_bps[i] / 10000), in recipient order
//!     - dust    = floor(total * dust_share_bps / 10000) + whatever rounding left
//!     - recipient transfers + dust == total, always
//!     - unknown config ids fall back to the default (id 0)
//!
//! Planning is pure: the router applies the plan as ledger transfers, which
//! keeps the table borrow out of any transfer hook.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{RevenueConfig, BPS_DENOMINATOR};
use crate::error::ConfigError;
use crate::types::ConfigId;

/// Computed split of one amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Config actually used (DEFAULT when the requested id had no entry)
    pub config_id: ConfigId,
    pub total: U256,
    pub recipients: Vec<Address>,
    pub amounts: Vec<U256>,
    pub dust_recipient: Address,
    pub dust_amount: U256,
}

impl SplitPlan {
    /// Sum of recipient amounts plus dust. Equals `total` by construction.
    pub fn accounted(&self) -> U256 {
        self.amounts
            .iter()
            .fold(self.dust_amount, |acc, amount| acc + *amount)
    }

    /// Amount left with the engine because the dust recipient is null
    pub fn stranded_amount(&self) -> U256 {
        if self.dust_recipient.is_zero() {
            self.dust_amount
        } else {
            U256::ZERO
        }
    }
}

/// floor(amount * bps / 10000) without overflowing for any U256 amount
pub fn bps_of(amount: U256, bps: u32) -> U256 {
    let denominator = U256::from(BPS_DENOMINATOR);
    let bps = U256::from(bps);
    let whole = amount / denominator;
    let rest = amount % denominator;
    whole * bps + rest * bps / denominator
}

/// Revenue configuration table with a default entry
#[derive(Debug, Clone)]
pub struct RevenueDistributor {
    configs: HashMap<ConfigId, RevenueConfig>,
}

impl RevenueDistributor {
    /// Create a table whose default entry is `default_config`
    pub fn new(default_config: RevenueConfig) -> Result<Self, ConfigError> {
        default_config.validate()?;
        let mut configs = HashMap::new();
        configs.insert(ConfigId::DEFAULT, default_config);
        Ok(Self { configs })
    }

    /// Replace the configuration for `id` wholesale. Writing `ConfigId::DEFAULT`
    /// replaces the default. Nothing is written if validation fails.
    pub fn set_config(&mut self, id: ConfigId, config: RevenueConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let replaced = self.configs.insert(id, config).is_some();
        info!(
            "Revenue config {} {}",
            id,
            if replaced { "replaced" } else { "created" }
        );
        Ok(())
    }

    /// Stored configuration for `id`, without fallback
    pub fn config(&self, id: ConfigId) -> Option<&RevenueConfig> {
        self.configs.get(&id)
    }

    pub fn default_config(&self) -> &RevenueConfig {
        // Inserted in new() and only ever replaced
        &self.configs[&ConfigId::DEFAULT]
    }

    /// Resolve `id` to a stored config, falling back to the default
    pub fn resolve(&self, id: ConfigId) -> (ConfigId, &RevenueConfig) {
        match self.configs.get(&id) {
            Some(config) => (id, config),
            None => {
                debug!("Revenue config {} not found, using default", id);
                (ConfigId::DEFAULT, self.default_config())
            }
        }
    }

    /// Compute the split of `total` under config `id`
    pub fn plan_split(&self, id: ConfigId, total: U256, dust_recipient: Address) -> SplitPlan {
        let (config_id, config) = self.resolve(id);

        let amounts: Vec<U256> = config
            .shares_bps
            .iter()
            .map(|bps| bps_of(total, *bps))
            .collect();
        let distributed = amounts.iter().fold(U256::ZERO, |acc, a| acc + *a);

        // Each floor rounds down and the weights total 10000, so this never underflows
        let dust_amount = total - distributed;

        SplitPlan {
            config_id,
            total,
            recipients: config.recipients.clone(),
            amounts,
            dust_recipient,
            dust_amount,
        }
    }

    /// Number of stored configurations, including the default
    pub fn config_count(&self) -> usize {
        self.configs.len()
    }
}
