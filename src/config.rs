//! Engine configuration
//!
//! Reads router settings from a TOML file, then lets the environment (and a
//! `.env` file, via dotenv) override the owner and log level.
//!
//! ```toml
//! [engine]
//! address = "0xe000000000000000000000000000000000000001"
//! owner = "0x0000000000000000000000000000000000000001"
//!
//! [engine.default_revenue]
//! recipients = ["0x0000000000000000000000000000000000000001"]
//! shares_bps = [10000]
//!
//! [[revenue]]
//! id = 1
//! recipients = ["0x...", "0x..."]
//! shares_bps = [5000, 3000]
//! dust_share_bps = 2000
//!
//! [logging]
//! level = "debug"
//! json = false
//! ```

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;
use tracing::info;

use crate::backrun::BackrunRouter;
use crate::oracle::Oracle;
use crate::revenue::RevenueConfig;
use crate::types::ConfigId;

pub const OWNER_ENV: &str = "BACKRUN_OWNER";
pub const LOG_LEVEL_ENV: &str = "BACKRUN_LOG_LEVEL";

/// Top-level settings file
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub engine: EngineSection,
    #[serde(default, rename = "revenue")]
    pub revenue_configs: Vec<RevenueEntry>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Environment overrides applied by `load`, as `KEY=value`. Logged by the
    /// caller once a subscriber is installed.
    #[serde(skip)]
    pub env_overrides: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// The router's own account
    pub address: Address,
    pub owner: Address,
    /// Split used when a trigger names no stored config. Defaults to 100% owner.
    pub default_revenue: Option<RevenueConfig>,
}

/// A stored revenue config, selectable by triggers through `id`
#[derive(Debug, Clone, Deserialize)]
pub struct RevenueEntry {
    pub id: u64,
    #[serde(flatten)]
    pub config: RevenueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {}", path.as_ref().display()))?;

        let mut settings = Self::from_toml_str(&content)?;
        dotenv::dotenv().ok();
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML settings")
    }

    /// Apply `BACKRUN_OWNER` / `BACKRUN_LOG_LEVEL` from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(owner) = lookup(OWNER_ENV) {
            self.engine.owner = owner
                .trim()
                .parse()
                .with_context(|| format!("{} is not an address: {}", OWNER_ENV, owner))?;
            self.env_overrides
                .push(format!("{}={:?}", OWNER_ENV, self.engine.owner));
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level.trim().to_string();
            self.env_overrides
                .push(format!("{}={}", LOG_LEVEL_ENV, self.logging.level));
        }
        Ok(())
    }

    /// Check addresses and every revenue config before any router is built
    pub fn validate(&self) -> Result<()> {
        if self.engine.address.is_zero() {
            bail!("engine.address must not be the zero address");
        }
        if self.engine.owner.is_zero() {
            bail!("engine.owner must not be the zero address");
        }

        self.default_revenue()
            .validate()
            .context("engine.default_revenue is invalid")?;

        for entry in &self.revenue_configs {
            if entry.id == ConfigId::DEFAULT.0 {
                bail!("revenue id 0 is reserved, use engine.default_revenue");
            }
            entry
                .config
                .validate()
                .with_context(|| format!("revenue config {} is invalid", entry.id))?;
        }
        Ok(())
    }

    /// Configured default split, or everything to the owner
    pub fn default_revenue(&self) -> RevenueConfig {
        self.engine
            .default_revenue
            .clone()
            .unwrap_or_else(|| RevenueConfig::sole_recipient(self.engine.owner))
    }

    /// Build a router with every configured revenue config stored
    pub fn build_router(&self, oracle: Rc<dyn Oracle>) -> Result<BackrunRouter> {
        let router = BackrunRouter::new(self.engine.address, self.engine.owner, oracle, self.default_revenue())
            .context("Invalid default revenue config")?;

        for entry in &self.revenue_configs {
            router
                .set_revenue_config(self.engine.owner, ConfigId(entry.id), entry.config.clone())
                .with_context(|| format!("Failed to store revenue config {}", entry.id))?;
        }

        info!(
            "Router built: {} revenue configs, log level {}",
            self.revenue_configs.len(),
            self.logging.level
        );
        Ok(router)
    }
}
