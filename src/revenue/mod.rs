//! Revenue Module
//!
//! Named revenue split configurations and the exact-accounting splitter.
//!
//! A configuration lists recipients with basis-point weights plus a dust share
//! that goes to whoever the caller names as dust recipient. Weights always
//! total 10000 bps; that is checked when a config is written, never when it is
//! used.

pub mod distributor;

pub use distributor::{RevenueDistributor, SplitPlan};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Basis points in a whole
pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueConfig {
    pub recipients: Vec<Address>,
    pub shares_bps: Vec<u32>,
    #[serde(default)]
    pub dust_share_bps: u32,
}

impl RevenueConfig {
    /// Build and validate a configuration
    pub fn new(
        recipients: Vec<Address>,
        shares_bps: Vec<u32>,
        dust_share_bps: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            recipients,
            shares_bps,
            dust_share_bps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Everything to a single account
    pub fn sole_recipient(owner: Address) -> Self {
        Self {
            recipients: vec![owner],
            shares_bps: vec![BPS_DENOMINATOR],
            dust_share_bps: 0,
        }
    }

    /// Reject mismatched lengths, zero-address or zero-weight recipients and
    /// weights that do not total 10000 bps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recipients.len() != self.shares_bps.len() {
            return Err(ConfigError::LengthMismatch {
                recipients: self.recipients.len(),
                shares: self.shares_bps.len(),
            });
        }

        for (index, (recipient, share)) in self.recipients.iter().zip(&self.shares_bps).enumerate() {
            if recipient.is_zero() {
                return Err(ConfigError::ZeroAddressRecipient { index });
            }
            if *share == 0 {
                return Err(ConfigError::ZeroShare { index });
            }
        }

        let total: u64 = self.shares_bps.iter().map(|s| *s as u64).sum::<u64>()
            + self.dust_share_bps as u64;
        if total != BPS_DENOMINATOR as u64 {
            return Err(ConfigError::ShareTotal { total });
        }

        Ok(())
    }

    /// Sum of recipient weights, excluding the dust share
    pub fn recipient_share_bps(&self) -> u64 {
        self.shares_bps.iter().map(|s| *s as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const A: Address = address!("000000000000000000000000000000000000000a");
    const B: Address = address!("000000000000000000000000000000000000000b");

    #[test]
    fn test_valid_config() {
        let config = RevenueConfig::new(vec![A, B], vec![3000, 5000], 2000).unwrap();
        assert_eq!(config.recipient_share_bps(), 8000);
    }

    #[test]
    fn test_dust_only_config_is_valid() {
        assert!(RevenueConfig::new(vec![], vec![], 10_000).is_ok());
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            RevenueConfig::new(vec![A, B], vec![10_000], 0),
            Err(ConfigError::LengthMismatch { recipients: 2, shares: 1 })
        );
    }

    #[test]
    fn test_zero_address_recipient() {
        assert_eq!(
            RevenueConfig::new(vec![A, Address::ZERO], vec![5000, 5000], 0),
            Err(ConfigError::ZeroAddressRecipient { index: 1 })
        );
    }

    #[test]
    fn test_zero_share() {
        assert_eq!(
            RevenueConfig::new(vec![A, B], vec![0, 10_000], 0),
            Err(ConfigError::ZeroShare { index: 0 })
        );
    }

    #[test]
    fn test_share_total() {
        assert_eq!(
            RevenueConfig::new(vec![A, B], vec![3000, 5000], 1000),
            Err(ConfigError::ShareTotal { total: 9000 })
        );
        // u32 weights must not wrap when summed
        assert_eq!(
            RevenueConfig::new(vec![A, B], vec![u32::MAX, 10_001], 0),
            Err(ConfigError::ShareTotal { total: u32::MAX as u64 + 10_001 })
        );
    }

    #[test]
    fn test_sole_recipient_is_valid() {
        assert!(RevenueConfig::sole_recipient(A).validate().is_ok());
    }
}
