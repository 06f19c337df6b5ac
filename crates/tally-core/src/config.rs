//! Ledger configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default  |
//! |-------------------------------|----------|
//! | `TALLY_STOCK_POLICY`          | `STRICT` |
//! | `TALLY_MAX_CONFLICT_RETRIES`  | `3`      |
//! | `TALLY_UTC_OFFSET_MINUTES`    | `0`      |

use std::env;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::StockPolicy;

pub const ENV_STOCK_POLICY: &str = "TALLY_STOCK_POLICY";
pub const ENV_MAX_CONFLICT_RETRIES: &str = "TALLY_MAX_CONFLICT_RETRIES";
pub const ENV_UTC_OFFSET_MINUTES: &str = "TALLY_UTC_OFFSET_MINUTES";

/// Largest offset any real timezone uses (UTC+14).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Runtime knobs of the ledger services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// What a sale does when stock runs short.
    pub stock_policy: StockPolicy,

    /// Extra attempts after a lost compare-and-swap before giving up.
    pub max_conflict_retries: u32,

    /// Offset of the shop's local time from UTC, used for report days.
    pub utc_offset_minutes: i32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            stock_policy: StockPolicy::Strict,
            max_conflict_retries: 3,
            utc_offset_minutes: 0,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = LedgerConfig::default();

        let stock_policy = match lookup(ENV_STOCK_POLICY) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_STOCK_POLICY.to_string(), raw))?,
            None => defaults.stock_policy,
        };

        let max_conflict_retries = match lookup(ENV_MAX_CONFLICT_RETRIES) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(ENV_MAX_CONFLICT_RETRIES.to_string(), raw)
            })?,
            None => defaults.max_conflict_retries,
        };

        let utc_offset_minutes = match lookup(ENV_UTC_OFFSET_MINUTES) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(ENV_UTC_OFFSET_MINUTES.to_string(), raw)
            })?,
            None => defaults.utc_offset_minutes,
        };

        let config = LedgerConfig {
            stock_policy,
            max_conflict_retries,
            utc_offset_minutes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::OutOfRange {
                key: ENV_UTC_OFFSET_MINUTES.to_string(),
                value: self.utc_offset_minutes.to_string(),
            });
        }
        Ok(())
    }

    pub fn with_stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Local-time offset for report windows.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: '{1}'")]
    InvalidValue(String, String),

    #[error("Value for {key} out of range: {value}")]
    OutOfRange { key: String, value: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.stock_policy, StockPolicy::Strict);
        assert_eq!(config.max_conflict_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_STOCK_POLICY, "permissive"),
            (ENV_MAX_CONFLICT_RETRIES, "5"),
            (ENV_UTC_OFFSET_MINUTES, "420"),
        ]))
        .unwrap();
        assert_eq!(config.stock_policy, StockPolicy::Permissive);
        assert_eq!(config.max_conflict_retries, 5);
        assert_eq!(config.utc_offset().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[(ENV_STOCK_POLICY, "sometimes")])),
            Err(ConfigError::InvalidValue(..))
        ));
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[(ENV_MAX_CONFLICT_RETRIES, "-1")])),
            Err(ConfigError::InvalidValue(..))
        ));
        assert!(matches!(
            LedgerConfig::from_lookup(lookup(&[(ENV_UTC_OFFSET_MINUTES, "2000")])),
            Err(ConfigError::OutOfRange { .. })
        ));
    }
}
