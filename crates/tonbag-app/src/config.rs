//! Application configuration.
//!
//! Loaded from TOML, then overridden by `TONBAG_<SECTION>_<FIELD>`
//! environment variables, then validated:
//!
//! ```toml
//! [polling]
//! interval_ms = 3000
//!
//! [transaction]
//! valid_for_secs = 90
//! default_deposit = "0.5"
//! min_deposit = "0.05"
//!
//! [cache]
//! draft_ttl_secs = 2592000
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonbag_core::{TonAmount, TonbagError};

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
/// Default wallet request validity window.
pub const DEFAULT_VALID_FOR_SECS: u64 = 90;
/// Default deposit proposed to the user, in nanotons (0.5 TON).
pub const DEFAULT_DEPOSIT_NANOTONS: u64 = 500_000_000;
/// Deposits must be strictly greater than this, in nanotons (0.05 TON).
pub const MIN_DEPOSIT_NANOTONS: u64 = 50_000_000;
/// Default lifetime of a cached draft (30 days).
pub const DEFAULT_DRAFT_TTL_SECS: u64 = 30 * 24 * 60 * 60;

const ENV_PREFIX: &str = "TONBAG_";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const KEYS: [&str; 7] = [
    "polling.interval_ms",
    "transaction.valid_for_secs",
    "transaction.default_deposit",
    "transaction.min_deposit",
    "cache.dir",
    "cache.draft_ttl_secs",
    "logging.level",
];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Contract polling
    pub polling: PollingConfig,
    /// Transaction flow
    pub transaction: TransactionConfig,
    /// Edit cache
    pub cache: CacheConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Contract polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Milliseconds between contract fetches
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    /// Interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Transaction flow settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionConfig {
    /// Seconds the wallet may take to sign
    pub valid_for_secs: u64,
    /// Deposit proposed when the flow opens
    pub default_deposit: TonAmount,
    /// Exclusive lower bound for deposits
    pub min_deposit: TonAmount,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            valid_for_secs: DEFAULT_VALID_FOR_SECS,
            default_deposit: TonAmount::from_nanotons(DEFAULT_DEPOSIT_NANOTONS),
            min_deposit: TonAmount::from_nanotons(MIN_DEPOSIT_NANOTONS),
        }
    }
}

/// Edit cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache directory; the platform data directory when unset
    pub dir: Option<PathBuf>,
    /// Seconds a cached draft survives; 0 keeps drafts forever
    pub draft_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            draft_ttl_secs: DEFAULT_DRAFT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Draft lifetime, or `None` when expiry is disabled.
    pub fn draft_ttl(&self) -> Option<Duration> {
        (self.draft_ttl_secs > 0).then(|| Duration::from_secs(self.draft_ttl_secs))
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, TonbagError> {
        toml::from_str(raw).map_err(|e| TonbagError::invalid(format!("Invalid TOML: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, TonbagError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TonbagError::internal(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, TonbagError> {
        toml::to_string_pretty(self)
            .map_err(|e| TonbagError::serialization(format!("Failed to render config: {e}")))
    }

    /// Apply `TONBAG_*` variables from the process environment.
    pub fn merge_with_env(&mut self) -> Result<(), TonbagError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `TONBAG_<SECTION>_<FIELD>` pairs; other names are ignored.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<(), TonbagError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let rest = rest.to_ascii_lowercase();
            let Some((section, field)) = rest.split_once('_') else {
                continue;
            };
            let key = format!("{section}.{field}");
            if !KEYS.contains(&key.as_str()) {
                tracing::debug!(variable = name.as_ref(), "ignoring unrecognized variable");
                continue;
            }
            self.set_from_string(&key, value.as_ref())?;
        }
        Ok(())
    }

    /// Set one `section.field` value from its string form.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), TonbagError> {
        match key {
            "polling.interval_ms" => self.polling.interval_ms = parse_u64(key, value)?,
            "transaction.valid_for_secs" => {
                self.transaction.valid_for_secs = parse_u64(key, value)?;
            }
            "transaction.default_deposit" => {
                self.transaction.default_deposit = TonAmount::parse(value)?;
            }
            "transaction.min_deposit" => self.transaction.min_deposit = TonAmount::parse(value)?,
            "cache.dir" => {
                self.cache.dir = if value.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "cache.draft_ttl_secs" => self.cache.draft_ttl_secs = parse_u64(key, value)?,
            "logging.level" => self.logging.level = value.trim().to_string(),
            other => {
                return Err(TonbagError::invalid(format!(
                    "Unknown configuration key: {other}"
                )))
            }
        }
        Ok(())
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), TonbagError> {
        if self.polling.interval_ms == 0 {
            return Err(TonbagError::invalid("polling.interval_ms must be positive"));
        }
        if self.transaction.valid_for_secs == 0 {
            return Err(TonbagError::invalid(
                "transaction.valid_for_secs must be positive",
            ));
        }
        if self.transaction.default_deposit <= self.transaction.min_deposit {
            return Err(TonbagError::invalid(format!(
                "transaction.default_deposit ({}) must exceed transaction.min_deposit ({})",
                self.transaction.default_deposit, self.transaction.min_deposit
            )));
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(TonbagError::invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, TonbagError> {
    value
        .trim()
        .parse()
        .map_err(|_| TonbagError::invalid(format!("{key} expects an integer, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.polling.interval(), Duration::from_secs(3));
        assert_eq!(config.transaction.default_deposit.to_string(), "0.5");
        assert_eq!(config.transaction.min_deposit.to_string(), "0.05");
        assert_eq!(config.cache.draft_ttl(), Some(Duration::from_secs(2_592_000)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [polling]
            interval_ms = 1000

            [transaction]
            default_deposit = "1.25"
            "#,
        )
        .unwrap();
        assert_eq!(config.polling.interval_ms, 1000);
        assert_eq!(config.transaction.default_deposit.nanotons(), 1_250_000_000);
        assert_eq!(config.transaction.valid_for_secs, 90);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(AppConfig::from_toml_str("[polling]\ninterval = 5").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.cache.dir = Some(PathBuf::from("/tmp/tonbag"));
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .merge_with_vars([
                ("TONBAG_POLLING_INTERVAL_MS", "500"),
                ("TONBAG_CACHE_DRAFT_TTL_SECS", "0"),
                ("TONBAG_LOGGING_LEVEL", "debug"),
                ("HOME", "/root"),
                ("TONBAG_CONFIG", "/etc/tonbag.toml"),
            ])
            .unwrap();
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.cache.draft_ttl(), None);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_bad_value_is_error() {
        let mut config = AppConfig::default();
        let err = config
            .merge_with_vars([("TONBAG_TRANSACTION_VALID_FOR_SECS", "soon")])
            .unwrap_err();
        assert!(matches!(err, TonbagError::Invalid { .. }));
    }

    #[test]
    fn test_validate_rejects_inconsistent_deposit() {
        let mut config = AppConfig::default();
        config.transaction.default_deposit = TonAmount::parse("0.05").unwrap();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
