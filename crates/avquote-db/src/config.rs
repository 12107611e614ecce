//! Store configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults:
//!
//! | Variable                   | Default        |
//! |----------------------------|----------------|
//! | `AVQUOTE_DATABASE_PATH`    | `./avquote.db` |
//! | `AVQUOTE_MAX_CONNECTIONS`  | `5`            |
//! | `AVQUOTE_DEFAULT_MARKUP`   | `20`           |
//! | `AVQUOTE_DEFAULT_TAX_RATE` | `8`            |
//! | `AVQUOTE_TAX_ENABLED`      | `true`         |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use avquote_core::QuoteDefaults;
use rust_decimal::Decimal;

use crate::pool::DbConfig;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Pool size.
    pub max_connections: u32,

    /// Pricing defaults for new quotes.
    pub quote_defaults: QuoteDefaults,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = StoreConfig {
            database_path: lookup("AVQUOTE_DATABASE_PATH")
                .unwrap_or_else(|| "./avquote.db".to_string())
                .into(),

            max_connections: parse_var(&lookup, "AVQUOTE_MAX_CONNECTIONS", "5")?,

            quote_defaults: QuoteDefaults {
                equipment_markup: parse_var(&lookup, "AVQUOTE_DEFAULT_MARKUP", "20")?,
                tax_rate: parse_var(&lookup, "AVQUOTE_DEFAULT_TAX_RATE", "8")?,
                tax_enabled: parse_var(&lookup, "AVQUOTE_TAX_ENABLED", "true")?,
            },
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "AVQUOTE_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.quote_defaults.tax_rate < Decimal::ZERO {
            return Err(ConfigError::InvalidValue(
                "AVQUOTE_DEFAULT_TAX_RATE".to_string(),
            ));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .quote_defaults(self.quote_defaults.clone())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("./avquote.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.quote_defaults, QuoteDefaults::default());
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("AVQUOTE_DATABASE_PATH", "/var/lib/avquote/quotes.db"),
            ("AVQUOTE_DEFAULT_MARKUP", "32.5"),
            ("AVQUOTE_TAX_ENABLED", "false"),
        ]))
        .unwrap();

        assert_eq!(config.quote_defaults.equipment_markup, Decimal::new(325, 1));
        assert!(!config.quote_defaults.tax_enabled);
        let db_config = config.db_config();
        assert_eq!(db_config.max_connections, 5);
        assert_eq!(db_config.quote_defaults.equipment_markup, Decimal::new(325, 1));
    }

    #[test]
    fn test_invalid_values() {
        let err = StoreConfig::from_lookup(lookup(&[("AVQUOTE_DEFAULT_TAX_RATE", "eight")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "AVQUOTE_DEFAULT_TAX_RATE"));

        assert!(StoreConfig::from_lookup(lookup(&[("AVQUOTE_MAX_CONNECTIONS", "0")])).is_err());
        assert!(StoreConfig::from_lookup(lookup(&[("AVQUOTE_TAX_ENABLED", "yes")])).is_err());
    }
}
