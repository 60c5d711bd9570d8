//! Engine configuration: defaults, builder methods and environment loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use stockflow_core::{DEFAULT_PRECISION, DomainError, DomainResult, MAX_PRECISION, Quantity};
use stockflow_observability::LogFormat;

pub const ENV_FRACTIONAL_PRECISION: &str = "STOCKFLOW_FRACTIONAL_PRECISION";
pub const ENV_LOCK_TIMEOUT_MS: &str = "STOCKFLOW_LOCK_TIMEOUT_MS";
pub const ENV_LOW_STOCK_THRESHOLD: &str = "STOCKFLOW_LOW_STOCK_THRESHOLD";
pub const ENV_LOG_FORMAT: &str = "STOCKFLOW_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decimal places kept for fractional stock.
    pub fractional_precision: u32,
    /// How long a deduction or void waits for its item locks.
    pub lock_timeout: Duration,
    /// Publish `LowStock` when an item's total drops below this.
    pub low_stock_threshold: Option<Quantity>,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fractional_precision: DEFAULT_PRECISION,
            lock_timeout: Duration::from_secs(5),
            low_stock_threshold: None,
            log_format: LogFormat::Json,
        }
    }
}

impl EngineConfig {
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.fractional_precision = precision;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: Quantity) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.fractional_precision > MAX_PRECISION {
            return Err(DomainError::validation(format!(
                "fractional_precision must be at most {MAX_PRECISION}, got {}",
                self.fractional_precision
            )));
        }
        if self.lock_timeout.is_zero() {
            return Err(DomainError::validation("lock_timeout must be non-zero"));
        }
        if let Some(threshold) = self.low_stock_threshold {
            if threshold.is_negative() {
                return Err(DomainError::validation("low_stock_threshold cannot be negative"));
            }
        }
        Ok(())
    }

    /// Load from the process environment, reading a `.env` file first if present.
    pub fn from_env() -> DomainResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_FRACTIONAL_PRECISION) {
            config.fractional_precision = raw.trim().parse().map_err(|_| {
                DomainError::validation(format!("{ENV_FRACTIONAL_PRECISION}: '{raw}' is not a number"))
            })?;
        }

        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                DomainError::validation(format!("{ENV_LOCK_TIMEOUT_MS}: '{raw}' is not a number"))
            })?;
            config.lock_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            if !raw.trim().is_empty() {
                config.low_stock_threshold = Some(Quantity::parse(raw.trim())?);
            }
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = raw
                .parse()
                .map_err(|e| DomainError::validation(format!("{ENV_LOG_FORMAT}: {e}")))?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fractional_precision, 4);
    }

    #[test]
    fn reads_every_key() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_FRACTIONAL_PRECISION, "6"),
            (ENV_LOCK_TIMEOUT_MS, "250"),
            (ENV_LOW_STOCK_THRESHOLD, "2.5"),
            (ENV_LOG_FORMAT, "compact"),
        ]))
        .unwrap();
        assert_eq!(config.fractional_precision, 6);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.low_stock_threshold, Some(Quantity::parse("2.5").unwrap()));
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_FRACTIONAL_PRECISION, "20")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_LOCK_TIMEOUT_MS, "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_LOCK_TIMEOUT_MS, "soon")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")])).is_err());
    }

    #[test]
    fn builder_methods_chain() {
        let config = EngineConfig::default()
            .with_precision(2)
            .with_lock_timeout(Duration::from_millis(10))
            .with_low_stock_threshold(Quantity::from_whole(3));
        assert!(config.validate().is_ok());
        assert_eq!(config.low_stock_threshold, Some(Quantity::from_whole(3)));
    }
}
