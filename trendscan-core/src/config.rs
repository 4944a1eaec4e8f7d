//! Engine configuration.
//!
//! Loaded once from TOML (every field defaulted), optionally patched from the
//! environment, validated, then handed to [`SignalEngine::new`] and never
//! mutated again.
//!
//! [`SignalEngine::new`]: crate::engine::SignalEngine::new

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::backtest::WinRateConfig;
use crate::classifier::ClassifierConfig;
use crate::cooldown::DedupPolicy;
use crate::sizer::{AccountConfig, StopPolicy};
use crate::snapshot::IndicatorPeriods;

/// Environment variable overriding `account.capital`.
pub const ENV_CAPITAL: &str = "ACCOUNT_CAPITAL";
/// Environment variable overriding `account.risk_fraction`.
pub const ENV_RISK_PCT: &str = "RISK_PCT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("environment variable {var} is not a number: {value:?}")]
    BadEnv { var: &'static str, value: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub account: AccountConfig,
    pub stops: StopPolicy,
    pub classifier: ClassifierConfig,
    pub indicators: IndicatorPeriods,
    pub backtest: WinRateConfig,
    pub cooldown: DedupPolicy,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Apply `ACCOUNT_CAPITAL` / `RISK_PCT` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an
    /// explicit lookup, so tests don't touch the real environment.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let parse = |var: &'static str| -> Result<Option<f64>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| ConfigError::BadEnv { var, value }),
            }
        };
        if let Some(capital) = parse(ENV_CAPITAL)? {
            self.account.capital = capital;
        }
        if let Some(risk) = parse(ENV_RISK_PCT)? {
            self.account.risk_fraction = risk;
        }
        Ok(self)
    }

    /// Reject values that would make the engine produce nonsense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let AccountConfig {
            capital,
            risk_fraction,
            lot_size,
        } = self.account;
        if !(capital.is_finite() && capital > 0.0) {
            return Err(ConfigError::invalid("account.capital", "must be positive"));
        }
        if !(risk_fraction > 0.0 && risk_fraction <= 1.0) {
            return Err(ConfigError::invalid(
                "account.risk_fraction",
                "must be in (0, 1]",
            ));
        }
        if lot_size == 0 {
            return Err(ConfigError::invalid("account.lot_size", "must be at least 1"));
        }

        validate_stops("stops", &self.stops)?;
        validate_stops("backtest.exits", &self.backtest.exits)?;

        let c = &self.classifier;
        if !(0.0..=100.0).contains(&c.rsi_floor)
            || !(0.0..=100.0).contains(&c.rsi_ceiling)
            || c.rsi_floor >= c.rsi_ceiling
        {
            return Err(ConfigError::invalid(
                "classifier.rsi_floor",
                "need 0 <= rsi_floor < rsi_ceiling <= 100",
            ));
        }
        if !c.adx_threshold.is_finite() || c.adx_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "classifier.adx_threshold",
                "must be a non-negative number",
            ));
        }
        if c.min_confidence > 100 {
            return Err(ConfigError::invalid(
                "classifier.min_confidence",
                "must be at most 100",
            ));
        }

        let p = &self.indicators;
        let periods = [
            ("indicators.ema_fast", p.ema_fast),
            ("indicators.ema_mid", p.ema_mid),
            ("indicators.ema_slow", p.ema_slow),
            ("indicators.adx", p.adx),
            ("indicators.atr", p.atr),
            ("indicators.rsi", p.rsi),
            ("indicators.volume", p.volume),
        ];
        if let Some((field, _)) = periods.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::invalid(field, "period must be at least 1"));
        }
        if !(p.ema_fast < p.ema_mid && p.ema_mid <= p.ema_slow) {
            return Err(ConfigError::invalid(
                "indicators.ema_fast",
                "need ema_fast < ema_mid <= ema_slow",
            ));
        }

        if self.backtest.forward_window == 0 {
            return Err(ConfigError::invalid(
                "backtest.forward_window",
                "must be at least 1",
            ));
        }
        if let DedupPolicy::Window { window_secs } = self.cooldown {
            if window_secs < 0 {
                return Err(ConfigError::invalid(
                    "cooldown.window_secs",
                    "must not be negative",
                ));
            }
            if self.cooldown.window_duration().is_none() {
                return Err(ConfigError::invalid(
                    "cooldown.window_secs",
                    "too large to represent",
                ));
            }
        }
        Ok(())
    }

    /// BLAKE3 hex digest of the canonical JSON form. Two configs with the
    /// same fingerprint produce the same signals from the same bars.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn validate_stops(field: &'static str, stops: &StopPolicy) -> Result<(), ConfigError> {
    let (stop, target, secondary) = match *stops {
        StopPolicy::Atr {
            stop_multiplier,
            target_multiplier,
            secondary_target_multiplier,
        } => (stop_multiplier, target_multiplier, secondary_target_multiplier),
        StopPolicy::Percent {
            stop_fraction,
            target_fraction,
            secondary_target_fraction,
        } => (stop_fraction, target_fraction, secondary_target_fraction),
    };
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(stop) || !positive(target) || !secondary.map_or(true, positive) {
        return Err(ConfigError::invalid(field, "distances must be positive"));
    }
    Ok(())
}
