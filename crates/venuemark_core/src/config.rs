//! Engine tuning knobs.
//!
//! # Responsibility
//! - Hold thresholds and timings shared by calibration, scheduling and
//!   rendering hand-off.
//! - Load overrides from JSON with defaults for every missing field.
//!
//! # Invariants
//! - A config returned by `from_json_str`/`load` has passed `validate()`.

use crate::model::marker::MIN_REFERENCE_CODE_LEN;
use crate::scene::animation::Easing;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Runtime configuration for one AR session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Selections needed before a reward is scheduled.
    pub click_threshold: u32,
    /// Length of the one-shot spin started by a selection.
    pub spin_duration_ms: f64,
    /// Wait after the spin completes before the reward is delivered.
    pub reward_delay_ms: f64,
    /// Tracker settling time between origin capture and first reconstruction.
    pub settle_delay_ms: f64,
    /// Shortest fiducial code accepted as a reference.
    pub min_reference_code_len: usize,
    /// Vertical lift applied to rendered marker models, in meters.
    pub display_lift: f64,
    pub easing: Easing,
    /// Fixed seed for reward draws; entropy-seeded when absent.
    pub reward_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            click_threshold: 3,
            spin_duration_ms: 600.0,
            reward_delay_ms: 300.0,
            settle_delay_ms: 1000.0,
            min_reference_code_len: MIN_REFERENCE_CODE_LEN,
            display_lift: 1.0,
            easing: Easing::EaseOutQuad,
            reward_seed: None,
        }
    }
}

/// Config loading/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl EngineConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.click_threshold == 0 {
            return Err(ConfigError::Invalid("click_threshold must be at least 1"));
        }
        if !self.spin_duration_ms.is_finite() || self.spin_duration_ms <= 0.0 {
            return Err(ConfigError::Invalid("spin_duration_ms must be positive"));
        }
        if !self.reward_delay_ms.is_finite() || self.reward_delay_ms < 0.0 {
            return Err(ConfigError::Invalid("reward_delay_ms must be non-negative"));
        }
        if !self.settle_delay_ms.is_finite() || self.settle_delay_ms < 0.0 {
            return Err(ConfigError::Invalid("settle_delay_ms must be non-negative"));
        }
        if self.min_reference_code_len == 0 {
            return Err(ConfigError::Invalid(
                "min_reference_code_len must be at least 1",
            ));
        }
        if !self.display_lift.is_finite() {
            return Err(ConfigError::Invalid("display_lift must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use crate::scene::animation::Easing;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.click_threshold, 3);
        assert_eq!(config.min_reference_code_len, 4);
    }

    #[test]
    fn json_overrides_keep_remaining_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "click_threshold": 5, "easing": "ease_out_bounce" }"#)
                .unwrap();
        assert_eq!(config.click_threshold, 5);
        assert_eq!(config.easing, Easing::EaseOutBounce);
        assert_eq!(config.spin_duration_ms, 600.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "spin_duration_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str(r#"{ "unknown": 1 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "settle_delay_ms": 1500 }"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.settle_delay_ms, 1500.0);
    }
}
