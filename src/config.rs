use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{DigitConfig, LanguageIdConfig, PerceptronConfig, RegressionConfig};
use crate::Result;

/// Root directory for on-disk datasets.
pub const DATA_DIR_ENV: &str = "LIGHT_MODELS_DATA";
const DEFAULT_DATA_DIR: &str = "data";

/// Settings for every model, as read by the `train` binary. Missing fields
/// fall back to the tuned defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    pub perceptron: PerceptronConfig,
    pub regression: RegressionConfig,
    pub digits: DigitConfig,
    pub lang_id: LanguageIdConfig,
}

impl TrainingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        TrainingConfig::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.perceptron.validate()?;
        self.regression.validate()?;
        self.digits.validate()?;
        self.lang_id.validate()
    }
}

/// `$LIGHT_MODELS_DATA`, or `./data` when unset.
pub fn data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn mnist_dir() -> PathBuf {
    data_dir().join("mnist")
}

pub fn lang_id_dir() -> PathBuf {
    data_dir().join("lang_id")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"seed": 7, "digits": {"eval_after_secs": 0}}"#;
        let config = TrainingConfig::from_json_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.digits.eval_after_secs, 0);
        assert_eq!(config.digits.batch_size, 10);
        assert_eq!(config.lang_id, LanguageIdConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TrainingConfig::from_json_str(r#"{"regression": {"batch_size": 0}}"#).is_err());
        assert!(TrainingConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = TrainingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(TrainingConfig::from_json_str(&json).unwrap(), config);
    }
}
