//! Construction-time configuration for networks and training runs.
//!
//! Nothing here is global: every network carries its own copy.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use crate::optimizers::AdamConfig;
use crate::persistence::PersistenceError;

/// How gradients are propagated back through time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BpttMode {
    /// Each step's cell-state gradient comes only from its own hidden output.
    #[default]
    Truncated,
    /// Cell-state gradient also flows back through the next step's forget gate.
    Full,
}

/// Shape and optimizer settings of an `RNN`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    /// Default number of symbols produced by generation.
    pub recurrence_length: usize,
    /// Weights start uniform in `(-init_range, init_range)`.
    pub init_range: f32,
    /// Seed for weight initialisation; `None` draws from entropy.
    pub seed: Option<u64>,
    pub adam: AdamConfig,
    pub bptt: BpttMode,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            vocab_size: 0,
            hidden_size: 32,
            batch_size: 1,
            recurrence_length: 64,
            init_range: 0.1,
            seed: None,
            adam: AdamConfig::default(),
            bptt: BpttMode::Truncated,
        }
    }
}

impl NetworkConfig {
    pub fn new(vocab_size: usize, hidden_size: usize, batch_size: usize) -> Self {
        NetworkConfig {
            vocab_size,
            hidden_size,
            batch_size,
            ..NetworkConfig::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_adam(mut self, adam: AdamConfig) -> Self {
        self.adam = adam;
        self
    }

    pub fn with_init_range(mut self, init_range: f32) -> Self {
        self.init_range = init_range;
        self
    }

    pub fn with_recurrence_length(mut self, recurrence_length: usize) -> Self {
        self.recurrence_length = recurrence_length;
        self
    }

    pub fn with_bptt(mut self, bptt: BpttMode) -> Self {
        self.bptt = bptt;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("vocab_size", self.vocab_size),
            ("hidden_size", self.hidden_size),
            ("batch_size", self.batch_size),
        ] {
            if value == 0 {
                return Err(LstmError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.init_range >= 0.0 && self.init_range.is_finite()) {
            return Err(LstmError::InvalidConfig(format!(
                "init_range must be finite and non-negative, got {}",
                self.init_range
            )));
        }
        self.adam.validate()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, PersistenceError> {
        let contents = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for training runs over a corpus
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub min_epochs: usize,
    pub max_epochs: usize,
    /// Stop once the mean epoch loss falls below this (after `min_epochs`).
    pub error_threshold: f32,
    pub print_every: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            min_epochs: 1,
            max_epochs: 100,
            error_threshold: 0.0,
            print_every: 10,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 {
            return Err(LstmError::InvalidConfig("max_epochs must be positive".to_string()));
        }
        if self.min_epochs > self.max_epochs {
            return Err(LstmError::InvalidConfig(format!(
                "min_epochs ({}) exceeds max_epochs ({})",
                self.min_epochs, self.max_epochs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_validation() {
        assert!(NetworkConfig::new(3, 2, 1).validate().is_ok());
        assert!(NetworkConfig::new(0, 2, 1).validate().is_err());
        assert!(NetworkConfig::new(3, 2, 0).validate().is_err());
        assert!(NetworkConfig::new(3, 2, 1).with_init_range(-1.0).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"vocab_size": 5, "adam": {"alpha": 0.05}}"#).unwrap();
        assert_eq!(config.vocab_size, 5);
        assert_eq!(config.hidden_size, 32);
        assert_eq!(config.adam.alpha, 0.05);
        assert_eq!(config.adam.beta2, 0.999);
        assert_eq!(config.bptt, BpttMode::Truncated);
    }

    #[test]
    fn test_training_config_bounds() {
        assert!(TrainingConfig::default().validate().is_ok());
        let bad = TrainingConfig { min_epochs: 5, max_epochs: 2, ..TrainingConfig::default() };
        assert!(bad.validate().is_err());
    }
}
