use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::init::InitializerType;
use crate::optim::dropout::Dropout;

/// Everything a training run needs besides the network, optimizer and data.
///
/// Every optional regularizer is off when `None`. Built through the
/// `LearningPipeline` setters or loaded from JSON; read-only during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Full passes over the training data.
    pub epochs: usize,
    /// Global-norm threshold for gradient clipping.
    #[serde(default)]
    pub gradient_clipping: Option<f64>,
    /// L2 factor added as `factor * weights` to each weight gradient.
    #[serde(default)]
    pub l2_regularization: Option<f64>,
    /// Probability that a hidden unit survives dropout.
    #[serde(default)]
    pub dropout_keep_probability: Option<f64>,
    #[serde(default)]
    pub initializer: InitializerType,
    /// Seeds initialization, dropout and shuffling for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 1,
            gradient_clipping: None,
            l2_regularization: None,
            dropout_keep_probability: None,
            initializer: InitializerType::default(),
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epoch count must be at least 1".to_owned()));
        }
        if let Some(threshold) = self.gradient_clipping {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "gradient clipping threshold must be positive, got {threshold}"
                )));
            }
        }
        if let Some(factor) = self.l2_regularization {
            if !(factor.is_finite() && factor >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "L2 regularization factor must be non-negative, got {factor}"
                )));
            }
        }
        self.dropout().map(|_| ())
    }

    /// The configured dropout, if any.
    pub fn dropout(&self) -> Result<Option<Dropout>> {
        self.dropout_keep_probability.map(Dropout::new).transpose()
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::persistence(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| Error::persistence(path, e))
    }

    /// Deserializes and validates a config from a JSON file.
    pub fn load_json(path: &str) -> Result<TrainingConfig> {
        let file = std::fs::File::open(path).map_err(|e| Error::persistence(path, e))?;
        let reader = std::io::BufReader::new(file);
        let config: TrainingConfig =
            serde_json::from_reader(reader).map_err(|e| Error::persistence(path, e))?;
        config.validate()?;
        Ok(config)
    }
}
