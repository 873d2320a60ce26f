use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::loss::{CrossEntropyLoss, MseLoss};

/// Selects which loss function the optimizer minimizes.
///
/// - `CrossEntropy`: pair with a Softmax output. The gradient is the
///   combined Softmax+CE gradient (predicted - expected).
/// - `MeanSquaredError`: pair with any element-wise output activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFunction {
    CrossEntropy,
    MeanSquaredError,
}

impl LossFunction {
    pub fn compute(&self, predicted: &[f64], target: &[f64]) -> f64 {
        match self {
            LossFunction::CrossEntropy => CrossEntropyLoss::loss(predicted, target),
            LossFunction::MeanSquaredError => MseLoss::loss(predicted, target),
        }
    }

    /// Gradient handed to the output layer's backward pass.
    pub fn gradient(&self, predicted: &[f64], target: &[f64]) -> Vec<f64> {
        match self {
            LossFunction::CrossEntropy => CrossEntropyLoss::derivative(predicted, target),
            LossFunction::MeanSquaredError => MseLoss::derivative(predicted, target),
        }
    }

    /// Rejects output activations this loss's gradient is not valid for.
    pub fn check_output_activation(&self, output: ActivationFunction) -> Result<()> {
        match (self, output) {
            (LossFunction::CrossEntropy, ActivationFunction::Softmax) => Ok(()),
            (LossFunction::CrossEntropy, other) => Err(Error::InvalidConfig(format!(
                "cross-entropy requires a softmax output layer, found {}",
                other.name()
            ))),
            (LossFunction::MeanSquaredError, ActivationFunction::Softmax) => Err(Error::InvalidConfig(
                "mean squared error cannot back-propagate through a softmax output layer".to_owned(),
            )),
            (LossFunction::MeanSquaredError, _) => Ok(()),
        }
    }
}
