use serde::{Serialize, Deserialize};

/// Activation applied after a layer's affine transform.
///
/// Instances carry no state, so one value can be shared by any number of
/// layers and called from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Sigmoid,
    /// `ln(1 + e^x)`; its derivative is the logistic sigmoid.
    Softplus,
    ReLU,
    Tanh,
    Identity,
    /// Vector-valued: normalizes the whole layer output into a distribution.
    /// Only valid on the output layer, paired with cross-entropy.
    Softmax,
}

impl ActivationFunction {
    /// Stable identifier written into model files.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::Softplus => "softplus",
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::Identity => "identity",
            ActivationFunction::Softmax => "softmax",
        }
    }

    /// Transforms a whole pre-activation vector. Output has the input's length.
    pub fn activate(&self, values: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(values),
            _ => values.iter().map(|&x| self.function(x)).collect(),
        }
    }

    /// Local gradient factor per unit, evaluated at the pre-activation.
    ///
    /// For `Softmax` this is the combined softmax + cross-entropy gradient
    /// with respect to the logits, `softmax(z) - one_hot`. Every other variant
    /// ignores `one_hot` and returns the pointwise derivative `f'(z)`.
    pub fn derivative(&self, pre_activation: &[f64], one_hot: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => softmax(pre_activation)
                .into_iter()
                .zip(one_hot.iter())
                .map(|(p, y)| p - y)
                .collect(),
            _ => pre_activation.iter().map(|&x| self.pointwise_derivative(x)).collect(),
        }
    }

    /// Turns `∂L/∂a` into `∂L/∂z` for this activation: `upstream ⊙ f'(z)`
    /// using `derivative` for the pointwise variants.
    ///
    /// `Softmax` passes the upstream gradient through unchanged: the loss
    /// gradient it receives is already taken with respect to the logits.
    pub fn backprop(&self, pre_activation: &[f64], upstream: &[f64]) -> Vec<f64> {
        match self {
            ActivationFunction::Softmax => upstream.to_vec(),
            _ => self
                .derivative(pre_activation, &[])
                .into_iter()
                .zip(upstream.iter())
                .map(|(d, g)| g * d)
                .collect(),
        }
    }

    fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::Softplus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity => x,
            // Handled as a whole vector in `activate`.
            ActivationFunction::Softmax => x,
        }
    }

    fn pointwise_derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::Softplus => sigmoid(x),
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Softmax => 1.0,
        }
    }
}

/// Logistic sigmoid, written so neither branch overflows `exp`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Max-shifted softmax.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
