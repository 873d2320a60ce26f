use rand::RngCore;

use crate::{
    activation::ActivationFunction,
    error::{Error, Result},
    init::WeightInitializer,
    layers::dense::{Layer, LayerGradients},
    optim::dropout::Dropout,
    optim::update_rule::{ParamId, ParamKind, UpdateRule},
};

/// Ordered stack of dense layers plus the learning rate used to scale updates.
///
/// The network computes activations and gradients; it never decides how
/// parameters change. That policy arrives through `apply_gradients`.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    learning_rate: f64,
}

impl Network {
    /// Builds a network from layers in execution order.
    ///
    /// Fails with `ShapeMismatch` if a layer's input size differs from the
    /// previous layer's output size, and with `InvalidConfig` if Softmax sits
    /// anywhere but the output layer.
    pub fn new(layers: Vec<Layer>, learning_rate: f64) -> Result<Network> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig("a network needs at least one layer".to_owned()));
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be positive and finite, got {learning_rate}"
            )));
        }
        check_softmax_placement(&layers)?;
        for (i, pair) in layers.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.output_size() != next.input_size() {
                return Err(Error::shape(
                    format!("layer {} input", i + 1),
                    (prev.output_size(), next.output_size()),
                    (next.input_size(), next.output_size()),
                ));
            }
        }
        Ok(Network { layers, learning_rate })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    /// Output layer activation; decides which losses may be paired with it.
    pub fn output_activation(&self) -> ActivationFunction {
        self.layers[self.layers.len() - 1].activation
    }

    /// Re-draws every layer's weights with `initializer`.
    pub fn initialize(&mut self, initializer: &dyn WeightInitializer, rng: &mut dyn RngCore) {
        for layer in &mut self.layers {
            layer.initialize(initializer, rng);
        }
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let mut current = input.to_vec();
        for layer in &mut self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Training forward pass with inverted dropout on every hidden layer's
    /// output. The output layer is never dropped.
    pub fn forward_with_dropout(
        &mut self,
        input: &[f64],
        dropout: &Dropout,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>> {
        let last = self.layers.len() - 1;
        let mut current = input.to_vec();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            current = layer.forward(&current)?;
            if i < last {
                let mask = dropout.mask(current.len(), rng);
                current = layer.apply_dropout_mask(mask)?;
            }
        }
        Ok(current)
    }

    /// Forward pass that leaves the layer caches alone.
    pub fn infer(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.infer(&current)?;
        }
        Ok(current)
    }

    /// Back-propagates `loss_gradient` (∂L/∂output) through every layer in
    /// reverse order. The result holds one entry per layer, in layer order.
    pub fn backward(&self, loss_gradient: &[f64]) -> Result<Vec<LayerGradients>> {
        let mut per_layer = Vec::with_capacity(self.layers.len());
        let mut delta = loss_gradient.to_vec();
        for layer in self.layers.iter().rev() {
            let (input_gradient, gradients) = layer.backward(&delta)?;
            per_layer.push(gradients);
            delta = input_gradient;
        }
        per_layer.reverse();
        Ok(per_layer)
    }

    /// Hands every parameter tensor and its gradient to `rule`.
    ///
    /// All shapes are checked before the first parameter is touched.
    pub fn apply_gradients(
        &mut self,
        gradients: &[LayerGradients],
        rule: &mut dyn UpdateRule,
    ) -> Result<()> {
        if gradients.len() != self.layers.len() {
            return Err(Error::shape(
                "per-layer gradient list",
                (self.layers.len(), 1),
                (gradients.len(), 1),
            ));
        }
        for (i, (layer, grad)) in self.layers.iter().zip(gradients.iter()).enumerate() {
            if grad.weights.shape() != layer.weights.shape() {
                return Err(Error::shape(
                    format!("layer {i} weight gradient"),
                    layer.weights.shape(),
                    grad.weights.shape(),
                ));
            }
            if grad.biases.shape() != layer.biases.shape() {
                return Err(Error::shape(
                    format!("layer {i} bias gradient"),
                    layer.biases.shape(),
                    grad.biases.shape(),
                ));
            }
        }

        let lr = self.learning_rate;
        for (i, (layer, grad)) in self.layers.iter_mut().zip(gradients.iter()).enumerate() {
            rule.update(ParamId { layer: i, kind: ParamKind::Weights }, &mut layer.weights, &grad.weights, lr)?;
            rule.update(ParamId { layer: i, kind: ParamKind::Biases }, &mut layer.biases, &grad.biases, lr)?;
        }
        Ok(())
    }
}

/// Softmax back-propagates as a pass-through, which is only exact on the
/// output layer paired with cross-entropy.
pub(crate) fn check_softmax_placement(layers: &[Layer]) -> Result<()> {
    let hidden = layers.len().saturating_sub(1);
    match layers[..hidden].iter().position(|l| l.activation == ActivationFunction::Softmax) {
        Some(i) => Err(Error::InvalidConfig(format!(
            "softmax is only supported on the output layer, found it on layer {i} of {}",
            layers.len()
        ))),
        None => Ok(()),
    }
}
