use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{
    data::batch::{one_hot, Batch},
    error::{Error, Result},
    layers::dense::LayerGradients,
    loss::LossFunction,
    math::matrix::Matrix,
    network::network::Network,
    optim::clipping::{clip_by_global_norm, global_norm},
    optim::update_rule::{ParamId, ParamKind, UpdateRule},
    train::config::TrainingConfig,
};

/// Outcome of one optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Mean loss over the batch.
    pub loss: f64,
    /// Global gradient norm before clipping.
    pub gradient_norm: f64,
    pub clipped: bool,
}

#[derive(Debug, Clone)]
struct Velocity {
    weights: Matrix,
    biases: Matrix,
}

/// Gradient descent with momentum:
///
/// ```text
/// v = momentum * v + g
/// p = p - learning_rate * v
/// ```
///
/// Holds one velocity tensor per weight and bias tensor of the network it
/// was built for, zeroed at construction and never reset afterwards.
#[derive(Debug, Clone)]
pub struct MomentumOptimizer {
    loss: LossFunction,
    momentum: f64,
    velocities: Vec<Velocity>,
    rng: StdRng,
}

impl MomentumOptimizer {
    /// Sizes the velocity state after `network` and checks that `loss` is
    /// valid for its output activation.
    pub fn new(network: &Network, loss: LossFunction, momentum: f64) -> Result<MomentumOptimizer> {
        if !(0.0..1.0).contains(&momentum) {
            return Err(Error::InvalidConfig(format!(
                "momentum coefficient must be in [0, 1), got {momentum}"
            )));
        }
        loss.check_output_activation(network.output_activation())?;
        let velocities = network.layers().iter()
            .map(|layer| Velocity {
                weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
                biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
            })
            .collect();
        Ok(MomentumOptimizer {
            loss,
            momentum,
            velocities,
            rng: StdRng::from_entropy(),
        })
    }

    /// Fixes the dropout mask sequence.
    pub fn with_seed(mut self, seed: u64) -> MomentumOptimizer {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn loss(&self) -> LossFunction {
        self.loss
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Runs one training step on `batch`.
    ///
    /// Per-example gradients are summed over the batch, L2 is added to weight
    /// gradients, then the whole set is clipped by global norm. If the loss or
    /// any gradient is non-finite the step fails with `NumericalInstability`
    /// before any parameter or velocity is modified.
    pub fn step(
        &mut self,
        network: &mut Network,
        batch: &Batch,
        config: &TrainingConfig,
    ) -> Result<StepReport> {
        self.check_state(network)?;
        if batch.is_empty() {
            return Err(Error::InvalidConfig("cannot take a step on an empty batch".to_owned()));
        }
        let dropout = config.dropout()?;
        let classes = network.output_size();

        let mut gradients: Vec<LayerGradients> = network.layers().iter()
            .map(LayerGradients::zeros_like)
            .collect();
        let mut total_loss = 0.0;

        for (pixels, label) in batch.iter() {
            let target = one_hot(label, classes)?;
            let output = match &dropout {
                Some(d) => network.forward_with_dropout(pixels, d, &mut self.rng)?,
                None => network.forward(pixels)?,
            };
            total_loss += self.loss.compute(&output, &target);
            let loss_gradient = self.loss.gradient(&output, &target);
            for (acc, g) in gradients.iter_mut().zip(network.backward(&loss_gradient)?.iter()) {
                acc.accumulate(g);
            }
        }

        let mean_loss = total_loss / batch.len() as f64;
        if !mean_loss.is_finite() {
            return Err(Error::unstable(format!("batch loss is {mean_loss}")));
        }

        if let Some(factor) = config.l2_regularization {
            for (g, layer) in gradients.iter_mut().zip(network.layers().iter()) {
                g.weights.add_scaled(&layer.weights, factor);
            }
        }

        if let Some(i) = gradients.iter().position(|g| !g.is_finite()) {
            return Err(Error::unstable(format!("non-finite gradient in layer {i}")));
        }

        let gradient_norm = global_norm(&gradients);
        let clipped = match config.gradient_clipping {
            Some(threshold) => clip_by_global_norm(&mut gradients, threshold),
            None => false,
        };

        network.apply_gradients(&gradients, self)?;

        Ok(StepReport { loss: mean_loss, gradient_norm, clipped })
    }

    fn check_state(&self, network: &Network) -> Result<()> {
        if self.velocities.len() != network.layers().len() {
            return Err(Error::shape(
                "optimizer velocity state",
                (network.layers().len(), 1),
                (self.velocities.len(), 1),
            ));
        }
        for (i, (v, layer)) in self.velocities.iter().zip(network.layers().iter()).enumerate() {
            if v.weights.shape() != layer.weights.shape() {
                return Err(Error::shape(
                    format!("optimizer velocity for layer {i}"),
                    layer.weights.shape(),
                    v.weights.shape(),
                ));
            }
            if v.biases.shape() != layer.biases.shape() {
                return Err(Error::shape(
                    format!("optimizer bias velocity for layer {i}"),
                    layer.biases.shape(),
                    v.biases.shape(),
                ));
            }
        }
        Ok(())
    }
}

impl UpdateRule for MomentumOptimizer {
    fn update(
        &mut self,
        param: ParamId,
        values: &mut Matrix,
        gradient: &Matrix,
        learning_rate: f64,
    ) -> Result<()> {
        let state = self.velocities.get_mut(param.layer).ok_or_else(|| {
            Error::shape("optimizer velocity state", (param.layer + 1, 1), (0, 1))
        })?;
        let velocity = match param.kind {
            ParamKind::Weights => &mut state.weights,
            ParamKind::Biases => &mut state.biases,
        };
        if velocity.shape() != values.shape() {
            return Err(Error::shape(
                format!("velocity for layer {} {:?}", param.layer, param.kind),
                values.shape(),
                velocity.shape(),
            ));
        }
        velocity.scale_in_place(self.momentum);
        velocity.add_assign(gradient);
        values.add_scaled(velocity, -learning_rate);
        Ok(())
    }
}
