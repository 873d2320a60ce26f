use rand::{Rng, RngCore};
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::math::matrix::Matrix;

/// Half-width of the uniform range used by `RandomInitializer`.
pub const RANDOM_INIT_SCALE: f64 = 0.0005;

/// Produces the starting weights of one layer.
///
/// Called once per layer when the pipeline builds the network. `rows` is
/// the fan-in (input size) and `cols` the fan-out (output size).
pub trait WeightInitializer {
    fn initialize(&self, rows: usize, cols: usize, rng: &mut dyn RngCore) -> Matrix;
}

/// Configuration-level choice of initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializerType {
    /// Small uniform draws in `±RANDOM_INIT_SCALE`.
    #[default]
    RandomInitialization,
    Xavier,
    He,
}

impl InitializerType {
    pub fn build(self) -> Box<dyn WeightInitializer> {
        match self {
            InitializerType::RandomInitialization => Box::new(RandomInitializer::default()),
            InitializerType::Xavier => Box::new(XavierInitializer),
            InitializerType::He => Box::new(HeInitializer),
        }
    }
}

/// Uniform draws in `[-scale, scale)`; enough to break symmetry between units.
#[derive(Debug, Clone, Copy)]
pub struct RandomInitializer {
    pub scale: f64,
}

impl Default for RandomInitializer {
    fn default() -> Self {
        RandomInitializer { scale: RANDOM_INIT_SCALE }
    }
}

impl WeightInitializer for RandomInitializer {
    fn initialize(&self, rows: usize, cols: usize, rng: &mut dyn RngCore) -> Matrix {
        Matrix::from_fn(rows, cols, |_, _| (rng.gen::<f64>() * 2.0 - 1.0) * self.scale)
    }
}

/// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / fan_in)).
///
/// Suited to Sigmoid/Tanh/Softplus layers. Keeps the variance of
/// activations and gradients roughly equal across layers.
#[derive(Debug, Clone, Copy)]
pub struct XavierInitializer;

impl WeightInitializer for XavierInitializer {
    fn initialize(&self, rows: usize, cols: usize, rng: &mut dyn RngCore) -> Matrix {
        let std_dev = (1.0 / rows.max(1) as f64).sqrt();
        Matrix::from_fn(rows, cols, |_, _| sample_standard_normal(rng) * std_dev)
    }
}

/// He initialization: samples from N(0, sqrt(2 / fan_in)).
///
/// Suited to ReLU layers; the extra factor 2 accounts for ReLU zeroing half
/// of its inputs on average.
#[derive(Debug, Clone, Copy)]
pub struct HeInitializer;

impl WeightInitializer for HeInitializer {
    fn initialize(&self, rows: usize, cols: usize, rng: &mut dyn RngCore) -> Matrix {
        let std_dev = (2.0 / rows.max(1) as f64).sqrt();
        Matrix::from_fn(rows, cols, |_, _| sample_standard_normal(rng) * std_dev)
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
fn sample_standard_normal(rng: &mut dyn RngCore) -> f64 {
    // Both draws in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
