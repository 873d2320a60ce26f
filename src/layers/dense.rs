use rand::RngCore;

use crate::{
    activation::activation::ActivationFunction,
    error::{Error, Result},
    init::WeightInitializer,
    math::matrix::Matrix,
};

/// Raw parameter gradients of one layer, shaped like its weights and biases.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

impl LayerGradients {
    pub fn zeros_like(layer: &Layer) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(layer.weights.rows, layer.weights.cols),
            biases: Matrix::zeros(layer.biases.rows, layer.biases.cols),
        }
    }

    pub fn accumulate(&mut self, other: &LayerGradients) {
        self.weights.add_assign(&other.weights);
        self.biases.add_assign(&other.biases);
    }

    pub fn is_finite(&self) -> bool {
        self.weights.is_finite() && self.biases.is_finite()
    }
}

/// Values remembered from the last forward call, consumed by `backward`.
#[derive(Debug, Clone, Default)]
struct ForwardCache {
    input: Vec<f64>,
    pre_activation: Vec<f64>,
    post_activation: Vec<f64>,
    /// Inverted-dropout mask applied to `post_activation`, if any.
    dropout_mask: Option<Vec<f64>>,
}

/// Fully connected layer: `a = f(x · W + b)`.
///
/// `weights` is `input_size × output_size`, `biases` is `1 × output_size`.
#[derive(Debug, Clone)]
pub struct Layer {
    pub weights: Matrix,
    pub biases: Matrix,
    pub activation: ActivationFunction,
    cache: Option<ForwardCache>,
}

impl Layer {
    /// Creates a layer with zeroed parameters; the pipeline initializes them.
    pub fn new(input_size: usize, output_size: usize, activation: ActivationFunction) -> Layer {
        Layer {
            weights: Matrix::zeros(input_size, output_size),
            biases: Matrix::zeros(1, output_size),
            activation,
            cache: None,
        }
    }

    /// Builds a layer around existing parameters, checking they agree.
    pub fn from_parameters(
        weights: Matrix,
        biases: Matrix,
        activation: ActivationFunction,
    ) -> Result<Layer> {
        if biases.shape() != (1, weights.cols) {
            return Err(Error::shape("layer biases", (1, weights.cols), biases.shape()));
        }
        Ok(Layer { weights, biases, activation, cache: None })
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    pub fn output_size(&self) -> usize {
        self.weights.cols
    }

    /// Draws fresh weights from `initializer` and zeroes the biases.
    pub fn initialize(&mut self, initializer: &dyn WeightInitializer, rng: &mut dyn RngCore) {
        self.weights = initializer.initialize(self.input_size(), self.output_size(), rng);
        self.biases = Matrix::zeros(1, self.output_size());
        self.cache = None;
    }

    /// Forward pass. Caches input, pre- and post-activation for the next
    /// `backward`; a second call overwrites the cache.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let (pre_activation, post_activation) = self.evaluate(input)?;
        self.cache = Some(ForwardCache {
            input: input.to_vec(),
            pre_activation,
            post_activation: post_activation.clone(),
            dropout_mask: None,
        });
        Ok(post_activation)
    }

    /// Pure forward pass: no cache, usable through a shared reference.
    pub fn infer(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.evaluate(input).map(|(_, post)| post)
    }

    /// Multiplies the cached output by `mask` and remembers the mask so the
    /// backward pass routes gradient only through surviving units.
    pub fn apply_dropout_mask(&mut self, mask: Vec<f64>) -> Result<Vec<f64>> {
        let size = self.output_size();
        let cache = self.cache.as_mut().ok_or_else(|| no_forward_pass(size))?;
        if mask.len() != cache.post_activation.len() {
            return Err(Error::shape("dropout mask", (1, size), (1, mask.len())));
        }
        for (a, m) in cache.post_activation.iter_mut().zip(mask.iter()) {
            *a *= m;
        }
        cache.dropout_mask = Some(mask);
        Ok(cache.post_activation.clone())
    }

    /// Output of the most recent forward pass, after any dropout mask.
    pub fn last_output(&self) -> Option<&[f64]> {
        self.cache.as_ref().map(|c| c.post_activation.as_slice())
    }

    /// Chain rule through this layer.
    ///
    /// `output_gradient` is `∂L/∂a` for this layer's output. Returns `∂L/∂x`
    /// for the previous layer together with the raw parameter gradients.
    /// Parameters are left untouched; updating them is the optimizer's job.
    pub fn backward(&self, output_gradient: &[f64]) -> Result<(Vec<f64>, LayerGradients)> {
        let size = self.output_size();
        let cache = self.cache.as_ref().ok_or_else(|| no_forward_pass(size))?;
        if output_gradient.len() != size {
            return Err(Error::shape("layer backward", (1, size), (1, output_gradient.len())));
        }

        let upstream: Vec<f64> = match &cache.dropout_mask {
            Some(mask) => output_gradient.iter().zip(mask.iter()).map(|(g, m)| g * m).collect(),
            None => output_gradient.to_vec(),
        };
        // δ = ∂L/∂z
        let delta = self.activation.backprop(&cache.pre_activation, &upstream);

        let gradients = LayerGradients {
            weights: Matrix::outer(&cache.input, &delta),
            biases: Matrix::from_row(delta.clone()),
        };
        let input_gradient = self.weights.mul_vec(&delta);

        Ok((input_gradient, gradients))
    }

    fn evaluate(&self, input: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        if input.len() != self.input_size() {
            return Err(Error::shape(
                "layer forward",
                (1, self.input_size()),
                (1, input.len()),
            ));
        }
        let mut z = self.weights.vec_mul(input);
        for (zi, b) in z.iter_mut().zip(self.biases.row()) {
            *zi += b;
        }
        let a = self.activation.activate(&z);
        Ok((z, a))
    }
}

fn no_forward_pass(size: usize) -> Error {
    Error::shape("layer backward without a cached forward pass", (1, size), (0, 0))
}
