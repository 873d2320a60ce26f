use rand::{Rng, RngCore};

use crate::error::{Error, Result};

/// Inverted dropout: each unit survives with probability `keep_probability`
/// and survivors are scaled by `1 / keep_probability`, so the expected
/// activation is unchanged. Only used while training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout {
    keep_probability: f64,
}

impl Dropout {
    /// `keep_probability` must lie in `(0, 1]`.
    pub fn new(keep_probability: f64) -> Result<Dropout> {
        if !(keep_probability > 0.0 && keep_probability <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "dropout keep probability must be in (0, 1], got {keep_probability}"
            )));
        }
        Ok(Dropout { keep_probability })
    }

    pub fn keep_probability(&self) -> f64 {
        self.keep_probability
    }

    /// Draws a mask of `len` entries, each `0` or `1 / keep_probability`.
    pub fn mask(&self, len: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let scale = 1.0 / self.keep_probability;
        (0..len)
            .map(|_| if rng.gen::<f64>() < self.keep_probability { scale } else { 0.0 })
            .collect()
    }

    /// Applies a freshly drawn mask to `values`.
    pub fn apply(&self, values: &[f64], rng: &mut dyn RngCore) -> Vec<f64> {
        let mask = self.mask(values.len(), rng);
        values.iter().zip(mask.iter()).map(|(v, m)| v * m).collect()
    }
}
