use crate::error::{Error, Result};

/// A group of labeled examples: one pixel vector and one class index each.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    pixels: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Batch {
    /// Fails with `ShapeMismatch` unless there is exactly one label per row.
    pub fn new(pixels: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Batch> {
        if pixels.len() != labels.len() {
            return Err(Error::shape("batch rows", (labels.len(), 1), (pixels.len(), 1)));
        }
        Ok(Batch { pixels, labels })
    }

    pub fn pixels(&self) -> &[Vec<f64>] {
        &self.pixels
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f64], usize)> {
        self.pixels.iter().map(|p| p.as_slice()).zip(self.labels.iter().copied())
    }
}

/// One-hot vector of length `classes` with a 1 at `label`.
pub fn one_hot(label: usize, classes: usize) -> Result<Vec<f64>> {
    if label >= classes {
        return Err(Error::shape("one-hot label", (1, classes), (1, label + 1)));
    }
    let mut v = vec![0.0; classes];
    v[label] = 1.0;
    Ok(v)
}
