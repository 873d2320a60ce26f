// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use digit_recognizer::data::idx::{encode_images, encode_labels};
use digit_recognizer::{ActivationFunction, Layer, Matrix, Network};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SIDE: usize = 28;
pub const PIXELS: usize = SIDE * SIDE;
pub const BLOCK: usize = PIXELS / 10;

/// Writes an IDX label/image pair into `dir` and returns their paths.
pub fn write_dataset(dir: &Path, labels: &[u8], images: &[Vec<u8>], rows: usize, cols: usize) -> (PathBuf, PathBuf) {
    let labels_path = dir.join("labels-idx1-ubyte");
    let images_path = dir.join("images-idx3-ubyte");
    fs::write(&labels_path, encode_labels(labels)).unwrap();
    fs::write(&images_path, encode_images(images, rows, cols).unwrap()).unwrap();
    (labels_path, images_path)
}

/// One 28×28 image per digit: digit `k` lights up pixels `[k*78, (k+1)*78)`.
pub fn digit_blocks() -> (Vec<u8>, Vec<Vec<u8>>) {
    let labels: Vec<u8> = (0..10).collect();
    let images = (0..10)
        .map(|k| {
            let mut image = vec![0u8; PIXELS];
            for px in &mut image[k * BLOCK..(k + 1) * BLOCK] {
                *px = 255;
            }
            image
        })
        .collect();
    (labels, images)
}

/// Tiny dataset whose image `i` has every pixel equal to `i` and label `i % 10`.
pub fn numbered_records(count: usize, rows: usize, cols: usize) -> (Vec<u8>, Vec<Vec<u8>>) {
    let labels = (0..count).map(|i| (i % 10) as u8).collect();
    let images = (0..count).map(|i| vec![i as u8; rows * cols]).collect();
    (labels, images)
}

pub fn random_matrix(rows: usize, cols: usize, scale: f64, rng: &mut StdRng) -> Matrix {
    Matrix::from_fn(rows, cols, |_, _| (rng.gen::<f64>() * 2.0 - 1.0) * scale)
}

pub fn random_vec(len: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..len).map(|_| rng.gen::<f64>()).collect()
}

/// Network with random parameters for the given `(input, output, activation)` chain.
pub fn random_network(shapes: &[(usize, usize, ActivationFunction)], seed: u64) -> Network {
    let mut rng = StdRng::seed_from_u64(seed);
    let layers = shapes
        .iter()
        .map(|&(input, output, activation)| {
            Layer::from_parameters(
                random_matrix(input, output, 0.5, &mut rng),
                random_matrix(1, output, 0.5, &mut rng),
                activation,
            )
            .unwrap()
        })
        .collect();
    Network::new(layers, 0.1).unwrap()
}

/// Rebuilds `network` with new parameters taken from `params`.
pub fn with_parameters(network: &Network, params: Vec<(Matrix, Matrix)>) -> Network {
    let layers = network
        .layers()
        .iter()
        .zip(params)
        .map(|(l, (w, b))| Layer::from_parameters(w, b, l.activation).unwrap())
        .collect();
    Network::new(layers, network.learning_rate()).unwrap()
}

pub fn parameters(network: &Network) -> Vec<(Matrix, Matrix)> {
    network
        .layers()
        .iter()
        .map(|l| (l.weights.clone(), l.biases.clone()))
        .collect()
}
