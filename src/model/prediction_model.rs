use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::data::batch::Batch;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::math::matrix::Matrix;
use crate::network::network::{check_softmax_placement, Network};

/// Revision of the model file layout written by `save`.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// On-disk form of one layer. Shapes are stored explicitly so a file can be
/// rebuilt without any outside metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayerRecord {
    input_size: usize,
    output_size: usize,
    activation: ActivationFunction,
    weights: Matrix,
    biases: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    layers: Vec<LayerRecord>,
}

/// Trained, read-only network used for inference.
///
/// Holds a deep copy of the parameters, independent of the training state;
/// nothing mutates it after construction, so it can be shared across
/// threads freely.
#[derive(Debug, Clone)]
pub struct PredictionModel {
    layers: Vec<Layer>,
}

impl PredictionModel {
    /// Snapshots the current parameters of `network`.
    pub fn from_network(network: &Network) -> Result<PredictionModel> {
        let layers = network.layers().iter()
            .map(|l| Layer::from_parameters(l.weights.clone(), l.biases.clone(), l.activation))
            .collect::<Result<Vec<_>>>()?;
        Ok(PredictionModel { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].output_size()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Inference-only forward pass; dropout never applies here.
    pub fn predict(&self, pixels: &[f64]) -> Result<Vec<f64>> {
        let mut current = pixels.to_vec();
        for layer in &self.layers {
            current = layer.infer(&current)?;
        }
        Ok(current)
    }

    /// Index of the highest output.
    pub fn predict_class(&self, pixels: &[f64]) -> Result<usize> {
        self.predict(pixels).map(|output| argmax(&output))
    }

    /// Fraction of `batch` whose predicted class equals its label.
    pub fn accuracy(&self, batch: &Batch) -> Result<f64> {
        if batch.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (pixels, label) in batch.iter() {
            if self.predict_class(pixels)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / batch.len() as f64)
    }

    /// Writes shapes, activations and parameters as JSON.
    ///
    /// The file is written next to `path` first and renamed into place, so a
    /// failed save never leaves a truncated model at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let record = ModelFile {
            format_version: MODEL_FORMAT_VERSION,
            layers: self.layers.iter()
                .map(|l| LayerRecord {
                    input_size: l.input_size(),
                    output_size: l.output_size(),
                    activation: l.activation,
                    weights: l.weights.clone(),
                    biases: l.biases.row().to_vec(),
                })
                .collect(),
        };

        let staging = path.with_extension("partial");
        let write = || -> std::result::Result<(), Box<dyn std::error::Error>> {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, &record)?;
            writer.flush()?;
            std::fs::rename(&staging, path)?;
            Ok(())
        };
        write().map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            Error::persistence(path, e)
        })
    }

    /// Restores a model written by `save`.
    pub fn load(path: impl AsRef<Path>) -> Result<PredictionModel> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::persistence(path, e))?;
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::persistence(path, e))?;

        let found = value
            .get("format_version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::persistence(path, "missing format_version"))?;
        if found != MODEL_FORMAT_VERSION as u64 {
            return Err(Error::VersionMismatch {
                expected: MODEL_FORMAT_VERSION,
                found: found.min(u32::MAX as u64) as u32,
            });
        }

        let record: ModelFile =
            serde_json::from_value(value).map_err(|e| Error::persistence(path, e))?;
        Self::from_records(record.layers).map_err(|e| Error::persistence(path, e))
    }

    fn from_records(records: Vec<LayerRecord>) -> Result<PredictionModel> {
        if records.is_empty() {
            return Err(Error::InvalidConfig("model file holds no layers".to_owned()));
        }
        let mut layers = Vec::with_capacity(records.len());
        for (i, r) in records.into_iter().enumerate() {
            if r.weights.shape() != (r.input_size, r.output_size)
                || r.weights.data.len() != r.input_size
                || r.weights.data.iter().any(|row| row.len() != r.output_size)
            {
                return Err(Error::shape(
                    format!("stored weights of layer {i}"),
                    (r.input_size, r.output_size),
                    r.weights.shape(),
                ));
            }
            let layer = Layer::from_parameters(r.weights, Matrix::from_row(r.biases), r.activation)?;
            if let Some(prev) = layers.last().map(|l: &Layer| l.output_size()) {
                if prev != layer.input_size() {
                    return Err(Error::shape(
                        format!("stored layer {i} input"),
                        (prev, layer.output_size()),
                        (layer.input_size(), layer.output_size()),
                    ));
                }
            }
            layers.push(layer);
        }
        check_softmax_placement(&layers)?;
        Ok(PredictionModel { layers })
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
