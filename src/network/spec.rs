use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::network::network::Network;

/// Describes one layer in a network specification.
///
/// `input_size` must equal the previous layer's `output_size`, or the raw
/// input dimension for the first layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable description of a network architecture, storable as JSON
/// independently of any trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Ordered list of layer descriptions (input → output).
    pub layers: Vec<LayerSpec>,
    pub learning_rate: f64,
}

impl NetworkSpec {
    /// The single-layer digit classifier: 784 pixels → 10 classes, Softmax.
    pub fn digit_classifier(learning_rate: f64) -> NetworkSpec {
        NetworkSpec {
            layers: vec![LayerSpec {
                input_size: 784,
                output_size: 10,
                activation: ActivationFunction::Softmax,
            }],
            learning_rate,
        }
    }

    /// Builds an untrained network with zeroed parameters.
    pub fn build(&self) -> Result<Network> {
        let layers = self.layers.iter()
            .map(|l| Layer::new(l.input_size, l.output_size, l.activation))
            .collect();
        Network::new(layers, self.learning_rate)
    }

    /// Writes this architecture as pretty-printed JSON.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|e| Error::persistence(path, e))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| Error::persistence(path, e))
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path).map_err(|e| Error::persistence(path, e))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| Error::persistence(path, e))
    }
}
