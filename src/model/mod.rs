pub mod prediction_model;

pub use prediction_model::{PredictionModel, MODEL_FORMAT_VERSION};
