pub mod error;
pub mod math;
pub mod activation;
pub mod init;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;
pub mod model;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use init::InitializerType;
pub use layers::dense::{Layer, LayerGradients};
pub use network::network::Network;
pub use network::spec::{LayerSpec, NetworkSpec};
pub use loss::LossFunction;
pub use optim::{Dropout, MomentumOptimizer, StepReport, UpdateRule};
pub use data::{Batch, BatchDataProvider};
pub use train::{EpochStats, LearningPipeline, TrainingConfig};
pub use model::PredictionModel;
