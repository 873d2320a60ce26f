pub mod config;
pub mod epoch_stats;
pub mod pipeline;

pub use config::TrainingConfig;
pub use epoch_stats::EpochStats;
pub use pipeline::LearningPipeline;
