pub mod batch;
pub mod idx;
pub mod provider;

pub use batch::{one_hot, Batch};
pub use provider::{BatchDataProvider, Batches, DIGIT_CLASSES};
