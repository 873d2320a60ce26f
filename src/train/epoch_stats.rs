use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by `LearningPipeline::run`.
///
/// When a progress sender is registered on the pipeline, one `EpochStats`
/// value is sent at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all samples in this epoch.
    pub train_loss: f64,
    /// Optimizer steps taken, one per minibatch.
    pub batches: usize,
    /// Steps whose gradients were rescaled by clipping.
    pub clipped_batches: usize,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
