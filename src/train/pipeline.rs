use std::sync::mpsc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::provider::BatchDataProvider;
use crate::error::{Error, Result};
use crate::init::InitializerType;
use crate::model::prediction_model::PredictionModel;
use crate::network::network::Network;
use crate::optim::clipping::DEFAULT_CLIP_THRESHOLD;
use crate::optim::momentum::MomentumOptimizer;
use crate::train::config::TrainingConfig;
use crate::train::epoch_stats::EpochStats;

/// Wires a network, an optimizer and a data provider into a training run.
///
/// ```ignore
/// let model = LearningPipeline::new()
///     .use_gradient_clipping()
///     .use_l2_regularization(15.0)
///     .use_dropout(0.5)
///     .set_weights_initializer(InitializerType::RandomInitialization)
///     .set_epoch_count(10)
///     .add_network(network)
///     .add_optimizer(optimizer)
///     .add_provider(provider)
///     .run()?;
/// ```
#[derive(Default)]
pub struct LearningPipeline {
    config: TrainingConfig,
    network: Option<Network>,
    optimizer: Option<MomentumOptimizer>,
    provider: Option<BatchDataProvider>,
    progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl LearningPipeline {
    pub fn new() -> LearningPipeline {
        LearningPipeline::default()
    }

    pub fn from_config(config: TrainingConfig) -> LearningPipeline {
        LearningPipeline { config, ..LearningPipeline::default() }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Clips by global norm at `DEFAULT_CLIP_THRESHOLD`.
    pub fn use_gradient_clipping(self) -> LearningPipeline {
        self.use_gradient_clipping_with(DEFAULT_CLIP_THRESHOLD)
    }

    pub fn use_gradient_clipping_with(mut self, threshold: f64) -> LearningPipeline {
        self.config.gradient_clipping = Some(threshold);
        self
    }

    pub fn use_l2_regularization(mut self, factor: f64) -> LearningPipeline {
        self.config.l2_regularization = Some(factor);
        self
    }

    /// `keep_probability` is the chance a hidden unit survives.
    pub fn use_dropout(mut self, keep_probability: f64) -> LearningPipeline {
        self.config.dropout_keep_probability = Some(keep_probability);
        self
    }

    pub fn set_weights_initializer(mut self, initializer: InitializerType) -> LearningPipeline {
        self.config.initializer = initializer;
        self
    }

    pub fn set_epoch_count(mut self, epochs: usize) -> LearningPipeline {
        self.config.epochs = epochs;
        self
    }

    /// Makes initialization and dropout reproducible.
    pub fn set_seed(mut self, seed: u64) -> LearningPipeline {
        self.config.seed = Some(seed);
        self
    }

    pub fn add_network(mut self, network: Network) -> LearningPipeline {
        self.network = Some(network);
        self
    }

    pub fn add_optimizer(mut self, optimizer: MomentumOptimizer) -> LearningPipeline {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn add_provider(mut self, provider: BatchDataProvider) -> LearningPipeline {
        self.provider = Some(provider);
        self
    }

    /// One `EpochStats` is sent per completed epoch. A dropped receiver is
    /// ignored; training still runs to the configured epoch count.
    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> LearningPipeline {
        self.progress_tx = Some(tx);
        self
    }

    /// Initializes the network, trains it for every configured epoch (one
    /// optimizer step per minibatch, in provider order) and snapshots it.
    ///
    /// Any step error, including `NumericalInstability`, halts the run and
    /// is returned; no model is produced from a failed run.
    pub fn run(self) -> Result<PredictionModel> {
        let LearningPipeline { config, network, optimizer, provider, progress_tx } = self;
        config.validate()?;
        let mut network = network.ok_or_else(|| missing("network"))?;
        let mut optimizer = optimizer.ok_or_else(|| missing("optimizer"))?;
        let mut provider = provider.ok_or_else(|| missing("data provider"))?;

        if provider.feature_len() != network.input_size() {
            return Err(Error::shape(
                "dataset features vs network input",
                (1, network.input_size()),
                (1, provider.feature_len()),
            ));
        }

        let mut rng = match config.seed {
            Some(seed) => {
                optimizer.reseed(seed.wrapping_add(1));
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        let initializer = config.initializer.build();
        network.initialize(initializer.as_ref(), &mut rng);

        for epoch in 1..=config.epochs {
            let t_start = Instant::now();
            let mut total_loss = 0.0;
            let mut samples = 0usize;
            let mut batches = 0usize;
            let mut clipped_batches = 0usize;

            for batch in provider.batches()? {
                let batch = batch?;
                let report = optimizer.step(&mut network, &batch, &config)?;
                total_loss += report.loss * batch.len() as f64;
                samples += batch.len();
                batches += 1;
                if report.clipped {
                    clipped_batches += 1;
                }
            }

            let stats = EpochStats {
                epoch,
                total_epochs: config.epochs,
                train_loss: if samples > 0 { total_loss / samples as f64 } else { 0.0 },
                batches,
                clipped_batches,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            if let Some(ref tx) = progress_tx {
                let _ = tx.send(stats);
            }
        }

        PredictionModel::from_network(&network)
    }
}

fn missing(component: &str) -> Error {
    Error::InvalidConfig(format!("learning pipeline has no {component} registered"))
}
