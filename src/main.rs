// Trains the digit classifier on an IDX dataset, reports held-out accuracy
// and saves the model.
//
// Usage:
//   digit-recognizer <data-dir> [training-config.json]
//
// <data-dir> must hold the four standard MNIST IDX files.
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use digit_recognizer::{
    BatchDataProvider, InitializerType, LearningPipeline, LossFunction, MomentumOptimizer,
    NetworkSpec, PredictionModel, Result, TrainingConfig,
};

const LEARNING_RATE: f64 = 0.00035;
const MOMENTUM: f64 = 0.93;
const BATCH_SIZE: usize = 100;
const MODELS_DIR: &str = "models";

fn default_config() -> TrainingConfig {
    LearningPipeline::new()
        .use_gradient_clipping()
        .use_l2_regularization(15.0)
        .use_dropout(0.5)
        .set_weights_initializer(InitializerType::RandomInitialization)
        .set_epoch_count(10)
        .config()
        .clone()
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(data_dir) = args.get(1) else {
        eprintln!("usage: {} <data-dir> [training-config.json]", args[0]);
        return ExitCode::FAILURE;
    };

    match run(Path::new(data_dir), args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(data_dir: &Path, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => TrainingConfig::load_json(path)?,
        None => default_config(),
    };

    let network = NetworkSpec::digit_classifier(LEARNING_RATE).build()?;
    let optimizer = MomentumOptimizer::new(&network, LossFunction::CrossEntropy, MOMENTUM)?;
    let provider = BatchDataProvider::new(
        data_dir.join("train-labels-idx1-ubyte"),
        data_dir.join("train-images-idx3-ubyte"),
        BATCH_SIZE,
    )?;

    println!("Training on {} images for {} epochs...", provider.record_count(), config.epochs);
    println!("{:>6}  {:>12}  {:>8}  {:>8}  {:>10}", "Epoch", "CE Loss", "Batches", "Clipped", "Time (ms)");
    println!("{}", "─".repeat(52));

    let (tx, rx) = mpsc::channel();
    let pipeline = LearningPipeline::from_config(config)
        .add_network(network)
        .add_optimizer(optimizer)
        .add_provider(provider)
        .with_progress(tx);
    let worker = thread::spawn(move || pipeline.run());

    for stats in rx {
        println!(
            "{:>6}  {:>12.6}  {:>8}  {:>8}  {:>10}",
            format!("{}/{}", stats.epoch, stats.total_epochs),
            stats.train_loss,
            stats.batches,
            stats.clipped_batches,
            stats.elapsed_ms
        );
    }
    let model = worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;

    let test = BatchDataProvider::new(
        data_dir.join("t10k-labels-idx1-ubyte"),
        data_dir.join("t10k-images-idx3-ubyte"),
        BATCH_SIZE,
    )?
    .get_data()?;
    let accuracy = model.accuracy(&test)?;
    println!("\nAccuracy on the test data is: {:.2}%", accuracy * 100.0);

    let path = model_path(accuracy);
    save(&model, &path)?;
    println!("Model saved to {}", path.display());
    Ok(())
}

fn model_path(accuracy: f64) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Path::new(MODELS_DIR).join(format!("{stamp}-{accuracy:.4}.nn"))
}

fn save(model: &PredictionModel, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| digit_recognizer::Error::Persistence { path: dir.to_path_buf(), reason: e.to_string() })?;
    }
    model.save(path)
}
