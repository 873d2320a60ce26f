use std::path::PathBuf;

/// Every failure the engine can report.
///
/// Shape problems and non-finite numbers are fatal for the current step or
/// construction; dataset and persistence failures are fatal for that load or
/// save only and never leave a half-written model behind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Adjacent layers do not chain, or a tensor disagrees with a layer's shape.
    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: String,
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// A loss or gradient value was NaN or infinite.
    #[error("numerical instability: {context}")]
    NumericalInstability { context: String },

    /// A dataset file could not be parsed at its expected fixed layout.
    #[error("dataset format error in {}: {reason}", .path.display())]
    DatasetFormat { path: PathBuf, reason: String },

    /// A dataset file could not be opened or read.
    #[error("cannot read dataset {}: {source}", .path.display())]
    DatasetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Saving or loading a model failed.
    #[error("model persistence failed for {}: {reason}", .path.display())]
    Persistence { path: PathBuf, reason: String },

    /// The model file was written by an incompatible format revision.
    #[error("model format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// A configuration value or pipeline wiring is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn shape(
        context: impl Into<String>,
        expected: (usize, usize),
        got: (usize, usize),
    ) -> Self {
        Error::ShapeMismatch { context: context.into(), expected, got }
    }

    pub(crate) fn unstable(context: impl Into<String>) -> Self {
        Error::NumericalInstability { context: context.into() }
    }

    pub(crate) fn dataset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::DatasetFormat { path: path.into(), reason: reason.into() }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Persistence { path: path.into(), reason: reason.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
