use foldstat_core::{ConfigError, FoldError};
use foldstat_io::IoError;
use foldstat_stats::StatsError;
use thiserror::Error;

/// Everything that can stop or degrade a collation run.
#[derive(Debug, Error)]
pub enum CollateError {
    /// One fold could not be used; the run carries on without it.
    #[error(transparent)]
    Recoverable(#[from] FoldError),

    /// The run cannot proceed.
    #[error(transparent)]
    Fatal(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("Statistics failure: {0}")]
    Stats(#[from] StatsError),

    #[error("Cannot build worker pool: {0}")]
    ThreadPool(String),
}

impl CollateError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CollateError::Recoverable(_))
    }
}

impl From<std::io::Error> for CollateError {
    fn from(e: std::io::Error) -> Self {
        CollateError::Io(IoError::from(e))
    }
}

pub type CollateResult<T> = Result<T, CollateError>;
