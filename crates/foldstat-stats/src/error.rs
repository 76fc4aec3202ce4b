use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("Need at least {needed} samples, got {found}")]
    TooFewSamples { needed: usize, found: usize },

    #[error("Non-finite difference at position {0}")]
    NonFinite(usize),

    #[error("Cannot build distribution: {0}")]
    Distribution(String),
}

pub type StatsResult<T> = Result<T, StatsError>;
