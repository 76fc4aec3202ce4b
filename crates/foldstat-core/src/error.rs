use std::path::PathBuf;

use thiserror::Error;

/// Structural or numeric problem found while reading one results file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("File is empty")]
    Empty,

    #[error("Expected at least 4 lines (3 header lines and a prediction), found {found}")]
    TooFewLines { found: usize },

    #[error("Line {line}: cannot parse {field} from {value:?}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: expected {expected} class probabilities, found {found}")]
    ProbabilityCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: probability {value} outside [0, 1]")]
    InvalidProbability { line: usize, value: f64 },

    #[error("Line {line}: class index {index} outside 0..{num_classes}")]
    ClassOutOfRange {
        line: usize,
        index: usize,
        num_classes: usize,
    },

    #[error("Reported accuracy {reported} differs from computed accuracy {computed}")]
    AccuracyMismatch { reported: f64, computed: f64 },

    #[error("Unknown split {0:?}, expected train or test")]
    UnknownSplit(String),

    #[error("Unknown time unit {0:?}")]
    UnknownTimeUnit(String),

    #[error("Unsupported file type {0:?}, only PREDICTIONS files can be collated")]
    UnsupportedFileType(String),

    #[error("I/O failure while reading: {0}")]
    Io(String),
}

/// A fold that could not contribute to the result matrix.
///
/// Both variants are recoverable: the fold slot stays empty and the
/// cell's coverage drops by one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FoldError {
    #[error("Fold file missing or empty: {path}")]
    Missing { path: PathBuf },

    #[error("Fold file corrupt: {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl FoldError {
    pub fn path(&self) -> &PathBuf {
        match self {
            FoldError::Missing { path } | FoldError::Corrupt { path, .. } => path,
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, FoldError::Corrupt { .. })
    }
}

/// Setup problems the user has to fix before a run can proceed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Classifier {classifier} has no results directory: {path}")]
    MissingClassifierDirectory { classifier: String, path: PathBuf },

    #[error("Cannot read dataset list from {path}: {reason}")]
    DatasetList { path: PathBuf, reason: String },

    #[error("Cannot read config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
