pub mod record;
pub mod statistic;
pub mod config;
pub mod error;

pub use record::{FoldHeader, FoldMetrics, FoldResult, PredictionRecord, Split, TimeUnit};
pub use statistic::Statistic;
pub use config::{adjusted_alpha, CollateConfig, DatasetSource};
pub use error::{ConfigError, FoldError, ParseError};
