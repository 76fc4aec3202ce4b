use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Which side of a resample a results file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl FromStr for Split {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(ParseError::UnknownSplit(other.to_string())),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Unit the timing fields of a results file were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Convert a raw timing in this unit to whole milliseconds.
    pub fn to_millis(self, value: u64) -> u64 {
        match self {
            TimeUnit::Nanoseconds => value / 1_000_000,
            TimeUnit::Microseconds => value / 1_000,
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1_000),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NANOSECONDS" => Ok(TimeUnit::Nanoseconds),
            "MICROSECONDS" => Ok(TimeUnit::Microseconds),
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            "SECONDS" => Ok(TimeUnit::Seconds),
            other => Err(ParseError::UnknownTimeUnit(other.to_string())),
        }
    }
}

/// Outcome of one test instance as written in a fold file.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub actual_class: usize,
    pub predicted_class: usize,
    pub probabilities: Vec<f64>,
    pub prediction_time: Option<u64>,
    pub description: Option<String>,
}

impl PredictionRecord {
    pub fn new(actual_class: usize, predicted_class: usize, probabilities: Vec<f64>) -> Self {
        PredictionRecord {
            actual_class,
            predicted_class,
            probabilities,
            prediction_time: None,
            description: None,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.actual_class == self.predicted_class
    }

    pub fn num_classes(&self) -> usize {
        self.probabilities.len()
    }

    /// Probability the classifier gave to the true class.
    pub fn true_class_probability(&self) -> f64 {
        self.probabilities.get(self.actual_class).copied().unwrap_or(0.0)
    }
}

/// Metadata from the three header lines of a fold file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoldHeader {
    pub dataset: String,
    pub classifier: String,
    pub split: Option<Split>,
    pub fold_id: Option<usize>,
    pub time_unit: TimeUnit,
    pub description: Option<String>,
    /// Raw second line, kept verbatim.
    pub parameter_info: String,
    pub parameters: BTreeMap<String, String>,
    pub train_cv_accuracy: Option<f64>,
    pub reported_accuracy: f64,
    pub build_time_millis: Option<u64>,
    pub test_time_millis: Option<u64>,
    pub benchmark_time_millis: Option<u64>,
    pub memory_usage: Option<u64>,
    pub declared_classes: Option<usize>,
    pub error_estimate_method: Option<String>,
    pub error_estimate_time_millis: Option<u64>,
    pub build_plus_estimate_time_millis: Option<u64>,
}

/// Metrics derived from every prediction of one fold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub num_instances: usize,
    pub num_classes: usize,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub neg_log_likelihood: f64,
    pub mean_auroc: f64,
    pub f1: f64,
    pub mcc: f64,
    pub median_prediction_time: Option<u64>,
}

/// One fold's evaluation of one classifier on one dataset.
///
/// Built once from the parsed predictions; the metrics are computed at
/// construction and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    header: FoldHeader,
    metrics: FoldMetrics,
}

impl FoldResult {
    pub fn new(header: FoldHeader, metrics: FoldMetrics) -> Self {
        FoldResult { header, metrics }
    }

    /// Replace the train estimate with one read from a separate train file.
    pub fn with_train_accuracy(mut self, accuracy: f64) -> Self {
        self.header.train_cv_accuracy = Some(accuracy);
        self
    }

    pub fn header(&self) -> &FoldHeader {
        &self.header
    }

    pub fn metrics(&self) -> &FoldMetrics {
        &self.metrics
    }

    pub fn dataset(&self) -> &str {
        &self.header.dataset
    }

    pub fn classifier(&self) -> &str {
        &self.header.classifier
    }

    pub fn accuracy(&self) -> f64 {
        self.metrics.accuracy
    }

    pub fn balanced_accuracy(&self) -> f64 {
        self.metrics.balanced_accuracy
    }

    pub fn neg_log_likelihood(&self) -> f64 {
        self.metrics.neg_log_likelihood
    }

    pub fn mean_auroc(&self) -> f64 {
        self.metrics.mean_auroc
    }

    pub fn f1(&self) -> f64 {
        self.metrics.f1
    }

    pub fn mcc(&self) -> f64 {
        self.metrics.mcc
    }

    pub fn build_time_millis(&self) -> Option<u64> {
        self.header.build_time_millis
    }

    pub fn train_cv_accuracy(&self) -> Option<f64> {
        self.header.train_cv_accuracy
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.header.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parsing() {
        assert_eq!("TEST".parse::<Split>().unwrap(), Split::Test);
        assert_eq!(" train ".parse::<Split>().unwrap(), Split::Train);
        assert!("validation".parse::<Split>().is_err());
    }

    #[test]
    fn test_time_unit_conversion() {
        assert_eq!(TimeUnit::Nanoseconds.to_millis(5_000_000), 5);
        assert_eq!(TimeUnit::Microseconds.to_millis(2_500), 2);
        assert_eq!(TimeUnit::Seconds.to_millis(3), 3_000);
        assert_eq!("milliseconds".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
    }

    #[test]
    fn test_true_class_probability() {
        let record = PredictionRecord::new(2, 1, vec![0.1, 0.6, 0.3]);
        assert!(!record.is_correct());
        assert!((record.true_class_probability() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_train_accuracy_override() {
        let result = FoldResult::new(FoldHeader::default(), FoldMetrics::default());
        assert_eq!(result.train_cv_accuracy(), None);
        let result = result.with_train_accuracy(0.9);
        assert_eq!(result.train_cv_accuracy(), Some(0.9));
    }
}
