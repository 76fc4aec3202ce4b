use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::FoldResult;

/// A per-fold quantity that can be summarised and compared across classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Accuracy,
    BalancedAccuracy,
    NegLogLikelihood,
    Auroc,
    F1,
    Mcc,
    TrainCvAccuracy,
    BuildTime,
    TestTime,
    PredictionTime,
    EstimateTime,
    Memory,
}

impl Statistic {
    pub const ALL: [Statistic; 12] = [
        Statistic::Accuracy,
        Statistic::BalancedAccuracy,
        Statistic::NegLogLikelihood,
        Statistic::Auroc,
        Statistic::F1,
        Statistic::Mcc,
        Statistic::TrainCvAccuracy,
        Statistic::BuildTime,
        Statistic::TestTime,
        Statistic::PredictionTime,
        Statistic::EstimateTime,
        Statistic::Memory,
    ];

    /// Statistics compared pairwise unless configured otherwise.
    pub const PAIRWISE_DEFAULT: [Statistic; 5] = [
        Statistic::Accuracy,
        Statistic::BalancedAccuracy,
        Statistic::NegLogLikelihood,
        Statistic::Auroc,
        Statistic::F1,
    ];

    /// Read this statistic off a fold, if the fold recorded it.
    pub fn value(self, fold: &FoldResult) -> Option<f64> {
        match self {
            Statistic::Accuracy => Some(fold.accuracy()),
            Statistic::BalancedAccuracy => Some(fold.balanced_accuracy()),
            Statistic::NegLogLikelihood => Some(fold.neg_log_likelihood()),
            Statistic::Auroc => Some(fold.mean_auroc()),
            Statistic::F1 => Some(fold.f1()),
            Statistic::Mcc => Some(fold.mcc()),
            Statistic::TrainCvAccuracy => fold.train_cv_accuracy(),
            Statistic::BuildTime => fold.build_time_millis().map(|t| t as f64),
            Statistic::TestTime => fold.header().test_time_millis.map(|t| t as f64),
            Statistic::PredictionTime => fold.metrics().median_prediction_time.map(|t| t as f64),
            Statistic::EstimateTime => fold.header().error_estimate_time_millis.map(|t| t as f64),
            Statistic::Memory => fold.header().memory_usage.map(|m| m as f64),
        }
    }

    pub fn higher_is_better(self) -> bool {
        !matches!(
            self,
            Statistic::NegLogLikelihood
                | Statistic::BuildTime
                | Statistic::TestTime
                | Statistic::PredictionTime
                | Statistic::EstimateTime
                | Statistic::Memory
        )
    }

    /// Stem used in output file names, e.g. `TestAcc.csv`.
    pub fn file_stem(self) -> &'static str {
        match self {
            Statistic::Accuracy => "TestAcc",
            Statistic::BalancedAccuracy => "TestBAcc",
            Statistic::NegLogLikelihood => "TestNLL",
            Statistic::Auroc => "TestAUROC",
            Statistic::F1 => "TestF1",
            Statistic::Mcc => "TestMCC",
            Statistic::TrainCvAccuracy => "TrainCVAcc",
            Statistic::BuildTime => "BuildTime",
            Statistic::TestTime => "TotalTestTime",
            Statistic::PredictionTime => "MedianPredTime",
            Statistic::EstimateTime => "EstimateTime",
            Statistic::Memory => "MaxMemory",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for Statistic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match key.as_str() {
            "acc" | "accuracy" | "testacc" => Ok(Statistic::Accuracy),
            "bacc" | "balancedaccuracy" | "testbacc" => Ok(Statistic::BalancedAccuracy),
            "nll" | "negloglikelihood" | "testnll" => Ok(Statistic::NegLogLikelihood),
            "auroc" | "auc" | "testauroc" => Ok(Statistic::Auroc),
            "f1" | "testf1" => Ok(Statistic::F1),
            "mcc" | "testmcc" => Ok(Statistic::Mcc),
            "traincvacc" | "traincvaccuracy" | "trainacc" => Ok(Statistic::TrainCvAccuracy),
            "buildtime" | "timings" => Ok(Statistic::BuildTime),
            "testtime" | "totaltesttime" => Ok(Statistic::TestTime),
            "predtime" | "predictiontime" | "medianpredtime" => Ok(Statistic::PredictionTime),
            "estimatetime" | "errorestimatetime" => Ok(Statistic::EstimateTime),
            "memory" | "maxmemory" => Ok(Statistic::Memory),
            _ => Err(ConfigError::Invalid(format!("unknown statistic {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FoldHeader, FoldMetrics};

    #[test]
    fn test_statistic_from_str() {
        assert_eq!("TestAcc".parse::<Statistic>().unwrap(), Statistic::Accuracy);
        assert_eq!("balanced_accuracy".parse::<Statistic>().unwrap(), Statistic::BalancedAccuracy);
        assert_eq!("NLL".parse::<Statistic>().unwrap(), Statistic::NegLogLikelihood);
        assert!("kappa".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_direction() {
        assert!(Statistic::Accuracy.higher_is_better());
        assert!(!Statistic::NegLogLikelihood.higher_is_better());
        assert!(!Statistic::BuildTime.higher_is_better());
        assert!(!Statistic::TestTime.higher_is_better());
        assert!(!Statistic::Memory.higher_is_better());
    }

    #[test]
    fn test_optional_values() {
        let metrics = FoldMetrics {
            accuracy: 0.75,
            ..FoldMetrics::default()
        };
        let fold = FoldResult::new(FoldHeader::default(), metrics);
        assert_eq!(Statistic::Accuracy.value(&fold), Some(0.75));
        assert_eq!(Statistic::BuildTime.value(&fold), None);
        assert_eq!(Statistic::TrainCvAccuracy.value(&fold), None);
        assert_eq!(Statistic::PredictionTime.value(&fold), None);
    }

    #[test]
    fn test_timing_and_memory_values() {
        let header = FoldHeader {
            test_time_millis: Some(40),
            error_estimate_time_millis: Some(900),
            memory_usage: Some(2048),
            ..FoldHeader::default()
        };
        let metrics = FoldMetrics {
            median_prediction_time: Some(3),
            ..FoldMetrics::default()
        };
        let fold = FoldResult::new(header, metrics);
        assert_eq!(Statistic::TestTime.value(&fold), Some(40.0));
        assert_eq!(Statistic::PredictionTime.value(&fold), Some(3.0));
        assert_eq!(Statistic::EstimateTime.value(&fold), Some(900.0));
        assert_eq!(Statistic::Memory.value(&fold), Some(2048.0));
        assert_eq!("memory".parse::<Statistic>().unwrap(), Statistic::Memory);
        assert_eq!(Statistic::TestTime.file_stem(), "TotalTestTime");
    }
}
