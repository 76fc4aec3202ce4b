use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::record::Split;
use crate::statistic::Statistic;

/// Where the list of datasets under comparison comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    /// Explicit names, used in the given order.
    List(Vec<String>),
    /// A text or CSV file with one dataset name per line (first column).
    File(PathBuf),
    /// Every subdirectory of this directory is a dataset.
    Directory(PathBuf),
}

/// Settings for one collation run.
///
/// Passed by reference into every stage; nothing reads ambient state.
///
/// # Example
/// ```
/// use foldstat_core::{CollateConfig, DatasetSource};
///
/// let config = CollateConfig::new(
///     "results",
///     "out",
///     vec!["RotF".into(), "RandF".into()],
///     DatasetSource::List(vec!["iris".into()]),
///     30,
/// );
/// assert_eq!(config.alpha, 0.05);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateConfig {
    pub results_path: PathBuf,
    pub output_path: PathBuf,
    pub classifiers: Vec<String>,
    pub datasets: DatasetSource,
    /// Expected number of resamples per (classifier, dataset).
    pub folds: usize,

    /// Significance level before the multiple comparison adjustment.
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Also read `trainFold<k>.csv` for train estimates.
    #[serde(default)]
    pub include_train: bool,

    #[serde(default = "default_statistics")]
    pub statistics: Vec<Statistic>,

    #[serde(default = "default_pairwise_statistics")]
    pub pairwise_statistics: Vec<Statistic>,

    /// Below this fraction of fully covered datasets a comparison is flagged unreliable.
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,

    /// Worker threads for fold parsing; `None` uses the rayon default.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Named subsets of the datasets, summarised and ranked on their own.
    #[serde(default)]
    pub dataset_groups: BTreeMap<String, Vec<String>>,
}

fn default_alpha() -> f64 {
    0.05
}

fn default_statistics() -> Vec<Statistic> {
    Statistic::ALL.to_vec()
}

fn default_pairwise_statistics() -> Vec<Statistic> {
    Statistic::PAIRWISE_DEFAULT.to_vec()
}

fn default_min_coverage() -> f64 {
    0.5
}

impl CollateConfig {
    pub fn new(
        results_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        classifiers: Vec<String>,
        datasets: DatasetSource,
        folds: usize,
    ) -> Self {
        CollateConfig {
            results_path: results_path.into(),
            output_path: output_path.into(),
            classifiers,
            datasets,
            folds,
            alpha: default_alpha(),
            include_train: false,
            statistics: default_statistics(),
            pairwise_statistics: default_pairwise_statistics(),
            min_coverage: default_min_coverage(),
            threads: None,
            dataset_groups: BTreeMap::new(),
        }
    }

    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.classifiers.is_empty() {
            return Err(ConfigError::Invalid("no classifiers given".into()));
        }
        if let Some(dup) = self
            .classifiers
            .iter()
            .enumerate()
            .find(|(i, c)| self.classifiers[..*i].contains(*c))
            .map(|(_, c)| c)
        {
            return Err(ConfigError::Invalid(format!("classifier {dup} listed twice")));
        }
        if self.folds == 0 {
            return Err(ConfigError::Invalid("folds must be at least 1".into()));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(ConfigError::Invalid(format!(
                "min_coverage must be in [0, 1], got {}",
                self.min_coverage
            )));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        for (group, members) in &self.dataset_groups {
            if group.trim().is_empty() || group.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!("invalid dataset group name {group:?}")));
            }
            if members.is_empty() {
                return Err(ConfigError::Invalid(format!("dataset group {group} is empty")));
            }
        }
        Ok(())
    }

    /// Significance threshold after the control-classifier adjustment:
    /// alpha / (numClassifiers - 1) once more than two classifiers are compared.
    pub fn adjusted_alpha(&self) -> f64 {
        adjusted_alpha(self.alpha, self.classifiers.len())
    }

    /// Resolve the dataset names, reading the list file or directory if needed.
    pub fn resolve_datasets(&self) -> ConfigResult<Vec<String>> {
        let datasets = match &self.datasets {
            DatasetSource::List(names) => names.clone(),
            DatasetSource::File(path) => read_dataset_file(path)?,
            DatasetSource::Directory(path) => read_dataset_dir(path)?,
        };
        if datasets.is_empty() {
            return Err(ConfigError::Invalid("no datasets to compare".into()));
        }
        Ok(datasets)
    }

    pub fn classifier_dir(&self, classifier: &str) -> PathBuf {
        self.results_path.join(classifier)
    }

    /// `<results>/<classifier>/Predictions/<dataset>/{test,train}Fold<k>.csv`
    pub fn fold_path(&self, classifier: &str, dataset: &str, split: Split, fold: usize) -> PathBuf {
        self.classifier_dir(classifier)
            .join("Predictions")
            .join(dataset)
            .join(format!("{split}Fold{fold}.csv"))
    }
}

/// alpha / (n - 1) for more than two classifiers, alpha otherwise.
pub fn adjusted_alpha(alpha: f64, num_classifiers: usize) -> f64 {
    if num_classifiers > 2 {
        alpha / (num_classifiers - 1) as f64
    } else {
        alpha
    }
}

fn read_dataset_file(path: &Path) -> ConfigResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::DatasetList {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut seen = HashSet::new();
    let names: Vec<String> = text
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();
    Ok(names)
}

fn read_dataset_dir(path: &Path) -> ConfigResult<Vec<String>> {
    let err = |e: std::io::Error| ConfigError::DatasetList {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(err)? {
        let entry = entry.map_err(err)?;
        if entry.file_type().map_err(err)?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
