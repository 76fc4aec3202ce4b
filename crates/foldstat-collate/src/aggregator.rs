use foldstat_core::{CollateConfig, ConfigError, FoldResult, Split};
use foldstat_io::read_results_file;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{CollateError, CollateResult};
use crate::matrix::{FailureKind, FoldFailure, ResultMatrix};

/// Loads every expected fold file into a [`ResultMatrix`].
pub struct Aggregator<'a> {
    config: &'a CollateConfig,
}

struct Loaded {
    result: Option<FoldResult>,
    failures: Vec<FoldFailure>,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a CollateConfig) -> Self {
        Aggregator { config }
    }

    /// A classifier without a results directory stops the run.
    pub fn check_classifier_dirs(&self) -> Result<(), ConfigError> {
        for classifier in &self.config.classifiers {
            let path = self.config.classifier_dir(classifier);
            if !path.is_dir() {
                return Err(ConfigError::MissingClassifierDirectory {
                    classifier: classifier.clone(),
                    path,
                });
            }
        }
        Ok(())
    }

    /// Parse folds `0..K` of every (classifier, dataset) pair.
    ///
    /// Files are parsed on a rayon pool; every slot is produced by exactly
    /// one task and results are placed in slot order once all have finished.
    pub fn aggregate(&self, datasets: &[String]) -> CollateResult<ResultMatrix> {
        self.check_classifier_dirs()?;

        let classifiers = &self.config.classifiers;
        let folds = self.config.folds;
        let jobs: Vec<(usize, usize, usize)> = (0..classifiers.len())
            .flat_map(|c| (0..datasets.len()).flat_map(move |d| (0..folds).map(move |k| (c, d, k))))
            .collect();

        info!(
            classifiers = classifiers.len(),
            datasets = datasets.len(),
            folds,
            files = jobs.len(),
            "loading fold files"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads.unwrap_or(0))
            .build()
            .map_err(|e| CollateError::ThreadPool(e.to_string()))?;

        let loaded: Vec<Loaded> = pool.install(|| {
            jobs.par_iter()
                .map(|&(c, d, k)| self.load_fold(&classifiers[c], &datasets[d], k))
                .collect()
        });

        let mut cells = Vec::with_capacity(loaded.len());
        let mut failures = Vec::new();
        for slot in loaded {
            cells.push(slot.result);
            failures.extend(slot.failures);
        }

        let matrix = ResultMatrix::from_slots(classifiers.clone(), datasets.to_vec(), folds, cells, failures);
        let missing = matrix.failure_count(FailureKind::Missing, Split::Test);
        let corrupt = matrix.failure_count(FailureKind::Corrupt, Split::Test);
        info!(loaded = matrix.loaded(), missing, corrupt, "fold files loaded");
        Ok(matrix)
    }

    fn load_fold(&self, classifier: &str, dataset: &str, fold: usize) -> Loaded {
        let path = self.config.fold_path(classifier, dataset, Split::Test, fold);
        let mut failures = Vec::new();

        let mut result = match read_results_file(&path) {
            Ok(result) => result,
            Err(e) => {
                if e.is_corrupt() {
                    warn!(classifier, dataset, fold, error = %e, "corrupt fold");
                } else {
                    debug!(classifier, dataset, fold, path = %path.display(), "missing fold");
                }
                failures.push(FoldFailure::new(classifier, dataset, Split::Test, fold, &e));
                return Loaded {
                    result: None,
                    failures,
                };
            }
        };

        if self.config.include_train {
            let train_path = self.config.fold_path(classifier, dataset, Split::Train, fold);
            match read_results_file(&train_path) {
                Ok(train) => result = result.with_train_accuracy(train.accuracy()),
                Err(e) => {
                    warn!(classifier, dataset, fold, error = %e, "train fold unusable, keeping test fold");
                    failures.push(FoldFailure::new(classifier, dataset, Split::Train, fold, &e));
                }
            }
        }

        Loaded {
            result: Some(result),
            failures,
        }
    }
}
