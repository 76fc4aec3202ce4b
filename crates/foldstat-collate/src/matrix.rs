use std::path::PathBuf;

use foldstat_core::{FoldError, FoldResult, Split, Statistic};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Missing,
    Corrupt,
}

/// A fold slot left empty, with where and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldFailure {
    pub classifier: String,
    pub dataset: String,
    pub split: Split,
    pub fold: usize,
    pub kind: FailureKind,
    pub path: PathBuf,
    pub reason: String,
}

impl FoldFailure {
    pub fn new(classifier: &str, dataset: &str, split: Split, fold: usize, error: &FoldError) -> Self {
        let (kind, reason) = match error {
            FoldError::Missing { .. } => (FailureKind::Missing, "missing or empty".to_string()),
            FoldError::Corrupt { source, .. } => (FailureKind::Corrupt, source.to_string()),
        };
        FoldFailure {
            classifier: classifier.to_string(),
            dataset: dataset.to_string(),
            split,
            fold,
            kind,
            path: error.path().clone(),
            reason,
        }
    }
}

/// Fold results of every (classifier, dataset) pair, with gaps.
///
/// Slot `k` of every cell is the same resample for all classifiers. The
/// matrix is filled once by the aggregator and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    classifiers: Vec<String>,
    datasets: Vec<String>,
    folds: usize,
    // [classifier][dataset][fold], flattened
    cells: Vec<Option<FoldResult>>,
    failures: Vec<FoldFailure>,
}

impl ResultMatrix {
    /// An empty matrix with every slot pre-allocated.
    pub fn new(classifiers: Vec<String>, datasets: Vec<String>, folds: usize) -> Self {
        let n = classifiers.len() * datasets.len() * folds;
        ResultMatrix {
            classifiers,
            datasets,
            folds,
            cells: vec![None; n],
            failures: Vec::new(),
        }
    }

    /// Build from slots laid out in `[classifier][dataset][fold]` order.
    pub fn from_slots(
        classifiers: Vec<String>,
        datasets: Vec<String>,
        folds: usize,
        cells: Vec<Option<FoldResult>>,
        failures: Vec<FoldFailure>,
    ) -> Self {
        debug_assert_eq!(cells.len(), classifiers.len() * datasets.len() * folds);
        ResultMatrix {
            classifiers,
            datasets,
            folds,
            cells,
            failures,
        }
    }

    fn index(&self, classifier: usize, dataset: usize, fold: usize) -> usize {
        (classifier * self.datasets.len() + dataset) * self.folds + fold
    }

    pub fn set(&mut self, classifier: usize, dataset: usize, fold: usize, result: FoldResult) {
        let i = self.index(classifier, dataset, fold);
        self.cells[i] = Some(result);
    }

    pub fn get(&self, classifier: usize, dataset: usize, fold: usize) -> Option<&FoldResult> {
        self.cells.get(self.index(classifier, dataset, fold))?.as_ref()
    }

    pub fn classifiers(&self) -> &[String] {
        &self.classifiers
    }

    pub fn datasets(&self) -> &[String] {
        &self.datasets
    }

    pub fn num_folds(&self) -> usize {
        self.folds
    }

    pub fn classifier_index(&self, name: &str) -> Option<usize> {
        self.classifiers.iter().position(|c| c == name)
    }

    pub fn dataset_index(&self, name: &str) -> Option<usize> {
        self.datasets.iter().position(|d| d == name)
    }

    /// Loaded folds of one cell with their fold indices.
    pub fn folds_of(&self, classifier: usize, dataset: usize) -> impl Iterator<Item = (usize, &FoldResult)> {
        (0..self.folds).filter_map(move |k| self.get(classifier, dataset, k).map(|f| (k, f)))
    }

    /// Number of valid folds in one cell.
    pub fn count(&self, classifier: usize, dataset: usize) -> usize {
        self.folds_of(classifier, dataset).count()
    }

    /// Per-fold values of `stat` in one cell; `None` where the fold is absent,
    /// did not record the statistic or holds a non-finite value.
    pub fn fold_values(&self, classifier: usize, dataset: usize, stat: Statistic) -> Vec<Option<f64>> {
        (0..self.folds)
            .map(|k| {
                self.get(classifier, dataset, k)
                    .and_then(|f| stat.value(f))
                    .filter(|v| v.is_finite())
            })
            .collect()
    }

    /// Valid fold counts, `[dataset][classifier]`.
    pub fn counts(&self) -> Vec<Vec<usize>> {
        (0..self.datasets.len())
            .map(|d| (0..self.classifiers.len()).map(|c| self.count(c, d)).collect())
            .collect()
    }

    pub fn failures(&self) -> &[FoldFailure] {
        &self.failures
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FoldFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    pub fn failure_count(&self, kind: FailureKind, split: Split) -> usize {
        self.failures_of(kind).filter(|f| f.split == split).count()
    }

    /// Number of test folds actually loaded.
    pub fn loaded(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}
