use std::fs;
use std::path::Path;

use foldstat_core::{CollateConfig, Split, Statistic};
use foldstat_io::{load_json, read_table, save_json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::Aggregator;
use crate::error::CollateResult;
use crate::matrix::{FailureKind, FoldFailure, ResultMatrix};
use crate::pairwise::{PairwiseEngine, StatisticComparison, StatisticGrid};
use crate::report;
use crate::summarizer::{summarize_all, summarize_groups, GroupSummary, StatisticSummary};

/// Everything one collation run produced, as written to `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollationReport {
    pub classifiers: Vec<String>,
    pub datasets: Vec<String>,
    pub folds: usize,
    pub alpha: f64,
    pub adjusted_alpha: f64,
    /// Valid test folds, `[dataset][classifier]`.
    pub counts: Vec<Vec<usize>>,
    /// Test folds only; train-file failures are counted in `train_failures`.
    pub missing_folds: usize,
    pub corrupt_folds: usize,
    #[serde(default)]
    pub train_failures: usize,
    pub failures: Vec<FoldFailure>,
    pub summaries: Vec<StatisticSummary>,
    #[serde(default)]
    pub groups: Vec<GroupSummary>,
    pub comparisons: Vec<StatisticComparison>,
}

impl CollationReport {
    /// Read back a `summary.json` written by an earlier run.
    pub fn load(path: &Path) -> CollateResult<Self> {
        Ok(load_json(path)?)
    }

    pub fn summary(&self, statistic: Statistic) -> Option<&StatisticSummary> {
        self.summaries.iter().find(|s| s.statistic == statistic)
    }

    pub fn comparison(&self, statistic: Statistic) -> Option<&StatisticComparison> {
        let label = statistic.to_string();
        self.comparisons.iter().find(|c| c.statistic == label)
    }
}

/// Runs aggregate, summarise, compare and write for one configuration.
pub struct Collator {
    config: CollateConfig,
}

impl Collator {
    pub fn new(config: CollateConfig) -> CollateResult<Self> {
        config.validate()?;
        Ok(Collator { config })
    }

    pub fn config(&self) -> &CollateConfig {
        &self.config
    }

    /// Load every fold file into a matrix.
    pub fn aggregate(&self) -> CollateResult<ResultMatrix> {
        let datasets = self.config.resolve_datasets()?;
        Aggregator::new(&self.config).aggregate(&datasets)
    }

    /// Derive summaries and comparisons from a loaded matrix without touching disk.
    pub fn analyse(&self, matrix: &ResultMatrix) -> CollateResult<CollationReport> {
        info!(statistics = self.config.statistics.len(), "summarising");
        let summaries = summarize_all(matrix, &self.config.statistics);
        let groups = summarize_groups(&summaries, matrix.datasets(), &self.config.dataset_groups);

        info!(statistics = self.config.pairwise_statistics.len(), "running pairwise tests");
        let engine = PairwiseEngine::from_config(&self.config);
        let comparisons = self
            .config
            .pairwise_statistics
            .iter()
            .map(|&s| engine.compare_all(&StatisticGrid::from_matrix(matrix, s)))
            .collect::<CollateResult<Vec<_>>>()?;

        Ok(CollationReport {
            classifiers: matrix.classifiers().to_vec(),
            datasets: matrix.datasets().to_vec(),
            folds: matrix.num_folds(),
            alpha: self.config.alpha,
            adjusted_alpha: self.config.adjusted_alpha(),
            counts: matrix.counts(),
            missing_folds: matrix.failure_count(FailureKind::Missing, Split::Test),
            corrupt_folds: matrix.failure_count(FailureKind::Corrupt, Split::Test),
            train_failures: matrix
                .failures()
                .iter()
                .filter(|f| f.split == Split::Train)
                .count(),
            failures: matrix.failures().to_vec(),
            summaries,
            groups,
            comparisons,
        })
    }

    /// Write every report file into the output directory.
    pub fn write(&self, matrix: &ResultMatrix, report: &CollationReport) -> CollateResult<()> {
        let out = &self.config.output_path;
        fs::create_dir_all(out)?;
        report::write_counts(out, matrix)?;
        report::write_failures(out, matrix)?;
        for summary in &report.summaries {
            report::write_summary(out, matrix, summary)?;
        }
        report::write_groups(out, &report.classifiers, &report.groups)?;
        report::write_tests(out, &report.classifiers, &report.comparisons)?;
        save_json(report, &out.join("summary.json"))?;
        info!(output = %out.display(), "reports written");
        Ok(())
    }

    pub fn run(&self) -> CollateResult<CollationReport> {
        let matrix = self.aggregate()?;
        let report = self.analyse(&matrix)?;
        self.write(&matrix, &report)?;
        Ok(report)
    }
}

/// Pairwise tests on a dataset × classifier score table, one value per cell.
pub fn compare_table(
    path: &Path,
    alpha: f64,
    min_coverage: f64,
    higher_is_better: bool,
) -> CollateResult<StatisticComparison> {
    let table = read_table(path)?;
    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "score".to_string());
    let grid = StatisticGrid::from_table(&table, label, higher_is_better);
    PairwiseEngine::new(alpha, min_coverage).compare_all(&grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foldstat_core::DatasetSource;

    #[test]
    fn test_invalid_config_rejected() {
        let config = CollateConfig::new("r", "o", vec![], DatasetSource::List(vec!["d".into()]), 5);
        assert!(Collator::new(config).is_err());
    }

    #[test]
    fn test_compare_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accuracy.csv");
        fs::write(&path, "dataset,A,B\nd1,0.8,0.7\nd2,0.75,0.85\n").unwrap();
        let cmp = compare_table(&path, 0.05, 0.5, true).unwrap();
        assert_eq!(cmp.statistic, "accuracy");
        let pair = cmp.pair("A", "B").unwrap();
        assert_eq!((pair.wins, pair.draws, pair.losses), (1, 0, 1));
        assert_eq!(pair.paired_datasets, 2);
        assert!(pair.reliable);
        assert!(cmp.no_difference[0][1]);
    }
}
