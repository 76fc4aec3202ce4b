use foldstat_core::{adjusted_alpha, CollateConfig, Statistic};
use foldstat_io::Table;
use foldstat_metrics::{mean, population_std_dev};
use foldstat_stats::{paired_tests, win_loss_p_value, PairedTests};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clique::{cliques_in_order, Clique};
use crate::error::CollateResult;
use crate::matrix::ResultMatrix;
use crate::summarizer::{average_ranks, rank_order};

/// Per-fold values of one statistic, `[classifier][dataset][fold]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticGrid {
    pub label: String,
    pub higher_is_better: bool,
    pub classifiers: Vec<String>,
    pub datasets: Vec<String>,
    pub folds: usize,
    values: Vec<Vec<Vec<Option<f64>>>>,
}

impl StatisticGrid {
    pub fn from_matrix(matrix: &ResultMatrix, statistic: Statistic) -> Self {
        let values = (0..matrix.classifiers().len())
            .map(|c| {
                (0..matrix.datasets().len())
                    .map(|d| matrix.fold_values(c, d, statistic))
                    .collect()
            })
            .collect();
        StatisticGrid {
            label: statistic.to_string(),
            higher_is_better: statistic.higher_is_better(),
            classifiers: matrix.classifiers().to_vec(),
            datasets: matrix.datasets().to_vec(),
            folds: matrix.num_folds(),
            values,
        }
    }

    /// One value per dataset per classifier, as in a score table.
    pub fn from_table(table: &Table, label: impl Into<String>, higher_is_better: bool) -> Self {
        let values = (0..table.n_cols())
            .map(|c| table.column(c).into_iter().map(|v| vec![v]).collect())
            .collect();
        StatisticGrid {
            label: label.into(),
            higher_is_better,
            classifiers: table.columns.clone(),
            datasets: table.rows.iter().map(|r| r.label.clone()).collect(),
            folds: 1,
            values,
        }
    }

    pub fn fold_values(&self, classifier: usize, dataset: usize) -> &[Option<f64>] {
        &self.values[classifier][dataset]
    }

    fn dataset_mean(&self, classifier: usize, dataset: usize) -> Option<f64> {
        let present: Vec<f64> = self.values[classifier][dataset].iter().flatten().copied().collect();
        mean(&present)
    }

    fn count(&self, classifier: usize, dataset: usize) -> usize {
        self.values[classifier][dataset].iter().flatten().count()
    }
}

/// Fold-level comparison of one pair on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetTest {
    pub dataset: String,
    pub folds: usize,
    pub mean_diff: f64,
    pub tests: PairedTests,
}

/// Everything known about classifier `first` against `second` on one statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    pub statistic: String,
    pub first: String,
    pub second: String,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub win_loss_p_value: f64,
    /// Datasets where both have at least one value.
    pub datasets_compared: usize,
    /// Mean of `first − second` over the compared datasets.
    pub mean_diff: Option<f64>,
    pub std_dev_diff: Option<f64>,
    /// Datasets with the same fold indices loaded for both.
    pub paired_datasets: usize,
    /// Datasets where either side misses some of the expected folds.
    pub partial_datasets: usize,
    pub reliable: bool,
    /// Tests on the per-dataset mean differences of the paired datasets.
    pub tests: PairedTests,
    pub significant: bool,
    pub sig_wins: usize,
    pub sig_draws: usize,
    pub sig_losses: usize,
    pub dataset_tests: Vec<DatasetTest>,
}

/// All pairs of one statistic, with the derived matrices and cliques.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticComparison {
    pub statistic: String,
    pub higher_is_better: bool,
    pub classifiers: Vec<String>,
    pub datasets: usize,
    pub alpha: f64,
    pub adjusted_alpha: f64,
    pub pairs: Vec<PairwiseComparison>,
    pub average_ranks: Vec<Option<f64>>,
    /// Classifier indices, best average rank first.
    pub rank_order: Vec<usize>,
    /// Signed-rank p-values, `None` on the diagonal and for insufficient data.
    pub sign_rank_p: Vec<Vec<Option<f64>>>,
    pub no_difference: Vec<Vec<bool>>,
    pub cliques: Vec<Clique>,
}

impl StatisticComparison {
    pub fn pair(&self, first: &str, second: &str) -> Option<&PairwiseComparison> {
        self.pairs.iter().find(|p| p.first == first && p.second == second)
    }

    pub fn unreliable(&self) -> impl Iterator<Item = &PairwiseComparison> {
        self.pairs.iter().filter(|p| !p.reliable)
    }
}

/// Pairwise win/draw/loss counts and paired significance tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseEngine {
    alpha: f64,
    min_coverage: f64,
}

impl PairwiseEngine {
    pub fn new(alpha: f64, min_coverage: f64) -> Self {
        PairwiseEngine { alpha, min_coverage }
    }

    pub fn from_config(config: &CollateConfig) -> Self {
        Self::new(config.alpha, config.min_coverage)
    }

    /// Compare every unordered pair in configured order and build the cliques.
    pub fn compare_all(&self, grid: &StatisticGrid) -> CollateResult<StatisticComparison> {
        let n = grid.classifiers.len();
        let adjusted = adjusted_alpha(self.alpha, n);

        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        let mut sign_rank_p = vec![vec![None; n]; n];
        let mut no_difference = vec![vec![true; n]; n];
        for x in 0..n {
            for y in (x + 1)..n {
                let cmp = self.compare_pair(grid, x, y, adjusted)?;
                let p = cmp.tests.p_values().map(|p| p.sign_rank_test);
                sign_rank_p[x][y] = p;
                sign_rank_p[y][x] = p;
                no_difference[x][y] = !cmp.significant;
                no_difference[y][x] = !cmp.significant;
                pairs.push(cmp);
            }
        }

        let means: Vec<Vec<Option<f64>>> = (0..grid.datasets.len())
            .map(|d| (0..n).map(|c| grid.dataset_mean(c, d)).collect())
            .collect();
        let (average_ranks, _) = average_ranks(&means, grid.higher_is_better);
        let order = rank_order(&average_ranks);
        let cliques = cliques_in_order(&no_difference, &order, &grid.classifiers);

        debug!(statistic = %grid.label, pairs = pairs.len(), cliques = cliques.len(), "pairwise comparison done");
        Ok(StatisticComparison {
            statistic: grid.label.clone(),
            higher_is_better: grid.higher_is_better,
            classifiers: grid.classifiers.clone(),
            datasets: grid.datasets.len(),
            alpha: self.alpha,
            adjusted_alpha: adjusted,
            pairs,
            average_ranks,
            rank_order: order,
            sign_rank_p,
            no_difference,
            cliques,
        })
    }

    /// Compare classifier `x` against `y`; significance is judged at `adjusted_alpha`.
    pub fn compare_pair(
        &self,
        grid: &StatisticGrid,
        x: usize,
        y: usize,
        adjusted_alpha: f64,
    ) -> CollateResult<PairwiseComparison> {
        let (mut wins, mut draws, mut losses) = (0, 0, 0);
        let mut diffs = Vec::new();
        let mut partial = 0;
        let mut paired_means = Vec::new();
        let mut dataset_tests = Vec::new();
        let (mut sig_wins, mut sig_draws, mut sig_losses) = (0, 0, 0);

        for d in 0..grid.datasets.len() {
            if grid.count(x, d) < grid.folds || grid.count(y, d) < grid.folds {
                partial += 1;
            }
            let (Some(mx), Some(my)) = (grid.dataset_mean(x, d), grid.dataset_mean(y, d)) else {
                continue;
            };
            if !mx.is_finite() || !my.is_finite() {
                warn!(
                    statistic = %grid.label,
                    dataset = %grid.datasets[d],
                    first = %grid.classifiers[x],
                    second = %grid.classifiers[y],
                    "non-finite values, dataset left out of the comparison"
                );
                continue;
            }

            // exact equality is a draw
            if mx == my {
                draws += 1;
            } else if (mx > my) == grid.higher_is_better {
                wins += 1;
            } else {
                losses += 1;
            }
            diffs.push(mx - my);

            let Some(fold_diffs) = paired_fold_diffs(grid.fold_values(x, d), grid.fold_values(y, d)) else {
                continue;
            };
            if fold_diffs.iter().any(|v| !v.is_finite()) {
                warn!(
                    statistic = %grid.label,
                    dataset = %grid.datasets[d],
                    "non-finite fold difference, dataset left unpaired"
                );
                continue;
            }
            let mean_diff = mean(&fold_diffs).unwrap_or(0.0);
            paired_means.push(mean_diff);

            let tests = run_tests(&fold_diffs, &grid.label);
            if let Some(p) = tests.p_values() {
                if p.t_test < self.alpha && mean_diff != 0.0 {
                    if (mean_diff > 0.0) == grid.higher_is_better {
                        sig_wins += 1;
                    } else {
                        sig_losses += 1;
                    }
                } else {
                    sig_draws += 1;
                }
            }
            dataset_tests.push(DatasetTest {
                dataset: grid.datasets[d].clone(),
                folds: fold_diffs.len(),
                mean_diff,
                tests,
            });
        }

        let tests = run_tests(&paired_means, &grid.label);
        let significant = tests.is_significant(adjusted_alpha);
        let total = grid.datasets.len();
        let full = total - partial;
        let reliable = total > 0 && full as f64 / total as f64 >= self.min_coverage;
        if !reliable {
            warn!(
                statistic = %grid.label,
                first = %grid.classifiers[x],
                second = %grid.classifiers[y],
                full,
                total,
                "comparison rests on too few fully covered datasets"
            );
        }

        Ok(PairwiseComparison {
            statistic: grid.label.clone(),
            first: grid.classifiers[x].clone(),
            second: grid.classifiers[y].clone(),
            wins,
            draws,
            losses,
            win_loss_p_value: win_loss_p_value(wins, losses)?,
            datasets_compared: diffs.len(),
            mean_diff: mean(&diffs),
            std_dev_diff: population_std_dev(&diffs),
            paired_datasets: paired_means.len(),
            partial_datasets: partial,
            reliable,
            tests,
            significant,
            sig_wins,
            sig_draws,
            sig_losses,
            dataset_tests,
        })
    }
}

/// Paired tests that report a failure as missing data instead of aborting the run.
fn run_tests(diffs: &[f64], label: &str) -> PairedTests {
    paired_tests(diffs).unwrap_or_else(|e| {
        warn!(statistic = %label, error = %e, "paired tests failed, treating as insufficient data");
        PairedTests::InsufficientData { samples: diffs.len() }
    })
}

/// Fold-wise differences `x − y`, only when both sides hold values at exactly
/// the same fold indices.
fn paired_fold_diffs(x: &[Option<f64>], y: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut diffs = Vec::new();
    for (a, b) in x.iter().zip(y) {
        match (a, b) {
            (Some(a), Some(b)) => diffs.push(a - b),
            (None, None) => {}
            _ => return None,
        }
    }
    if diffs.is_empty() {
        None
    } else {
        Some(diffs)
    }
}
