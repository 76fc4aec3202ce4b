use std::collections::BTreeMap;

use foldstat_core::Statistic;
use foldstat_metrics::{mean, population_std_dev, ranks, Summary};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matrix::ResultMatrix;

/// One classifier's statistic over all datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSummary {
    pub classifier: String,
    /// Datasets with at least one fold value.
    pub datasets: usize,
    /// Mean of the per-dataset means.
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub average_rank: Option<f64>,
}

/// Per-dataset means and spreads of one statistic for every classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticSummary {
    pub statistic: Statistic,
    pub classifiers: Vec<String>,
    pub datasets: Vec<String>,
    /// `[dataset][classifier]`; `None` when no fold has a value.
    pub cells: Vec<Vec<Option<Summary>>>,
    pub overall: Vec<ClassifierSummary>,
    /// Datasets on which every classifier has a value and so take part in ranking.
    pub ranked_datasets: usize,
}

impl StatisticSummary {
    /// Dataset means, `[dataset][classifier]`.
    pub fn means(&self) -> Vec<Vec<Option<f64>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|s| s.map(|s| s.mean)).collect())
            .collect()
    }

    /// The same statistic over a subset of datasets, given by row index.
    /// Overall means and ranks are recomputed on the subset alone.
    pub fn restrict(&self, datasets: &[usize]) -> StatisticSummary {
        from_cells(
            self.statistic,
            self.classifiers.clone(),
            datasets.iter().map(|&d| self.datasets[d].clone()).collect(),
            datasets.iter().map(|&d| self.cells[d].clone()).collect(),
        )
    }
}

/// Summaries restricted to one named group of datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    /// Members of the group that are under comparison, in report order.
    pub datasets: Vec<String>,
    pub summaries: Vec<StatisticSummary>,
}

/// Summarise one statistic across the matrix.
pub fn summarize(matrix: &ResultMatrix, statistic: Statistic) -> StatisticSummary {
    let n_classifiers = matrix.classifiers().len();
    let cells: Vec<Vec<Option<Summary>>> = (0..matrix.datasets().len())
        .map(|d| {
            (0..n_classifiers)
                .map(|c| {
                    let values: Vec<f64> = matrix.fold_values(c, d, statistic).into_iter().flatten().collect();
                    Summary::of(&values)
                })
                .collect()
        })
        .collect();

    let summary = from_cells(statistic, matrix.classifiers().to_vec(), matrix.datasets().to_vec(), cells);
    debug!(%statistic, ranked_datasets = summary.ranked_datasets, "summarised statistic");
    summary
}

fn from_cells(
    statistic: Statistic,
    classifiers: Vec<String>,
    datasets: Vec<String>,
    cells: Vec<Vec<Option<Summary>>>,
) -> StatisticSummary {
    let means: Vec<Vec<Option<f64>>> = cells
        .iter()
        .map(|row| row.iter().map(|s| s.map(|s| s.mean)).collect())
        .collect();
    let (average_ranks, ranked_datasets) = average_ranks(&means, statistic.higher_is_better());

    let overall = classifiers
        .iter()
        .enumerate()
        .map(|(c, classifier)| {
            let dataset_means: Vec<f64> = means.iter().filter_map(|row| row[c]).collect();
            ClassifierSummary {
                classifier: classifier.clone(),
                datasets: dataset_means.len(),
                mean: mean(&dataset_means),
                std_dev: population_std_dev(&dataset_means),
                average_rank: average_ranks[c],
            }
        })
        .collect();

    StatisticSummary {
        statistic,
        classifiers,
        datasets,
        cells,
        overall,
        ranked_datasets,
    }
}

pub fn summarize_all(matrix: &ResultMatrix, statistics: &[Statistic]) -> Vec<StatisticSummary> {
    statistics.iter().map(|&s| summarize(matrix, s)).collect()
}

/// Restrict every summary to each dataset group.
///
/// Group members are matched against the summarised datasets by name; names
/// that are not under comparison are skipped, and a group left with no
/// datasets produces nothing.
pub fn summarize_groups(
    summaries: &[StatisticSummary],
    datasets: &[String],
    groups: &BTreeMap<String, Vec<String>>,
) -> Vec<GroupSummary> {
    groups
        .iter()
        .filter_map(|(group, members)| {
            let mut indices: Vec<usize> = Vec::new();
            for member in members {
                match datasets.iter().position(|d| d == member) {
                    Some(d) if !indices.contains(&d) => indices.push(d),
                    Some(_) => {}
                    None => warn!(%group, dataset = %member, "grouped dataset is not under comparison"),
                }
            }
            if indices.is_empty() {
                warn!(%group, "no dataset of the group is under comparison, group skipped");
                return None;
            }
            indices.sort_unstable();
            Some(GroupSummary {
                group: group.clone(),
                datasets: indices.iter().map(|&d| datasets[d].clone()).collect(),
                summaries: summaries.iter().map(|s| s.restrict(&indices)).collect(),
            })
        })
        .collect()
}

/// Average rank of each classifier over datasets where all classifiers have a value.
///
/// `means` is `[dataset][classifier]`. Ties share fractional ranks. Returns the
/// ranks (all `None` when no dataset is complete) and the datasets used.
pub fn average_ranks(means: &[Vec<Option<f64>>], higher_is_better: bool) -> (Vec<Option<f64>>, usize) {
    let n = means.first().map(Vec::len).unwrap_or(0);
    let mut totals = vec![0.0; n];
    let mut used = 0usize;
    for row in means {
        let complete: Option<Vec<f64>> = row.iter().copied().collect();
        let Some(values) = complete else { continue };
        for (total, r) in totals.iter_mut().zip(ranks(&values, higher_is_better)) {
            *total += r;
        }
        used += 1;
    }
    if used == 0 {
        return (vec![None; n], 0);
    }
    (totals.into_iter().map(|t| Some(t / used as f64)).collect(), used)
}

/// Classifier indices from best to worst average rank; unranked classifiers
/// keep their configured order at the end.
pub fn rank_order(average_ranks: &[Option<f64>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..average_ranks.len()).collect();
    order.sort_by(|&a, &b| match (average_ranks[a], average_ranks[b]) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use foldstat_core::{FoldHeader, FoldMetrics, FoldResult};

    fn fold(acc: f64, nll: f64) -> FoldResult {
        FoldResult::new(
            FoldHeader::default(),
            FoldMetrics {
                accuracy: acc,
                neg_log_likelihood: nll,
                ..FoldMetrics::default()
            },
        )
    }

    fn matrix() -> ResultMatrix {
        let mut m = ResultMatrix::new(
            vec!["A".into(), "B".into()],
            vec!["d1".into(), "d2".into(), "d3".into()],
            2,
        );
        m.set(0, 0, 0, fold(0.8, 0.5));
        m.set(0, 0, 1, fold(0.6, 0.7));
        m.set(1, 0, 0, fold(0.9, 0.3));
        m.set(1, 0, 1, fold(0.9, 0.3));
        m.set(0, 1, 0, fold(0.5, 1.0));
        m.set(1, 1, 1, fold(0.5, 1.2));
        // d3: only A
        m.set(0, 2, 0, fold(0.1, 2.0));
        m
    }

    #[test]
    fn test_cell_mean_and_population_std() {
        let s = summarize(&matrix(), Statistic::Accuracy);
        let cell = s.cells[0][0].unwrap();
        assert_eq!(cell.n, 2);
        assert_abs_diff_eq!(cell.mean, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(cell.std_dev, 0.1, epsilon = 1e-12);
        assert!(s.cells[2][1].is_none());
    }

    #[test]
    fn test_overall_and_ranks() {
        let s = summarize(&matrix(), Statistic::Accuracy);
        // d1: B better, d2: tie, d3 excluded (B has nothing)
        assert_eq!(s.ranked_datasets, 2);
        assert_eq!(s.overall[0].average_rank, Some(1.75));
        assert_eq!(s.overall[1].average_rank, Some(1.25));
        assert_eq!(s.overall[0].datasets, 3);
        assert_eq!(s.overall[1].datasets, 2);
        assert_abs_diff_eq!(s.overall[1].mean.unwrap(), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_lower_is_better_ranking() {
        let s = summarize(&matrix(), Statistic::NegLogLikelihood);
        // d1: B lower NLL wins, d2: A lower wins
        assert_eq!(s.overall[0].average_rank, Some(1.5));
        assert_eq!(s.overall[1].average_rank, Some(1.5));
    }

    #[test]
    fn test_idempotent() {
        let m = matrix();
        let first = summarize_all(&m, &Statistic::ALL);
        let second = summarize_all(&m, &Statistic::ALL);
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            for (ra, rb) in a.means().iter().zip(b.means()) {
                for (x, y) in ra.iter().zip(rb) {
                    assert_eq!(x.map(f64::to_bits), y.map(f64::to_bits));
                }
            }
        }
    }

    #[test]
    fn test_missing_statistic_gives_blank_cells() {
        let s = summarize(&matrix(), Statistic::BuildTime);
        assert!(s.cells.iter().flatten().all(Option::is_none));
        assert_eq!(s.overall[0].mean, None);
        assert_eq!(s.ranked_datasets, 0);
    }

    #[test]
    fn test_group_recomputes_ranks_on_its_datasets() {
        let m = matrix();
        let full = summarize_all(&m, &[Statistic::Accuracy]);
        let mut groups = BTreeMap::new();
        groups.insert("small".to_string(), vec!["d2".to_string(), "d1".to_string(), "unknown".to_string()]);
        groups.insert("empty".to_string(), vec!["nowhere".to_string()]);

        let result = summarize_groups(&full, m.datasets(), &groups);
        assert_eq!(result.len(), 1);
        let small = &result[0];
        assert_eq!(small.group, "small");
        assert_eq!(small.datasets, vec!["d1", "d2"]);

        let acc = &small.summaries[0];
        assert_eq!(acc.cells.len(), 2);
        assert_eq!(acc.ranked_datasets, 2);
        assert_eq!(acc.overall[0].average_rank, Some(1.75));
        // d3 is outside the group, so A is averaged over d1 and d2 only
        assert_eq!(acc.overall[0].datasets, 2);
        assert_abs_diff_eq!(acc.overall[0].mean.unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_restrict_to_single_dataset() {
        let s = summarize(&matrix(), Statistic::Accuracy);
        let d1 = s.restrict(&[0]);
        assert_eq!(d1.datasets, vec!["d1"]);
        assert_eq!(d1.overall[0].average_rank, Some(2.0));
        assert_eq!(d1.overall[1].average_rank, Some(1.0));
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(rank_order(&[Some(2.0), None, Some(1.0)]), vec![2, 0, 1]);
        assert_eq!(rank_order(&[Some(1.5), Some(1.5)]), vec![0, 1]);
    }
}
