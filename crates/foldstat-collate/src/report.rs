use std::path::Path;

use foldstat_io::{write_records, write_table, Table};
use tracing::info;

use crate::error::CollateResult;
use crate::matrix::{FailureKind, ResultMatrix};
use crate::pairwise::{PairwiseComparison, StatisticComparison};
use crate::summarizer::{GroupSummary, StatisticSummary};

/// `Counts.csv`: valid folds per dataset per classifier; the corner cell holds the expected count.
pub fn write_counts(out: &Path, matrix: &ResultMatrix) -> CollateResult<()> {
    let mut table = Table::new(format!("folds={}", matrix.num_folds()), matrix.classifiers().to_vec());
    for (dataset, counts) in matrix.datasets().iter().zip(matrix.counts()) {
        table.push_row(dataset.clone(), counts.into_iter().map(|c| Some(c as f64)).collect());
    }
    write_table(&out.join("Counts.csv"), &table)?;
    Ok(())
}

/// `MissingFolds.csv` and `CorruptFolds.csv`.
pub fn write_failures(out: &Path, matrix: &ResultMatrix) -> CollateResult<()> {
    for (kind, file) in [
        (FailureKind::Missing, "MissingFolds.csv"),
        (FailureKind::Corrupt, "CorruptFolds.csv"),
    ] {
        let mut rows = vec![["classifier", "dataset", "split", "fold", "path", "reason"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()];
        for f in matrix.failures_of(kind) {
            rows.push(vec![
                f.classifier.clone(),
                f.dataset.clone(),
                f.split.to_string(),
                f.fold.to_string(),
                f.path.display().to_string(),
                f.reason.clone(),
            ]);
        }
        write_records(&out.join(file), &rows)?;
    }
    Ok(())
}

/// Per-statistic tables: dataset means, standard deviations, the per-classifier
/// summary and the raw fold values of each classifier.
pub fn write_summary(out: &Path, matrix: &ResultMatrix, summary: &StatisticSummary) -> CollateResult<()> {
    let stem = summary.statistic.file_stem();

    let mut means = Table::new("dataset", summary.classifiers.clone());
    let mut std_devs = Table::new("dataset", summary.classifiers.clone());
    for (dataset, row) in summary.datasets.iter().zip(&summary.cells) {
        means.push_row(dataset.clone(), row.iter().map(|s| s.map(|s| s.mean)).collect());
        std_devs.push_row(dataset.clone(), row.iter().map(|s| s.map(|s| s.std_dev)).collect());
    }
    write_table(&out.join(format!("{stem}.csv")), &means)?;
    write_table(&out.join(format!("{stem}StdDev.csv")), &std_devs)?;

    write_table(&out.join(format!("Mean{stem}.csv")), &overall_table(summary))?;

    let fold_columns: Vec<String> = (0..matrix.num_folds()).map(|k| format!("fold{k}")).collect();
    for (c, classifier) in matrix.classifiers().iter().enumerate() {
        let mut folds = Table::new("dataset", fold_columns.clone());
        for (d, dataset) in matrix.datasets().iter().enumerate() {
            folds.push_row(dataset.clone(), matrix.fold_values(c, d, summary.statistic));
        }
        write_table(&out.join(classifier).join(format!("{stem}Folds.csv")), &folds)?;
    }
    Ok(())
}

fn overall_table(summary: &StatisticSummary) -> Table {
    let mut overall = Table::new(
        "classifier",
        vec!["mean".into(), "std_dev".into(), "datasets".into(), "average_rank".into()],
    );
    for c in &summary.overall {
        overall.push_row(
            c.classifier.clone(),
            vec![c.mean, c.std_dev, Some(c.datasets as f64), c.average_rank],
        );
    }
    overall
}

/// Per-group tables: `groups/<group>/Mean<Stat>.csv` for each group, and
/// `groups/Ranks<Stat>.csv` with one row of average ranks per group.
pub fn write_groups(out: &Path, classifiers: &[String], groups: &[GroupSummary]) -> CollateResult<()> {
    let Some(first) = groups.first() else {
        return Ok(());
    };
    let dir = out.join("groups");
    for group in groups {
        for summary in &group.summaries {
            let file = format!("Mean{}.csv", summary.statistic.file_stem());
            write_table(&dir.join(&group.group).join(file), &overall_table(summary))?;
        }
    }
    for (i, summary) in first.summaries.iter().enumerate() {
        let mut ranks = Table::new("group", classifiers.to_vec());
        for group in groups {
            let row = group.summaries[i].overall.iter().map(|c| c.average_rank).collect();
            ranks.push_row(group.group.clone(), row);
        }
        write_table(&dir.join(format!("Ranks{}.csv", summary.statistic.file_stem())), &ranks)?;
    }
    info!(groups = groups.len(), "group tables written");
    Ok(())
}

/// File name of the test listing, e.g. `summaryTestsRotF_RandF.csv`.
pub fn tests_file_name(classifiers: &[String]) -> String {
    format!("summaryTests{}.csv", classifiers.join("_"))
}

/// `summaryTests<Classifiers>.csv`: every pair of every compared statistic,
/// followed by the signed-rank p-values, no-difference matrix and cliques.
pub fn write_tests(out: &Path, classifiers: &[String], comparisons: &[StatisticComparison]) -> CollateResult<()> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for cmp in comparisons {
        rows.push(vec![
            cmp.statistic.clone(),
            "alpha".into(),
            fmt(cmp.alpha),
            "adjusted alpha".into(),
            fmt(cmp.adjusted_alpha),
        ]);
        for pair in &cmp.pairs {
            rows.extend(pair_rows(pair));
        }

        let mut header = vec!["SIGN_RANK_P".to_string()];
        header.extend(cmp.classifiers.iter().cloned());
        rows.push(header);
        for (name, row) in cmp.classifiers.iter().zip(&cmp.sign_rank_p) {
            let mut line = vec![name.clone()];
            line.extend(row.iter().map(|p| p.map(fmt).unwrap_or_default()));
            rows.push(line);
        }

        let mut header = vec!["NOSIGDIFFERENCE".to_string()];
        header.extend(cmp.classifiers.iter().cloned());
        rows.push(header);
        for (name, row) in cmp.classifiers.iter().zip(&cmp.no_difference) {
            let mut line = vec![name.clone()];
            line.extend(row.iter().map(|&same| (if same { "1" } else { "0" }).to_string()));
            rows.push(line);
        }

        let mut ranking = vec!["RANK_ORDER".to_string()];
        ranking.extend(cmp.rank_order.iter().map(|&i| cmp.classifiers[i].clone()));
        rows.push(ranking);
        for (i, clique) in cmp.cliques.iter().enumerate() {
            let mut line = vec![format!("CLIQUE{}", i + 1)];
            line.extend(clique.members.iter().cloned());
            rows.push(line);
        }
    }
    let path = out.join(tests_file_name(classifiers));
    write_records(&path, &rows)?;
    info!(path = %path.display(), "wrote pairwise tests");
    Ok(())
}

fn pair_rows(p: &PairwiseComparison) -> Vec<Vec<String>> {
    let key = |label: &str| vec![p.statistic.clone(), p.first.clone(), p.second.clone(), label.to_string()];
    let with = |label: &str, rest: Vec<String>| {
        let mut row = key(label);
        row.extend(rest);
        row
    };
    let opt = |v: Option<f64>| v.map(fmt).unwrap_or_default();

    let mut coverage = vec![
        p.paired_datasets.to_string(),
        "partial".into(),
        p.partial_datasets.to_string(),
    ];
    if !p.reliable {
        coverage.push("UNRELIABLE".into());
    }

    let tests = match p.tests.p_values() {
        Some(t) => vec![
            "T_TEST".into(),
            fmt(t.t_test),
            "SIGN_TEST".into(),
            fmt(t.sign_test),
            "SIGN_RANK_TEST".into(),
            fmt(t.sign_rank_test),
            (if p.significant { "SIGNIFICANT" } else { "NOT_SIGNIFICANT" }).into(),
        ],
        None => vec!["INSUFFICIENT_DATA".into(), p.paired_datasets.to_string()],
    };

    vec![
        with(
            "WIN/DRAW/LOSE",
            vec![
                p.wins.to_string(),
                p.draws.to_string(),
                p.losses.to_string(),
                "p =".into(),
                fmt(p.win_loss_p_value),
            ],
        ),
        with(
            "SIGWIN/SIGDRAW/SIGLOSS",
            vec![p.sig_wins.to_string(), p.sig_draws.to_string(), p.sig_losses.to_string()],
        ),
        with(
            "COUNT",
            vec![
                p.datasets_compared.to_string(),
                "MeanDiff".into(),
                opt(p.mean_diff),
                "StDevDiff".into(),
                opt(p.std_dev_diff),
            ],
        ),
        with("PAIRED", coverage),
        with("TESTS", tests),
    ]
}

fn fmt(v: f64) -> String {
    format!("{v:.8}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::{PairwiseEngine, StatisticGrid};
    use crate::summarizer::{summarize, summarize_groups};
    use foldstat_core::{FoldHeader, FoldMetrics, FoldResult, Statistic};
    use foldstat_io::read_table;
    use std::fs;

    fn matrix() -> ResultMatrix {
        let mut m = ResultMatrix::new(vec!["A".into(), "B".into()], vec!["d1".into(), "d2".into()], 2);
        for (c, d, k, acc) in [(0, 0, 0, 0.8), (0, 0, 1, 0.6), (1, 0, 0, 0.9), (0, 1, 0, 0.75), (1, 1, 0, 0.85)] {
            let metrics = FoldMetrics {
                accuracy: acc,
                ..FoldMetrics::default()
            };
            m.set(c, d, k, FoldResult::new(FoldHeader::default(), metrics));
        }
        m
    }

    #[test]
    fn test_counts_file() {
        let dir = tempfile::tempdir().unwrap();
        write_counts(dir.path(), &matrix()).unwrap();
        let table = read_table(&dir.path().join("Counts.csv")).unwrap();
        assert_eq!(table.corner, "folds=2");
        assert_eq!(table.value(0, 0), Some(2.0));
        assert_eq!(table.value(0, 1), Some(1.0));
    }

    #[test]
    fn test_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let m = matrix();
        let s = summarize(&m, Statistic::Accuracy);
        write_summary(dir.path(), &m, &s).unwrap();

        let means = read_table(&dir.path().join("TestAcc.csv")).unwrap();
        assert!((means.value(0, 0).unwrap() - 0.7).abs() < 1e-12);
        assert!(dir.path().join("TestAccStdDev.csv").exists());
        let overall = read_table(&dir.path().join("MeanTestAcc.csv")).unwrap();
        assert_eq!(overall.columns[3], "average_rank");
        let folds = read_table(&dir.path().join("B").join("TestAccFolds.csv")).unwrap();
        assert_eq!(folds.rows[0].values, vec![Some(0.9), None]);
    }

    #[test]
    fn test_tests_file() {
        let dir = tempfile::tempdir().unwrap();
        let m = matrix();
        let grid = StatisticGrid::from_matrix(&m, Statistic::Accuracy);
        let cmp = PairwiseEngine::new(0.05, 0.5).compare_all(&grid).unwrap();
        write_tests(dir.path(), m.classifiers(), &[cmp]).unwrap();

        let text = fs::read_to_string(dir.path().join("summaryTestsA_B.csv")).unwrap();
        assert!(text.contains("TestAcc,A,B,WIN/DRAW/LOSE,0,0,2,p =,0.25000000"));
        assert!(text.contains("TestAcc,A,B,PAIRED,1,partial,2,UNRELIABLE"));
        assert!(text.contains("INSUFFICIENT_DATA"));
        assert!(text.contains("CLIQUE1,"));
    }

    #[test]
    fn test_group_files() {
        let dir = tempfile::tempdir().unwrap();
        let m = matrix();
        let full = vec![summarize(&m, Statistic::Accuracy)];
        let mut groups = std::collections::BTreeMap::new();
        groups.insert("first".to_string(), vec!["d1".to_string()]);
        groups.insert("second".to_string(), vec!["d2".to_string()]);
        let groups = summarize_groups(&full, m.datasets(), &groups);
        write_groups(dir.path(), m.classifiers(), &groups).unwrap();

        let first = read_table(&dir.path().join("groups").join("first").join("MeanTestAcc.csv")).unwrap();
        assert!((first.value(0, 0).unwrap() - 0.7).abs() < 1e-12);
        assert_eq!(first.value(1, 2), Some(1.0));

        let ranks = read_table(&dir.path().join("groups").join("RanksTestAcc.csv")).unwrap();
        assert_eq!(ranks.corner, "group");
        assert_eq!(ranks.rows[0].label, "first");
        assert_eq!(ranks.rows[0].values, vec![Some(2.0), Some(1.0)]);
        assert_eq!(ranks.rows[1].values, vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_no_groups_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_groups(dir.path(), &["A".to_string()], &[]).unwrap();
        assert!(!dir.path().join("groups").exists());
    }

    #[test]
    fn test_failure_files_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        write_failures(dir.path(), &matrix()).unwrap();
        let text = fs::read_to_string(dir.path().join("MissingFolds.csv")).unwrap();
        assert_eq!(text, "classifier,dataset,split,fold,path,reason\n");
    }
}
