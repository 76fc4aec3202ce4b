use foldstat_core::{FoldMetrics, PredictionRecord};

/// Contribution of a true-class probability of exactly zero to the NLL sum: log2(0.01).
pub const NLL_PENALTY: f64 = -6.64;

/// Per-class F1 reported when a class has no true positives.
pub const F1_NO_TRUE_POSITIVES: f64 = 1e-7;

/// Compute accuracy: fraction of correct predictions.
pub fn accuracy(records: &[PredictionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let correct = records.iter().filter(|r| r.is_correct()).count();
    correct as f64 / records.len() as f64
}

/// Confusion matrix indexed `[actual class][predicted class]`.
pub fn confusion_matrix(records: &[PredictionRecord], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for r in records {
        if r.actual_class < n_classes && r.predicted_class < n_classes {
            matrix[r.actual_class][r.predicted_class] += 1;
        }
    }
    matrix
}

/// Number of instances of each actual class (row sums).
pub fn class_counts(cm: &[Vec<usize>]) -> Vec<usize> {
    cm.iter().map(|row| row.iter().sum()).collect()
}

/// Number of predictions of each class (column sums).
pub fn predicted_counts(cm: &[Vec<usize>]) -> Vec<usize> {
    (0..cm.len()).map(|c| cm.iter().map(|row| row[c]).sum()).collect()
}

/// Precision for a specific class.
pub fn precision_class(cm: &[Vec<usize>], class: usize) -> f64 {
    let tp = cm[class][class];
    let predicted: usize = cm.iter().map(|row| row[class]).sum();
    if predicted == 0 {
        0.0
    } else {
        tp as f64 / predicted as f64
    }
}

/// Recall for a specific class.
pub fn recall_class(cm: &[Vec<usize>], class: usize) -> f64 {
    let tp = cm[class][class];
    let actual: usize = cm[class].iter().sum();
    if actual == 0 {
        0.0
    } else {
        tp as f64 / actual as f64
    }
}

/// Balanced accuracy: unweighted mean of per-class recall.
///
/// Classes with no instances in the fold have no recall and are left out.
pub fn balanced_accuracy(cm: &[Vec<usize>]) -> f64 {
    let counts = class_counts(cm);
    let present: Vec<usize> = (0..cm.len()).filter(|&c| counts[c] > 0).collect();
    if present.is_empty() {
        return 0.0;
    }
    let sum: f64 = present.iter().map(|&c| recall_class(cm, c)).sum();
    sum / present.len() as f64
}

/// F1 score for a specific class.
pub fn f1_score_class(cm: &[Vec<usize>], class: usize) -> f64 {
    if cm[class][class] == 0 {
        return F1_NO_TRUE_POSITIVES;
    }
    let p = precision_class(cm, class);
    let r = recall_class(cm, class);
    2.0 * p * r / (p + r)
}

/// F1 of the minority class for two-class problems, macro F1 otherwise.
pub fn f1(cm: &[Vec<usize>]) -> f64 {
    let n_classes = cm.len();
    if n_classes == 0 {
        return 0.0;
    }
    if n_classes == 2 {
        let counts = class_counts(cm);
        let minority = if counts[0] < counts[1] { 0 } else { 1 };
        return f1_score_class(cm, minority);
    }
    let sum: f64 = (0..n_classes).map(|c| f1_score_class(cm, c)).sum();
    sum / n_classes as f64
}

/// Matthews Correlation Coefficient, multiclass form.
///
/// MCC = (N·Σc_kk − Σ row_k·col_k) / √((N² − Σ col_k²)(N² − Σ row_k²))
pub fn mcc(cm: &[Vec<usize>]) -> f64 {
    let rows = class_counts(cm);
    let cols = predicted_counts(cm);
    let n: f64 = rows.iter().sum::<usize>() as f64;
    let trace: f64 = (0..cm.len()).map(|k| cm[k][k] as f64).sum();

    let cross: f64 = rows.iter().zip(&cols).map(|(&r, &c)| r as f64 * c as f64).sum();
    let num = n * trace - cross;
    if num == 0.0 {
        return 0.0;
    }

    let col_sq: f64 = cols.iter().map(|&c| (c * c) as f64).sum();
    let row_sq: f64 = rows.iter().map(|&r| (r * r) as f64).sum();
    let denom = (n * n - col_sq).sqrt() * (n * n - row_sq).sqrt();
    if denom < 1e-10 {
        return 0.0;
    }
    num / denom
}

/// Negative log-likelihood in bits, using only the probability of the true class.
pub fn neg_log_likelihood(records: &[PredictionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: f64 = records
        .iter()
        .map(|r| {
            let p = r.true_class_probability();
            if p <= 0.0 {
                NLL_PENALTY
            } else {
                p.log2()
            }
        })
        .sum();
    -total / records.len() as f64
}

/// One-vs-rest ROC-AUC of a class, scored by that class's probability.
///
/// Walks the thresholds from the highest score down with the trapezoidal rule;
/// equal scores (compared bitwise, so NaN groups too) move the curve in one
/// diagonal step.
pub fn auroc_class(records: &[PredictionRecord], class: usize) -> f64 {
    let mut pairs: Vec<(f64, bool)> = records
        .iter()
        .map(|r| (r.probabilities.get(class).copied().unwrap_or(0.0), r.actual_class == class))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let total_pos = pairs.iter().filter(|(_, pos)| *pos).count() as f64;
    let total_neg = pairs.len() as f64 - total_pos;

    if total_pos == 0.0 || total_neg == 0.0 {
        return 0.5; // undefined, return random
    }

    let mut auc = 0.0;
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut prev_tpr = 0.0;
    let mut prev_fpr = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0.to_bits();
        while i < pairs.len() && pairs[i].0.to_bits() == score {
            if pairs[i].1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        let tpr = tp / total_pos;
        let fpr = fp / total_neg;
        auc += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }
    auc
}

/// AUROC of class 1 for two classes; class-prior weighted one-vs-rest AUROC otherwise.
pub fn mean_auroc(records: &[PredictionRecord], n_classes: usize) -> f64 {
    if n_classes == 2 {
        return auroc_class(records, 1);
    }
    let n = records.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mut counts = vec![0usize; n_classes];
    for r in records {
        if r.actual_class < n_classes {
            counts[r.actual_class] += 1;
        }
    }
    (0..n_classes)
        .map(|c| auroc_class(records, c) * counts[c] as f64 / n)
        .sum()
}

/// Median of the recorded prediction times, if every record has one.
pub fn median_prediction_time(records: &[PredictionRecord]) -> Option<u64> {
    let mut times: Vec<u64> = records.iter().map(|r| r.prediction_time).collect::<Option<_>>()?;
    if times.is_empty() {
        return None;
    }
    times.sort_unstable();
    let mid = times.len() / 2;
    if times.len() % 2 == 0 {
        Some((times[mid] + times[mid - 1]) / 2)
    } else {
        Some(times[mid])
    }
}

/// Every metric of one fold, computed in a single pass over the confusion matrix.
pub fn fold_metrics(records: &[PredictionRecord], n_classes: usize) -> FoldMetrics {
    let cm = confusion_matrix(records, n_classes);
    FoldMetrics {
        num_instances: records.len(),
        num_classes: n_classes,
        accuracy: accuracy(records),
        balanced_accuracy: balanced_accuracy(&cm),
        neg_log_likelihood: neg_log_likelihood(records),
        mean_auroc: mean_auroc(records, n_classes),
        f1: f1(&cm),
        mcc: mcc(&cm),
        median_prediction_time: median_prediction_time(records),
    }
}
