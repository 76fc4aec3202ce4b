use serde::{Deserialize, Serialize};

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation: sqrt(Σx²/n − mean²).
///
/// Rounding can push the variance a hair below zero for constant input; it is
/// clamped so the result is never NaN.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let n = values.len() as f64;
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    Some((sum_sq / n - m * m).max(0.0).sqrt())
}

/// Sample variance with n − 1 in the denominator, `None` below two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Count, mean and population standard deviation of one group of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    /// Summarise `values`; an empty group has no summary rather than a zero one.
    pub fn of(values: &[f64]) -> Option<Summary> {
        Some(Summary {
            n: values.len(),
            mean: mean(values)?,
            std_dev: population_std_dev(values)?,
        })
    }
}

/// Fractional ranks, 1 being the best value. Tied values share the average
/// of the ranks they span.
pub fn ranks(values: &[f64], higher_is_better: bool) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        if higher_is_better {
            values[b].total_cmp(&values[a])
        } else {
            values[a].total_cmp(&values[b])
        }
    });

    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // positions i..j hold ranks i+1..=j
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            out[idx] = avg;
        }
        i = j;
    }
    out
}

/// Ranks of absolute values in ascending order, averaged over ties.
/// Used by the signed-rank test.
pub fn abs_ranks(values: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    ranks(&abs, false)
}
