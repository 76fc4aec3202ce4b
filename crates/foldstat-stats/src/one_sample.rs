use foldstat_metrics::{abs_ranks, mean, sample_variance};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, ContinuousCDF, DiscreteCDF, Normal, StudentsT};
use tracing::debug;

use crate::error::{StatsError, StatsResult};

/// Below this many observations the sign test uses the exact binomial.
const SIGN_TEST_EXACT_LIMIT: usize = 50;

/// Test statistic and two-sided p-value of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestOutcome {
    fn no_difference() -> Self {
        TestOutcome {
            statistic: 0.0,
            p_value: 1.0,
        }
    }
}

/// Two-sided p-values of the three paired tests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestPValues {
    pub t_test: f64,
    pub sign_test: f64,
    pub sign_rank_test: f64,
}

/// Result of testing one vector of paired differences against zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairedTests {
    Computed(TestPValues),
    /// Fewer than two paired observations; nothing can be concluded.
    InsufficientData { samples: usize },
}

impl PairedTests {
    pub fn p_values(&self) -> Option<&TestPValues> {
        match self {
            PairedTests::Computed(p) => Some(p),
            PairedTests::InsufficientData { .. } => None,
        }
    }

    /// Significant iff the signed-rank p-value falls below `alpha`.
    /// Insufficient data is never significant.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_values().is_some_and(|p| p.sign_rank_test < alpha)
    }
}

/// Run the t, sign and signed-rank tests on `diffs`.
///
/// A vector of identical zeros is reported as p = 1 for all three tests.
pub fn paired_tests(diffs: &[f64]) -> StatsResult<PairedTests> {
    if diffs.len() < 2 {
        return Ok(PairedTests::InsufficientData {
            samples: diffs.len(),
        });
    }
    check_finite(diffs)?;
    if diffs.iter().all(|&d| d == 0.0) {
        debug!(samples = diffs.len(), "all differences are zero, skipping tests");
        return Ok(PairedTests::Computed(TestPValues {
            t_test: 1.0,
            sign_test: 1.0,
            sign_rank_test: 1.0,
        }));
    }
    Ok(PairedTests::Computed(TestPValues {
        t_test: t_test(diffs)?.p_value,
        sign_test: sign_test(diffs)?.p_value,
        sign_rank_test: signed_rank_test(diffs)?.p_value,
    }))
}

/// One-sample Student t-test of the mean difference against zero.
///
/// Uses the sample variance with n − 1 degrees of freedom.
pub fn t_test(diffs: &[f64]) -> StatsResult<TestOutcome> {
    let n = require_samples(diffs, 2)?;
    check_finite(diffs)?;
    let m = mean(diffs).unwrap_or(0.0);
    let var = sample_variance(diffs).unwrap_or(0.0);

    if var == 0.0 {
        // constant vector: either exactly zero or infinitely far from it
        if m == 0.0 {
            return Ok(TestOutcome::no_difference());
        }
        return Ok(TestOutcome {
            statistic: m.signum() * f64::INFINITY,
            p_value: 0.0,
        });
    }

    let t = m / (var / n as f64).sqrt();
    let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64).map_err(dist_err)?;
    let p = 2.0 * (1.0 - dist.cdf(t.abs()));
    Ok(TestOutcome {
        statistic: t,
        p_value: clamp_p(p),
    })
}

/// Sign test: counts of positive against negative differences.
///
/// Zero differences are split equally between the two sides; when there is
/// an odd number of them and the exact binomial is used, one is dropped so
/// the split stays whole. The statistic is the smaller side.
pub fn sign_test(diffs: &[f64]) -> StatsResult<TestOutcome> {
    let mut n = require_samples(diffs, 2)?;
    check_finite(diffs)?;
    let below = diffs.iter().filter(|&&d| d < 0.0).count();
    let above = diffs.iter().filter(|&&d| d > 0.0).count();
    let mut zeros = n - below - above;

    if zeros % 2 == 1 && n < SIGN_TEST_EXACT_LIMIT {
        zeros -= 1;
        n -= 1;
    }
    let s_below = below as f64 + zeros as f64 / 2.0;
    let s_above = above as f64 + zeros as f64 / 2.0;
    let stat = s_below.min(s_above);

    let tail = if n < SIGN_TEST_EXACT_LIMIT {
        let dist = Binomial::new(0.5, n as u64).map_err(dist_err)?;
        dist.cdf(stat.floor() as u64)
    } else {
        let nf = n as f64;
        let dist = Normal::new(nf / 2.0, nf.sqrt() / 2.0).map_err(dist_err)?;
        dist.cdf(stat)
    };
    Ok(TestOutcome {
        statistic: stat,
        p_value: clamp_p(2.0 * tail),
    })
}

/// Wilcoxon signed-rank test with the normal approximation.
///
/// Zero differences are dropped; tied magnitudes share their average rank.
pub fn signed_rank_test(diffs: &[f64]) -> StatsResult<TestOutcome> {
    require_samples(diffs, 2)?;
    check_finite(diffs)?;
    let nonzero: Vec<f64> = diffs.iter().copied().filter(|&d| d != 0.0).collect();
    if nonzero.is_empty() {
        return Ok(TestOutcome::no_difference());
    }

    let ranks = abs_ranks(&nonzero);
    let (mut w_plus, mut w_minus) = (0.0, 0.0);
    for (d, r) in nonzero.iter().zip(&ranks) {
        if *d > 0.0 {
            w_plus += r;
        } else {
            w_minus += r;
        }
    }
    let stat = f64::max(w_plus, w_minus);

    let m = nonzero.len() as f64;
    let mu = m * (m + 1.0) / 4.0;
    let sd = (m * (m + 1.0) * (2.0 * m + 1.0) / 24.0).sqrt();
    let dist = Normal::new(mu, sd).map_err(dist_err)?;
    Ok(TestOutcome {
        statistic: stat,
        p_value: clamp_p(2.0 * (1.0 - dist.cdf(stat))),
    })
}

fn require_samples(diffs: &[f64], needed: usize) -> StatsResult<usize> {
    if diffs.len() < needed {
        return Err(StatsError::TooFewSamples {
            needed,
            found: diffs.len(),
        });
    }
    Ok(diffs.len())
}

fn check_finite(diffs: &[f64]) -> StatsResult<()> {
    match diffs.iter().position(|d| !d.is_finite()) {
        Some(i) => Err(StatsError::NonFinite(i)),
        None => Ok(()),
    }
}

fn clamp_p(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

fn dist_err(e: impl std::fmt::Display) -> StatsError {
    StatsError::Distribution(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_t_test_known_value() {
        let out = t_test(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_abs_diff_eq!(out.statistic, 4.242640687, epsilon = 1e-6);
        assert_abs_diff_eq!(out.p_value, 0.013236, epsilon = 1e-4);
    }

    #[test]
    fn test_t_test_constant_nonzero() {
        let out = t_test(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(out.p_value, 0.0);
        assert!(out.statistic.is_infinite());
    }

    #[test]
    fn test_sign_test_exact_binomial() {
        let diffs = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0];
        let out = sign_test(&diffs).unwrap();
        assert_eq!(out.statistic, 2.0);
        // P(X <= 2 | n = 10) = 56 / 1024
        assert_abs_diff_eq!(out.p_value, 112.0 / 1024.0, epsilon = 1e-10);
    }

    #[test]
    fn test_sign_test_drops_odd_zero() {
        let out = sign_test(&[0.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(out.statistic, 0.0);
        assert_abs_diff_eq!(out.p_value, 0.25, epsilon = 1e-10);
    }

    #[test]
    fn test_sign_test_normal_approximation() {
        let mut diffs = vec![1.0; 30];
        diffs.extend(vec![-1.0; 30]);
        let out = sign_test(&diffs).unwrap();
        assert_eq!(out.statistic, 30.0);
        assert_abs_diff_eq!(out.p_value, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_signed_rank_known_value() {
        let out = signed_rank_test(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(out.statistic, 15.0);
        assert_abs_diff_eq!(out.p_value, 0.043114, epsilon = 1e-4);
    }

    #[test]
    fn test_symmetric_differences_have_no_effect() {
        let p = paired_tests(&[0.1, -0.1]).unwrap();
        let p = p.p_values().unwrap();
        assert_abs_diff_eq!(p.t_test, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.sign_test, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.sign_rank_test, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_vectors_give_p_one() {
        let tests = paired_tests(&[0.0; 10]).unwrap();
        assert_eq!(
            tests,
            PairedTests::Computed(TestPValues {
                t_test: 1.0,
                sign_test: 1.0,
                sign_rank_test: 1.0,
            })
        );
        assert!(!tests.is_significant(0.05));
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(
            paired_tests(&[0.3]).unwrap(),
            PairedTests::InsufficientData { samples: 1 }
        );
        assert!(!paired_tests(&[]).unwrap().is_significant(1.0));
        assert!(t_test(&[0.3]).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(paired_tests(&[0.1, f64::NAN]), Err(StatsError::NonFinite(1)));
    }

    #[test]
    fn test_clear_shift_is_significant() {
        let diffs: Vec<f64> = (1..=20).map(|i| 0.05 + i as f64 * 0.001).collect();
        let tests = paired_tests(&diffs).unwrap();
        assert!(tests.is_significant(0.01));
    }

    #[test]
    fn test_random_p_values_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n = rng.gen_range(2..60);
            let diffs: Vec<f64> = (0..n)
                .map(|_| {
                    if rng.gen_bool(0.1) {
                        0.0
                    } else {
                        rng.gen_range(-1.0..1.0)
                    }
                })
                .collect();
            let tests = paired_tests(&diffs).unwrap();
            let p = tests.p_values().unwrap();
            for v in [p.t_test, p.sign_test, p.sign_rank_test] {
                assert!((0.0..=1.0).contains(&v), "p-value {v} out of range");
            }
        }
    }
}
