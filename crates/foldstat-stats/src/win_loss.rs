use statrs::distribution::{Binomial, DiscreteCDF};

use crate::error::{StatsError, StatsResult};

/// One-sided binomial p-value of a win/loss split under a fair coin.
///
/// The tail is taken towards the observed side, so 5 wins and 0 losses gives
/// 1/32, as does 0 wins and 5 losses. Draws take no part. With no decided
/// datasets the p-value is 1.
pub fn win_loss_p_value(wins: usize, losses: usize) -> StatsResult<f64> {
    let n = wins + losses;
    if n == 0 {
        return Ok(1.0);
    }
    let dist = Binomial::new(0.5, n as u64).map_err(|e| StatsError::Distribution(e.to_string()))?;
    // P(X >= wins) == P(X <= losses) for p = 0.5
    let tail = dist.cdf(wins.min(losses) as u64);
    Ok(tail.min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_no_decided_datasets() {
        assert_eq!(win_loss_p_value(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_clean_sweep() {
        assert_abs_diff_eq!(win_loss_p_value(5, 0).unwrap(), 1.0 / 32.0, epsilon = 1e-12);
        assert_abs_diff_eq!(win_loss_p_value(0, 5).unwrap(), 1.0 / 32.0, epsilon = 1e-12);
    }

    #[test]
    fn test_even_split_is_not_evidence() {
        let p = win_loss_p_value(1, 1).unwrap();
        assert_abs_diff_eq!(p, 0.75, epsilon = 1e-12);
        assert!(win_loss_p_value(10, 10).unwrap() > 0.5);
    }

    #[test]
    fn test_lopsided_split() {
        // P(X <= 2 | n = 12) = (1 + 12 + 66) / 4096
        let p = win_loss_p_value(10, 2).unwrap();
        assert_abs_diff_eq!(p, 79.0 / 4096.0, epsilon = 1e-12);
    }
}
