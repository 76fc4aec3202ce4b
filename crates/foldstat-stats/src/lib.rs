//! One-sample tests on paired differences, and the win/loss binomial test.

pub mod error;
pub mod one_sample;
pub mod win_loss;

pub use error::{StatsError, StatsResult};
pub use one_sample::{paired_tests, sign_test, signed_rank_test, t_test, PairedTests, TestOutcome, TestPValues};
pub use win_loss::win_loss_p_value;
