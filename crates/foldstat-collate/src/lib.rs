//! Collation of per-fold classifier results into summary tables, pairwise
//! significance tests and cliques of indistinguishable classifiers.

pub mod aggregator;
pub mod clique;
pub mod error;
pub mod matrix;
pub mod pairwise;
pub mod pipeline;
pub mod report;
pub mod summarizer;

pub use aggregator::Aggregator;
pub use clique::{cliques_in_order, find_cliques, Clique};
pub use error::{CollateError, CollateResult};
pub use matrix::{FailureKind, FoldFailure, ResultMatrix};
pub use pairwise::{DatasetTest, PairwiseComparison, PairwiseEngine, StatisticComparison, StatisticGrid};
pub use pipeline::{compare_table, CollationReport, Collator};
pub use summarizer::{
    average_ranks, rank_order, summarize, summarize_all, summarize_groups, ClassifierSummary, GroupSummary,
    StatisticSummary,
};
