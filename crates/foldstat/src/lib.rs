//! # foldstat
//!
//! Collates per-fold prediction files from a classifier benchmark into
//! per-dataset summaries, pairwise significance tests and cliques of
//! classifiers that cannot be told apart.
//!
//! ## Modules
//!
//! - **core** - Fold records, statistics, configuration and error types
//! - **metrics** - Per-fold classification metrics, means, deviations and ranks
//! - **stats** - Paired t, sign and Wilcoxon signed-rank tests; win/loss binomial test
//! - **io** - Fold file parser and writer, CSV tables, JSON reports
//! - **collate** - Aggregator, summarizer, pairwise engine, clique builder and report writer

/// Records, statistics and configuration.
pub use foldstat_core as core;

/// Per-fold metrics and descriptive statistics.
pub use foldstat_metrics as metrics;

/// One-sample hypothesis tests.
pub use foldstat_stats as stats;

/// File formats.
pub use foldstat_io as io;

/// The collation pipeline.
pub use foldstat_collate as collate;

pub use foldstat_collate::{CollateError, CollationReport, Collator};
pub use foldstat_core::{CollateConfig, DatasetSource, Statistic};
