//! Command-line arguments for foldstat

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use foldstat::{CollateConfig, DatasetSource, Statistic};

#[derive(Parser, Debug)]
#[command(name = "foldstat")]
#[command(version)]
#[command(about = "Collate cross-validated classifier results and compare classifiers", long_about = None)]
pub struct Cli {
    /// Log every stage and file to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load fold files, summarise them and run the pairwise tests
    Collate(CollateArgs),
    /// Pairwise tests on a dataset x classifier table of scores
    Pairwise(PairwiseArgs),
    /// Print the summary of an earlier run from its summary.json
    Show(ShowArgs),
}

#[derive(Args, Debug, Default)]
pub struct CollateArgs {
    /// TOML configuration; flags given alongside override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory holding one subdirectory per classifier
    #[arg(short, long, value_name = "DIR")]
    pub results: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Expected number of folds per dataset
    #[arg(short = 'k', long)]
    pub folds: Option<usize>,

    /// Classifiers to compare, in report order (e.g. RotF,RandF)
    #[arg(short, long, value_delimiter = ',')]
    pub classifiers: Vec<String>,

    /// Dataset names, in report order
    #[arg(short, long, value_delimiter = ',', conflicts_with_all = ["datasets_file", "datasets_dir"])]
    pub datasets: Vec<String>,

    /// File listing one dataset per line
    #[arg(long, value_name = "FILE", conflicts_with = "datasets_dir")]
    pub datasets_file: Option<PathBuf>,

    /// Directory whose subdirectories are the datasets
    #[arg(long, value_name = "DIR")]
    pub datasets_dir: Option<PathBuf>,

    /// Significance level before the multiple-comparison adjustment
    #[arg(short, long)]
    pub alpha: Option<f64>,

    /// Also read trainFold files for the train estimate
    #[arg(long)]
    pub train: bool,

    /// Worker threads for loading fold files
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Fraction of fully covered datasets a comparison needs to be reliable
    #[arg(long, value_name = "RATIO")]
    pub min_coverage: Option<f64>,

    /// Statistics to summarise (default: all)
    #[arg(long, value_delimiter = ',')]
    pub statistics: Vec<Statistic>,

    /// Statistics to run pairwise tests on
    #[arg(long, value_delimiter = ',')]
    pub pairwise: Vec<Statistic>,
}

impl CollateArgs {
    /// Build the run configuration, layering flags over the config file.
    pub fn into_config(self) -> Result<CollateConfig> {
        let datasets = self.dataset_source();
        let mut config = match &self.config {
            Some(path) => CollateConfig::from_file(path)?,
            None => {
                let Some(results) = self.results.clone() else {
                    bail!("--results is required without --config");
                };
                let Some(output) = self.output.clone() else {
                    bail!("--output is required without --config");
                };
                let folds = self.folds.context("--folds is required without --config")?;
                let Some(datasets) = datasets.clone() else {
                    bail!("one of --datasets, --datasets-file or --datasets-dir is required without --config");
                };
                CollateConfig::new(results, output, self.classifiers.clone(), datasets, folds)
            }
        };

        if let Some(results) = self.results {
            config.results_path = results;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(folds) = self.folds {
            config.folds = folds;
        }
        if !self.classifiers.is_empty() {
            config.classifiers = self.classifiers;
        }
        if let Some(datasets) = datasets {
            config.datasets = datasets;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.train {
            config.include_train = true;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(ratio) = self.min_coverage {
            config.min_coverage = ratio;
        }
        if !self.statistics.is_empty() {
            config.statistics = self.statistics;
        }
        if !self.pairwise.is_empty() {
            config.pairwise_statistics = self.pairwise;
        }
        config.validate()?;
        Ok(config)
    }

    fn dataset_source(&self) -> Option<DatasetSource> {
        if !self.datasets.is_empty() {
            Some(DatasetSource::List(self.datasets.clone()))
        } else if let Some(path) = &self.datasets_file {
            Some(DatasetSource::File(path.clone()))
        } else {
            self.datasets_dir.clone().map(DatasetSource::Directory)
        }
    }
}

#[derive(Args, Debug)]
pub struct PairwiseArgs {
    /// CSV with classifier names in the first row and dataset names in the first column
    #[arg(short, long, value_name = "FILE")]
    pub table: PathBuf,

    #[arg(short, long, default_value = "0.05")]
    pub alpha: f64,

    #[arg(long, value_name = "RATIO", default_value = "0.5")]
    pub min_coverage: f64,

    /// Smaller scores are better (errors, times, NLL)
    #[arg(long)]
    pub lower_is_better: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// summary.json written by `foldstat collate`
    #[arg(value_name = "FILE")]
    pub summary: PathBuf,
}
