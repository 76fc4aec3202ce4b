use std::io::stdout;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foldstat::collate::{compare_table, CollationReport, Collator};

mod cli;
mod display;

use cli::{Cli, Command, PairwiseArgs};

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    match args.command {
        Command::Collate(collate) => {
            let config = collate.into_config()?;
            info!(
                classifiers = config.classifiers.len(),
                folds = config.folds,
                output = %config.output_path.display(),
                "starting collation"
            );
            let report = Collator::new(config)?.run()?;
            display::print_report(&mut stdout(), &report)?;
        }
        Command::Pairwise(pairwise) => run_pairwise(&pairwise)?,
        Command::Show(show) => {
            let report = CollationReport::load(&show.summary)
                .with_context(|| format!("reading {}", show.summary.display()))?;
            display::print_report(&mut stdout(), &report)?;
        }
    }
    Ok(())
}

fn run_pairwise(args: &PairwiseArgs) -> Result<()> {
    let cmp = compare_table(&args.table, args.alpha, args.min_coverage, !args.lower_is_better)
        .with_context(|| format!("comparing scores in {}", args.table.display()))?;

    for pair in &cmp.pairs {
        let p = pair.tests.p_values();
        println!(
            "{} vs {}: {}/{}/{} (p = {:.4})  t {}  sign {}  sign-rank {}{}",
            pair.first,
            pair.second,
            pair.wins,
            pair.draws,
            pair.losses,
            pair.win_loss_p_value,
            fmt_p(p.map(|p| p.t_test)),
            fmt_p(p.map(|p| p.sign_test)),
            fmt_p(p.map(|p| p.sign_rank_test)),
            if pair.significant { "  *" } else { "" },
        );
    }

    println!();
    print!("{:>12}", "");
    for name in &cmp.classifiers {
        print!(" {name:>12}");
    }
    println!();
    for (name, row) in cmp.classifiers.iter().zip(&cmp.no_difference) {
        print!("{name:>12}");
        for &same in row {
            print!(" {:>12}", u8::from(same));
        }
        println!();
    }

    display::print_comparison(&mut stdout(), &cmp)?;
    Ok(())
}

fn fmt_p(p: Option<f64>) -> String {
    p.map(|p| format!("{p:.4}")).unwrap_or_else(|| "n/a".into())
}
