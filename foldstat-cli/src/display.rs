//! Colored terminal summary of a collation run.

use std::io::Write;

use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use foldstat::collate::{CollationReport, StatisticComparison};

pub fn print_report<W: Write>(out: &mut W, report: &CollationReport) -> std::io::Result<()> {
    let expected = report.classifiers.len() * report.datasets.len() * report.folds;
    let loaded: usize = report.counts.iter().flatten().sum();

    execute!(
        out,
        SetForegroundColor(Color::Cyan),
        Print(format!(
            "\n{} classifiers x {} datasets x {} folds\n",
            report.classifiers.len(),
            report.datasets.len(),
            report.folds
        )),
        ResetColor,
        Print(format!("  loaded {loaded}/{expected} test folds")),
    )?;
    if report.missing_folds > 0 || report.corrupt_folds > 0 {
        execute!(
            out,
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "  ({} missing, {} corrupt)",
                report.missing_folds, report.corrupt_folds
            )),
            ResetColor,
        )?;
    }
    if report.train_failures > 0 {
        execute!(
            out,
            SetForegroundColor(Color::Yellow),
            Print(format!("\n  {} train folds unusable", report.train_failures)),
            ResetColor,
        )?;
    }
    execute!(
        out,
        Print(format!(
            "\n  alpha {} (adjusted {:.4})\n",
            report.alpha, report.adjusted_alpha
        ))
    )?;

    for comparison in &report.comparisons {
        print_comparison(out, comparison)?;
    }
    Ok(())
}

/// Ranking, cliques and unreliable pairs of one statistic.
pub fn print_comparison<W: Write>(out: &mut W, cmp: &StatisticComparison) -> std::io::Result<()> {
    execute!(
        out,
        SetForegroundColor(Color::Magenta),
        Print(format!("\n--- {} ---\n", cmp.statistic)),
        ResetColor,
    )?;

    let width = cmp.classifiers.iter().map(String::len).max().unwrap_or(0);
    for (place, &c) in cmp.rank_order.iter().enumerate() {
        let rank = cmp.average_ranks[c]
            .map(|r| format!("{r:.3}"))
            .unwrap_or_else(|| "-".into());
        let color = if place == 0 { Color::Green } else { Color::White };
        execute!(
            out,
            Print(format!("  {:>2}. ", place + 1)),
            SetForegroundColor(color),
            Print(format!("{:<width$}", cmp.classifiers[c])),
            ResetColor,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("  avg rank {rank}\n")),
            ResetColor,
        )?;
    }

    if cmp.cliques.is_empty() {
        execute!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print("  no cliques\n"),
            ResetColor
        )?;
    }
    for (i, clique) in cmp.cliques.iter().enumerate() {
        execute!(
            out,
            SetForegroundColor(Color::Blue),
            Print(format!("  clique {}: ", i + 1)),
            ResetColor,
            Print(format!("{}\n", clique.members.join(", "))),
        )?;
    }

    for pair in cmp.unreliable() {
        execute!(
            out,
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "  warning: {} vs {} only {} of {} datasets fully covered\n",
                pair.first,
                pair.second,
                cmp.datasets - pair.partial_datasets,
                cmp.datasets
            )),
            ResetColor,
        )?;
    }
    Ok(())
}
