//! Descriptive statistics only.
//!
//! Builds the panel and prints the summary view; no reference data is read
//! and nothing is estimated.

use super::ConfigArgs;
use anyhow::{Context, Result};
use clap::Args;
use tradeflow_analysis::{views, Pipeline};
use tradeflow_core::{DiagnosticsFormatter, ReportTable, RunDiagnostics};

/// Arguments for the summary command.
#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Also print ingestion diagnostics
    #[arg(long)]
    pub diagnostics: bool,
}

/// Runs the summary command.
///
/// # Errors
/// Returns an error if the config is invalid or an extract cannot be loaded.
pub fn run_summary(args: &SummaryArgs) -> Result<()> {
    let config = args.config.load()?;
    let mut diagnostics = RunDiagnostics::new();

    let panel = Pipeline::new(&config)
        .load_panel(&mut diagnostics)
        .context("Failed to build panel")?;
    let summary = views::summary_statistics(panel.records())?;

    println!("{}", render_table(&summary));
    if args.diagnostics {
        println!("{}", DiagnosticsFormatter::format(&diagnostics));
    }
    Ok(())
}

/// Renders a report table as left-aligned text columns.
#[must_use]
pub fn render_table(table: &ReportTable) -> String {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            table
                .rows
                .iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(&table.columns)];
    lines.push("-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    lines.extend(table.rows.iter().map(|row| line(row)));
    lines.join("\n")
}
