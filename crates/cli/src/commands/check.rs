//! Configuration and input check.
//!
//! Validates the config and reports which extracts and reference tables
//! are present, without reading them.

use super::ConfigArgs;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use tradeflow_core::AnalysisConfig;

/// Arguments for the check command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// One expected input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputStatus {
    pub label: String,
    pub path: PathBuf,
    pub exists: bool,
}

/// Every input the run would open, in load order.
#[must_use]
pub fn input_status(config: &AnalysisConfig) -> Vec<InputStatus> {
    let inputs = &config.inputs;
    let mut files: Vec<(String, PathBuf)> = inputs
        .extracts()
        .into_iter()
        .map(|(reporter, year)| {
            let path = inputs.trade_file(&reporter, year);
            (format!("{reporter} {year}"), path)
        })
        .collect();
    files.push(("GDP".to_string(), inputs.gdp_file.clone()));
    files.push(("gravity".to_string(), inputs.gravity_file.clone()));

    files
        .into_iter()
        .map(|(label, path)| {
            let exists = path.is_file();
            InputStatus {
                label,
                path,
                exists,
            }
        })
        .collect()
}

/// Runs the check command.
///
/// # Errors
/// Returns an error if the config is invalid or any input file is missing.
pub fn run_check(args: &CheckArgs) -> Result<()> {
    let config = args.config.load()?;
    println!("Config OK: {}", args.config.config.display());
    println!(
        "  {} countries x {} years, top {}, robust SEs: {}",
        config.inputs.countries.len(),
        config.inputs.years.len(),
        config.analysis.top_n,
        config.analysis.robust
    );

    let status = input_status(&config);
    let missing = status.iter().filter(|s| !s.exists).count();
    for s in &status {
        let mark = if s.exists { "ok" } else { "MISSING" };
        println!("  {:<10} {:<8} {}", s.label, mark, s.path.display());
    }

    if missing > 0 {
        tracing::warn!(missing, "input files missing");
        bail!("{missing} of {} input files missing", status.len());
    }
    println!("All {} input files present", status.len());
    Ok(())
}
