//! Full analysis run.
//!
//! Loads the configured extracts and reference tables, runs every stage and
//! writes the report CSVs plus `diagnostics.json` to the output directory.

use super::ConfigArgs;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tradeflow_analysis::{Pipeline, PipelineOutput};
use tradeflow_core::{AnalysisConfig, DiagnosticsFormatter};
use tradeflow_data::CsvStorage;

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Overrides the configured output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Runs the run command.
///
/// # Errors
/// Returns an error if configuration, any pipeline stage, or writing an
/// artifact fails.
pub fn run_analysis(args: &RunArgs) -> Result<()> {
    let mut config = args.config.load()?;
    if let Some(dir) = &args.output_dir {
        config.outputs.dir.clone_from(dir);
    }

    tracing::info!(
        countries = ?config.inputs.countries,
        years = ?config.inputs.years,
        "Starting analysis run"
    );

    let output = Pipeline::new(&config).run().context("Analysis pipeline failed")?;
    let written = write_outputs(&config, &output)?;

    println!("{}", DiagnosticsFormatter::format(&output.diagnostics));
    for path in &written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// Writes every report table and the diagnostics file.
///
/// # Errors
/// Returns an error if a file cannot be written.
pub fn write_outputs(config: &AnalysisConfig, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
    let outputs = &config.outputs;
    let mut written = Vec::new();

    for (file, table) in output.reports(outputs) {
        let path = outputs.path(file);
        CsvStorage::write_table(&path, table)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "report written");
        written.push(path);
    }

    let diagnostics_path = outputs.path(&outputs.diagnostics_file);
    CsvStorage::write_json(&diagnostics_path, &output.diagnostics)?;
    written.push(diagnostics_path);

    tracing::info!(files = written.len(), dir = %outputs.dir.display(), "Artifacts written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow_analysis::PanelViews;
    use tradeflow_core::{ReportTable, RunDiagnostics};

    fn table(name: &str) -> ReportTable {
        let mut t = ReportTable::new(name, vec!["a".to_string()]);
        t.push_row(vec!["1".to_string()]);
        t
    }

    #[test]
    fn test_write_outputs_creates_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.outputs.dir = dir.path().join("reports");

        let output = PipelineOutput {
            views: PanelViews {
                summary: table("summary"),
                top_partners: table("top_partners"),
                top_products: table("top_products"),
                export_shares: table("export_shares"),
                sector_shares: table("sector_shares"),
            },
            fits: Vec::new(),
            baseline_table: table("baseline"),
            fixed_effects_table: table("fixed_effects"),
            diagnostics: RunDiagnostics::new(),
        };

        let written = write_outputs(&config, &output).unwrap();
        assert_eq!(written.len(), 8);
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }
        let summary = std::fs::read_to_string(config.outputs.path("summary_statistics.csv")).unwrap();
        assert_eq!(summary, "a\n1\n");
        assert!(written
            .last()
            .is_some_and(|p| p.ends_with("diagnostics.json")));
    }
}
