//! CLI commands for the trade panel analysis.

pub mod check;
pub mod run;
pub mod summary;

pub use check::{run_check, CheckArgs};
pub use run::{run_analysis, RunArgs};
pub use summary::{run_summary, SummaryArgs};

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tradeflow_core::{AnalysisConfig, ConfigLoader};

/// Configuration arguments shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml", env = "TRADEFLOW_CONFIG")]
    pub config: PathBuf,

    /// Directory that relative input/output paths are resolved against
    #[arg(long)]
    pub data_root: Option<PathBuf>,
}

impl ConfigArgs {
    /// Loads and validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load(&self) -> Result<AnalysisConfig> {
        let config = ConfigLoader::load(&self.config)
            .with_context(|| format!("Failed to load config: {}", self.config.display()))?;
        Ok(match &self.data_root {
            Some(root) => config.rebased(root),
            None => config,
        })
    }
}
