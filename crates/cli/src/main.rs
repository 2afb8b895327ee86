use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{CheckArgs, RunArgs, SummaryArgs};

#[derive(Parser)]
#[command(name = "tradeflow")]
#[command(about = "Trade panel analysis: descriptive views and gravity regressions", long_about = None)]
struct Cli {
    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true, env = "TRADEFLOW_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write every report
    Run(RunArgs),
    /// Validate the configuration and list missing input files
    Check(CheckArgs),
    /// Build the panel and print descriptive statistics
    Summary(SummaryArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Run(args) => commands::run_analysis(&args)?,
        Commands::Check(args) => commands::run_check(&args)?,
        Commands::Summary(args) => commands::run_summary(&args)?,
    }

    Ok(())
}
