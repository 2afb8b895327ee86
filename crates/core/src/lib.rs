//! Core types for the trade panel analysis.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - The error taxonomy and run diagnostics
//! - Key/field primitives and the `Record` trait every table transform uses
//! - The report table handed to the output layer

pub mod config;
pub mod config_loader;
pub mod diagnostics;
pub mod error;
pub mod metrics_formatter;
pub mod report;
pub mod table;
pub mod traits;

pub use config::{AnalysisConfig, AnalysisSettings, InputConfig, OutputConfig, DEPENDENT_VARIABLES};
pub use config_loader::ConfigLoader;
pub use diagnostics::{
    DataQualityWarning, LoadStats, MatchStats, RunDiagnostics, SampleStats, SkippedModel,
    WarningKind,
};
pub use error::{checked_ln, ConfigError, DomainError, ParseError};
pub use metrics_formatter::DiagnosticsFormatter;
pub use report::{format_number, ReportTable};
pub use table::{Field, KeyValue, TradeFlow};
pub use traits::Record;
