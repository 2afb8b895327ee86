//! Table transforms and gravity regressions over the trade panel.
//!
//! This crate provides:
//! - A generic group-by/reduce engine and within-partition ranking
//! - Many-to-one reference joins with match statistics
//! - OLS with dummy-variable fixed effects and HC1 standard errors
//! - The descriptive views and the end-to-end pipeline

pub mod aggregate;
pub mod error;
pub mod gravity;
pub mod merge;
pub mod pipeline;
pub mod rank;
pub mod regression;
pub mod views;

pub use aggregate::{aggregate, AggregateRow, Reduction, ReductionSpec, Source};
pub use error::{AnalysisError, Result};
pub use gravity::{EnrichedRecord, RegressionInput};
pub use merge::{left_join, JoinOutput, Joined};
pub use pipeline::{FittedModel, PanelViews, Pipeline, PipelineOutput};
pub use rank::{rank_within, top_n, RankOrder, RankedRow};
pub use regression::{fit_ols, Coefficient, ModelSpec, RegressionResult};
