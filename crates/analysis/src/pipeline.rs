//! End-to-end batch run.
//!
//! Loader -> panel -> descriptive views -> reference merge -> sector
//! collapse -> regressions. Every stage materialises its output before the
//! next one starts and any fatal error aborts the run. A model whose flow
//! sample cannot identify it is skipped and reported in diagnostics; the
//! descriptive views and the other models are still produced.

use crate::error::{AnalysisError, Result};
use crate::gravity::{build_regression_input, collapse_to_sectors, enrich, RegressionInput};
use crate::regression::{fit_ols, ModelSpec, RegressionResult};
use crate::views;
use serde::Serialize;
use tracing::{info, warn};
use tradeflow_core::{
    AnalysisConfig, Field, OutputConfig, ReportTable, RunDiagnostics, SkippedModel, TradeFlow,
};
use tradeflow_data::{load_extracts, Panel, ReferenceLoader};

/// One estimated model, keyed by flow and specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedModel {
    pub flow: TradeFlow,
    /// `baseline` or `fixed_effects`
    pub specification: String,
    pub result: RegressionResult,
}

/// Descriptive views of the panel.
#[derive(Debug, Clone, Default)]
pub struct PanelViews {
    pub summary: ReportTable,
    pub top_partners: ReportTable,
    pub top_products: ReportTable,
    pub export_shares: ReportTable,
    pub sector_shares: ReportTable,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub views: PanelViews,
    pub fits: Vec<FittedModel>,
    pub baseline_table: ReportTable,
    pub fixed_effects_table: ReportTable,
    pub diagnostics: RunDiagnostics,
}

impl PipelineOutput {
    /// Report tables paired with their configured file names.
    #[must_use]
    pub fn reports<'a>(&'a self, outputs: &'a OutputConfig) -> Vec<(&'a str, &'a ReportTable)> {
        vec![
            (outputs.summary_file.as_str(), &self.views.summary),
            (outputs.top_partners_file.as_str(), &self.views.top_partners),
            (outputs.top_products_file.as_str(), &self.views.top_products),
            (outputs.export_shares_file.as_str(), &self.views.export_shares),
            (outputs.sector_shares_file.as_str(), &self.views.sector_shares),
            (outputs.baseline_file.as_str(), &self.baseline_table),
            (outputs.fixed_effects_file.as_str(), &self.fixed_effects_table),
        ]
    }

    /// Fits of one specification, in dependent-then-flow order.
    #[must_use]
    pub fn fits_for(&self, specification: &str) -> Vec<(TradeFlow, &RegressionResult)> {
        self.fits
            .iter()
            .filter(|f| f.specification == specification)
            .map(|f| (f.flow, &f.result))
            .collect()
    }
}

pub struct Pipeline<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Loads every configured extract and builds the canonical panel.
    ///
    /// # Errors
    ///
    /// Returns `Parse` on the first unreadable extract and `EmptyPanel` if
    /// nothing survives loading.
    pub fn load_panel(&self, diagnostics: &mut RunDiagnostics) -> Result<Panel> {
        let inputs = &self.config.inputs;
        let extracts = load_extracts(&inputs.extracts(), |reporter, year| {
            inputs.trade_file(reporter, year)
        })?;
        let (panel, bookkeeping) = Panel::from_extracts(extracts);
        for (stats, warnings) in bookkeeping {
            diagnostics.record_load(stats, warnings);
        }
        if panel.is_empty() {
            return Err(AnalysisError::EmptyPanel);
        }
        Ok(panel)
    }

    /// Summary statistics, top partners/products and export shares.
    ///
    /// # Errors
    ///
    /// Propagates aggregation and ranking errors.
    pub fn panel_views(&self, panel: &Panel) -> Result<PanelViews> {
        let n = self.config.analysis.top_n;
        let records = panel.records();
        Ok(PanelViews {
            summary: views::summary_statistics(records)?,
            top_partners: views::top_partners(records, n)?,
            top_products: views::top_products(records, n)?,
            export_shares: views::export_shares(records, Field::Partner, n)?,
            sector_shares: views::export_shares(records, Field::Sector, n)?,
        })
    }

    /// Merges reference data onto the panel and builds the estimation
    /// sample, recording join and sample statistics.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if a reference table cannot be read,
    /// `DuplicateReferenceKey` if one repeats a key, and `Domain` if a
    /// logged value is not positive.
    pub fn regression_sample(
        &self,
        panel: &Panel,
        diagnostics: &mut RunDiagnostics,
    ) -> Result<Vec<RegressionInput>> {
        let inputs = &self.config.inputs;
        let canonical = |code: &str| inputs.canonical_country(code).to_string();
        let gdp = ReferenceLoader::load_gdp(&inputs.gdp_file, canonical)?;
        let gravity = ReferenceLoader::load_gravity(&inputs.gravity_file, canonical)?;

        let enriched = enrich(panel.records(), &gdp, &gravity)?;
        diagnostics.record_join("gdp", enriched.gdp.clone());
        diagnostics.record_join("gravity", enriched.gravity.clone());

        let collapsed = collapse_to_sectors(&enriched.rows)?;
        let (sample, stats) = build_regression_input(&collapsed)?;
        diagnostics.regression_sample = stats;
        Ok(sample)
    }

    /// Fits every configured dependent under both specifications, once per
    /// flow.
    ///
    /// Models with too few observations or a singular design are skipped and
    /// recorded in `diagnostics`.
    ///
    /// # Errors
    ///
    /// Propagates any other estimation failure.
    pub fn estimate(
        &self,
        sample: &[RegressionInput],
        diagnostics: &mut RunDiagnostics,
    ) -> Result<Vec<FittedModel>> {
        let settings = &self.config.analysis;
        let mut fits = Vec::new();

        for dependent in &settings.dependents {
            let specs = [
                ModelSpec::baseline(dependent, settings.robust),
                ModelSpec::fixed_effects(dependent, &settings.fixed_effects, settings.robust),
            ];
            for spec in specs {
                for flow in TradeFlow::ALL {
                    let rows: Vec<&RegressionInput> =
                        sample.iter().filter(|r| r.flow == flow).collect();
                    let result = match fit_ols(&rows, &spec) {
                        Ok(result) => result,
                        Err(
                            err @ (AnalysisError::InsufficientObservations { .. }
                            | AnalysisError::Singular { .. }),
                        ) => {
                            warn!(
                                model = %spec.name,
                                dependent = %dependent,
                                %flow,
                                error = %err,
                                "model skipped"
                            );
                            diagnostics.record_skipped_model(SkippedModel {
                                model: spec.name.clone(),
                                dependent: dependent.clone(),
                                flow,
                                reason: err.to_string(),
                            });
                            continue;
                        }
                        Err(err) => return Err(err),
                    };
                    fits.push(FittedModel {
                        flow,
                        specification: spec.name.clone(),
                        result,
                    });
                }
            }
        }
        Ok(fits)
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of any stage.
    pub fn run(&self) -> Result<PipelineOutput> {
        let mut diagnostics = RunDiagnostics::new();

        let panel = self.load_panel(&mut diagnostics)?;
        let views = self.panel_views(&panel)?;
        let sample = self.regression_sample(&panel, &mut diagnostics)?;
        let fits = self.estimate(&sample, &mut diagnostics)?;

        let mut output = PipelineOutput {
            views,
            fits,
            baseline_table: ReportTable::default(),
            fixed_effects_table: ReportTable::default(),
            diagnostics,
        };
        output.baseline_table =
            views::regression_table("regression_baseline", &output.fits_for("baseline"));
        output.fixed_effects_table =
            views::regression_table("regression_fixed_effects", &output.fits_for("fixed_effects"));

        info!(
            panel_rows = panel.len(),
            sample_rows = sample.len(),
            models = output.fits.len(),
            skipped = output.diagnostics.skipped_models.len(),
            warnings = output.diagnostics.warnings.len(),
            "pipeline complete"
        );
        Ok(output)
    }
}
