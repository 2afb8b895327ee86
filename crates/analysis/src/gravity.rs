//! Gravity-model estimation sample.
//!
//! The panel is enriched with partner GDP (joined on partner and year) and
//! bilateral gravity variables (joined on reporter and partner), collapsed
//! to sector grain and log-transformed into [`RegressionInput`] rows.

use crate::aggregate::{aggregate, AggregateRow, Reduction, ReductionSpec};
use crate::error::Result;
use crate::merge::left_join;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tradeflow_core::{checked_ln, Field, KeyValue, MatchStats, Record, SampleStats, TradeFlow};
use tradeflow_data::{GdpRecord, GravityRecord, TradeRecord, TRADE_VALUE};

pub const GDP: &str = "gdp";
pub const DISTANCE: &str = "distance";
pub const COMMON_LANGUAGE: &str = "common_language";
pub const PRODUCT_COUNT: &str = "product_count";

/// Grain of the estimation sample.
pub const SECTOR_GRAIN: [Field; 5] = [
    Field::Reporter,
    Field::Partner,
    Field::Sector,
    Field::Year,
    Field::Flow,
];

/// A panel row with its joined reference values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord<'a> {
    pub trade: &'a TradeRecord,
    pub gdp: Option<f64>,
    pub distance: Option<f64>,
    pub common_language: Option<bool>,
}

impl Record for EnrichedRecord<'_> {
    fn key(&self, field: Field) -> Option<KeyValue> {
        self.trade.key(field)
    }

    fn metric(&self, name: &str) -> Option<f64> {
        match name {
            TRADE_VALUE => self.trade.metric(name),
            GDP => self.gdp,
            DISTANCE => self.distance,
            COMMON_LANGUAGE => self.common_language.map(f64::from),
            _ => None,
        }
    }

    fn has_metric(&self, name: &str) -> bool {
        matches!(name, TRADE_VALUE | GDP | DISTANCE | COMMON_LANGUAGE)
    }
}

/// Enriched panel rows plus the statistics of both joins.
#[derive(Debug, Clone)]
pub struct Enrichment<'a> {
    /// One row per panel record, in panel order
    pub rows: Vec<EnrichedRecord<'a>>,
    pub gdp: MatchStats,
    pub gravity: MatchStats,
}

/// Left-joins GDP and gravity data onto the panel.
///
/// # Errors
///
/// Returns `DuplicateReferenceKey` if either reference table repeats a key.
pub fn enrich<'a>(
    panel: &'a [TradeRecord],
    gdp: &'a [GdpRecord],
    gravity: &'a [GravityRecord],
) -> Result<Enrichment<'a>> {
    let gdp_join = left_join("gdp", panel, &[Field::Partner, Field::Year], gdp, |g| {
        vec![KeyValue::from(g.country.as_str()), KeyValue::Year(g.year)]
    })?;
    let gravity_join = left_join(
        "gravity",
        panel,
        &[Field::Reporter, Field::Partner],
        gravity,
        |g| {
            vec![
                KeyValue::from(g.origin.as_str()),
                KeyValue::from(g.destination.as_str()),
            ]
        },
    )?;

    let rows = gdp_join
        .rows
        .iter()
        .zip(&gravity_join.rows)
        .map(|(g, d)| EnrichedRecord {
            trade: g.primary,
            gdp: g.reference.and_then(|r| r.gdp),
            distance: d.reference.and_then(|r| r.distance),
            common_language: d.reference.and_then(GravityRecord::shares_language),
        })
        .collect();

    Ok(Enrichment {
        rows,
        gdp: gdp_join.stats,
        gravity: gravity_join.stats,
    })
}

/// Collapses enriched rows to (reporter, partner, sector, year, flow).
///
/// Trade value is summed, distinct HS-6 products are counted and the
/// reference values, constant within a group, are carried through.
///
/// # Errors
///
/// Propagates aggregation errors.
pub fn collapse_to_sectors(rows: &[EnrichedRecord<'_>]) -> Result<Vec<AggregateRow>> {
    aggregate(
        rows,
        |_| true,
        &SECTOR_GRAIN,
        &[
            ReductionSpec::sum(TRADE_VALUE, TRADE_VALUE),
            ReductionSpec::count_distinct(PRODUCT_COUNT, Field::Product),
            ReductionSpec::mean(GDP, GDP),
            ReductionSpec::mean(DISTANCE, DISTANCE),
            ReductionSpec::metric(COMMON_LANGUAGE, COMMON_LANGUAGE, Reduction::Max),
        ],
    )
}

/// One observation of the gravity regressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionInput {
    pub reporter: String,
    pub partner: String,
    /// HS-2 sector
    pub sector: String,
    pub year: i32,
    pub flow: TradeFlow,
    pub trade_value: f64,
    /// Distinct HS-6 products traded in the sector
    pub product_count: f64,
    pub gdp: f64,
    pub distance: f64,
    pub common_language: bool,
    pub ln_trade_value: f64,
    pub ln_product_count: f64,
    pub ln_gdp: f64,
    pub ln_distance: f64,
}

impl Record for RegressionInput {
    fn key(&self, field: Field) -> Option<KeyValue> {
        match field {
            Field::Reporter => Some(KeyValue::from(self.reporter.as_str())),
            Field::Partner => Some(KeyValue::from(self.partner.as_str())),
            Field::Sector => Some(KeyValue::from(self.sector.as_str())),
            Field::Year => Some(KeyValue::Year(self.year)),
            Field::Flow => Some(KeyValue::Flow(self.flow)),
            Field::Product | Field::PartnerName => None,
        }
    }

    fn metric(&self, name: &str) -> Option<f64> {
        Some(match name {
            "ln_trade_value" => self.ln_trade_value,
            "ln_product_count" => self.ln_product_count,
            "ln_gdp" => self.ln_gdp,
            "ln_distance" => self.ln_distance,
            COMMON_LANGUAGE => f64::from(self.common_language),
            TRADE_VALUE => self.trade_value,
            PRODUCT_COUNT => self.product_count,
            GDP => self.gdp,
            DISTANCE => self.distance,
            _ => return None,
        })
    }

    fn has_metric(&self, name: &str) -> bool {
        self.metric(name).is_some()
    }
}

/// Builds the estimation sample from sector-level rows.
///
/// Rows without GDP or without gravity data are excluded and counted (a row
/// missing both counts against both).
///
/// # Errors
///
/// Returns `Domain` if a value to be logged is zero or negative; that is a
/// contract violation upstream, not a row to skip.
pub fn build_regression_input(
    collapsed: &[AggregateRow],
) -> Result<(Vec<RegressionInput>, SampleStats)> {
    let mut stats = SampleStats {
        candidate_rows: collapsed.len(),
        ..SampleStats::default()
    };
    let mut out = Vec::with_capacity(collapsed.len());

    for row in collapsed {
        let gdp = row.metric(GDP);
        let distance = row.metric(DISTANCE);
        let language = row.metric(COMMON_LANGUAGE);
        if gdp.is_none() {
            stats.missing_gdp += 1;
        }
        if distance.is_none() || language.is_none() {
            stats.missing_gravity += 1;
        }
        let (Some(gdp), Some(distance), Some(language)) = (gdp, distance, language) else {
            continue;
        };

        let trade_value = row.value(TRADE_VALUE);
        let product_count = row.value(PRODUCT_COUNT);
        out.push(RegressionInput {
            reporter: row.key_text(Field::Reporter),
            partner: row.key_text(Field::Partner),
            sector: row.key_text(Field::Sector),
            year: row
                .key_value(Field::Year)
                .and_then(KeyValue::as_year)
                .unwrap_or_default(),
            flow: row
                .key_value(Field::Flow)
                .and_then(KeyValue::as_flow)
                .unwrap_or(TradeFlow::Import),
            trade_value,
            product_count,
            gdp,
            distance,
            common_language: language > 0.0,
            ln_trade_value: checked_ln(TRADE_VALUE, trade_value)?,
            ln_product_count: checked_ln(PRODUCT_COUNT, product_count)?,
            ln_gdp: checked_ln(GDP, gdp)?,
            ln_distance: checked_ln(DISTANCE, distance)?,
        });
    }

    stats.usable_rows = out.len();
    if stats.usable_rows < stats.candidate_rows {
        warn!(
            candidates = stats.candidate_rows,
            missing_gdp = stats.missing_gdp,
            missing_gravity = stats.missing_gravity,
            "rows excluded from the regression sample"
        );
    }
    info!(rows = stats.usable_rows, "regression sample built");
    Ok((out, stats))
}
