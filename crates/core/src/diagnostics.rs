//! Run-level diagnostics.
//!
//! Problems that affect only a subset of rows (unexpected product codes,
//! reference rows without a counterpart) never stop the pipeline. They are
//! collected here and written out alongside the analysis results.

use serde::ser::SerializeStruct;
use crate::table::TradeFlow;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Category of a row-level data-quality problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Product code neither 5 nor 6 characters long. Row excluded.
    UnexpectedProductCodeLength,
    /// Product code contains non-digit characters. Row excluded.
    NonNumericProductCode,
    /// Reporter column disagrees with the file's reporter. Row kept.
    ReporterMismatch,
    /// Year column disagrees with the file's year. Row kept.
    YearMismatch,
    /// Free-text column was not valid UTF-8 and was decoded lossily. Row kept.
    InvalidTextEncoding,
}

/// A single row-level data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    /// File (or table) the row came from
    pub source: String,
    /// 1-based line number within the source
    pub line: u64,
    pub kind: WarningKind,
    pub detail: String,
}

/// Per-file ingestion counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub source: String,
    /// Data rows read (header excluded)
    pub rows_read: usize,
    /// Rows whose partner was the world aggregate
    pub world_rows_dropped: usize,
    /// 5-digit product codes restored to 6 digits
    pub codes_padded: usize,
    /// Rows excluded because of an anomalous product code
    pub anomalous_rows_dropped: usize,
    /// Rows emitted to the panel
    pub rows_kept: usize,
}

/// Outcome of a many-to-one left join.
///
/// Serializes with a derived `match_rate` field next to the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatchStats {
    pub primary_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub reference_rows: usize,
    /// Reference rows no primary row referred to; excluded from the output
    pub reference_rows_unused: usize,
}

impl MatchStats {
    /// Fraction of primary rows that found a reference row, in `[0, 1]`.
    ///
    /// An empty primary table has a match rate of zero.
    #[must_use]
    pub fn match_rate(&self) -> f64 {
        if self.primary_rows == 0 {
            0.0
        } else {
            self.matched_rows as f64 / self.primary_rows as f64
        }
    }
}

impl Serialize for MatchStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MatchStats", 6)?;
        state.serialize_field("primary_rows", &self.primary_rows)?;
        state.serialize_field("matched_rows", &self.matched_rows)?;
        state.serialize_field("unmatched_rows", &self.unmatched_rows)?;
        state.serialize_field("match_rate", &self.match_rate())?;
        state.serialize_field("reference_rows", &self.reference_rows)?;
        state.serialize_field("reference_rows_unused", &self.reference_rows_unused)?;
        state.end()
    }
}

/// Sample accounting for one regression input table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Sector-level rows before exclusion
    pub candidate_rows: usize,
    /// Rows without GDP data
    pub missing_gdp: usize,
    /// Rows without gravity data
    pub missing_gravity: usize,
    /// Rows carried into estimation
    pub usable_rows: usize,
}

/// A model that could not be estimated on its flow's sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModel {
    /// `baseline` or `fixed_effects`
    pub model: String,
    pub dependent: String,
    pub flow: TradeFlow,
    pub reason: String,
}

/// Everything the run reports about data quality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub files: Vec<LoadStats>,
    pub warnings: Vec<DataQualityWarning>,
    /// Join statistics keyed by reference table name
    pub joins: BTreeMap<String, MatchStats>,
    pub regression_sample: SampleStats,
    #[serde(default)]
    pub skipped_models: Vec<SkippedModel>,
}

impl RunDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a loaded file's counters and warnings.
    pub fn record_load(&mut self, stats: LoadStats, warnings: Vec<DataQualityWarning>) {
        self.files.push(stats);
        self.warnings.extend(warnings);
    }

    /// Records a join's match statistics under `name`.
    pub fn record_join(&mut self, name: &str, stats: MatchStats) {
        self.joins.insert(name.to_string(), stats);
    }

    /// Records a model left out of the regression tables.
    pub fn record_skipped_model(&mut self, skipped: SkippedModel) {
        self.skipped_models.push(skipped);
    }

    /// Warning counts by kind.
    #[must_use]
    pub fn warning_counts(&self) -> BTreeMap<WarningKind, usize> {
        let mut counts = BTreeMap::new();
        for w in &self.warnings {
            *counts.entry(w.kind).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn total_rows_read(&self) -> usize {
        self.files.iter().map(|f| f.rows_read).sum()
    }

    #[must_use]
    pub fn total_rows_kept(&self) -> usize {
        self.files.iter().map(|f| f.rows_kept).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_rate_bounds() {
        let empty = MatchStats::default();
        assert_eq!(empty.match_rate(), 0.0);

        let stats = MatchStats {
            primary_rows: 4,
            matched_rows: 3,
            unmatched_rows: 1,
            reference_rows: 10,
            reference_rows_unused: 7,
        };
        assert!((stats.match_rate() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_warning_counts_group_by_kind() {
        let mut diag = RunDiagnostics::new();
        let warn = |kind| DataQualityWarning {
            source: "ROM_2011.csv".to_string(),
            line: 2,
            kind,
            detail: String::new(),
        };
        diag.record_load(
            LoadStats {
                source: "ROM_2011.csv".to_string(),
                rows_read: 5,
                rows_kept: 3,
                ..LoadStats::default()
            },
            vec![
                warn(WarningKind::UnexpectedProductCodeLength),
                warn(WarningKind::UnexpectedProductCodeLength),
                warn(WarningKind::YearMismatch),
            ],
        );

        let counts = diag.warning_counts();
        assert_eq!(counts[&WarningKind::UnexpectedProductCodeLength], 2);
        assert_eq!(counts[&WarningKind::YearMismatch], 1);
        assert_eq!(diag.total_rows_read(), 5);
        assert_eq!(diag.total_rows_kept(), 3);
    }

    #[test]
    fn test_diagnostics_serialize_to_json() {
        let mut diag = RunDiagnostics::new();
        diag.record_join("gdp", MatchStats::default());
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"gdp\""));
    }

    #[test]
    fn test_match_rate_is_serialized_and_read_back() {
        let stats = MatchStats {
            primary_rows: 4,
            matched_rows: 3,
            unmatched_rows: 1,
            reference_rows: 5,
            reference_rows_unused: 2,
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["match_rate"], serde_json::json!(0.75));
        assert_eq!(value["unmatched_rows"], serde_json::json!(1));

        let back: MatchStats = serde_json::from_value(value).unwrap();
        assert_eq!(back, stats);
    }
}
