//! Group-by / reduce engine.
//!
//! `aggregate` filters a table, groups it by an ordered key tuple and
//! reduces each group to one [`AggregateRow`]. Keys are only ever taken
//! from rows that exist, so every output group has at least one input row.
//!
//! Missing metric values are skipped by every reduction, mirroring how a
//! statistics package treats missing observations. Reductions that are
//! undefined for the data they receive (the standard deviation of a single
//! value, the mean of no values) yield `NaN`.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tradeflow_core::{Field, KeyValue, Record};

/// How a group's values are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    /// Number of non-missing values (or rows, for a field source)
    Count,
    Mean,
    Median,
    /// Sample standard deviation (n - 1 denominator)
    StdDev,
    Min,
    Max,
    /// First non-missing value in input order
    First,
    /// Number of distinct values of a key field
    CountDistinct,
}

/// Column a reduction reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Metric(String),
    Field(Field),
}

/// One output column of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionSpec {
    pub output: String,
    pub source: Source,
    pub op: Reduction,
}

impl ReductionSpec {
    /// Reduces a metric column.
    pub fn metric(output: impl Into<String>, metric: impl Into<String>, op: Reduction) -> Self {
        Self {
            output: output.into(),
            source: Source::Metric(metric.into()),
            op,
        }
    }

    pub fn sum(output: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::metric(output, metric, Reduction::Sum)
    }

    pub fn mean(output: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::metric(output, metric, Reduction::Mean)
    }

    /// Counts distinct values of `field` within each group.
    pub fn count_distinct(output: impl Into<String>, field: Field) -> Self {
        Self {
            output: output.into(),
            source: Source::Field(field),
            op: Reduction::CountDistinct,
        }
    }
}

/// One group of an aggregation: its key tuple and reduced values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub keys: Vec<(Field, KeyValue)>,
    pub values: BTreeMap<String, f64>,
}

impl AggregateRow {
    /// Reduced value by output name; `NaN` if absent.
    #[must_use]
    pub fn value(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn key_value(&self, field: Field) -> Option<&KeyValue> {
        self.keys.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// Text form of a key, for reporting.
    #[must_use]
    pub fn key_text(&self, field: Field) -> String {
        self.key_value(field).map(ToString::to_string).unwrap_or_default()
    }

    /// Adds or replaces a derived value.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }
}

impl Record for AggregateRow {
    fn key(&self, field: Field) -> Option<KeyValue> {
        self.key_value(field).cloned()
    }

    fn metric(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().filter(|v| !v.is_nan())
    }

    fn has_metric(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Per-group, per-reduction accumulator.
#[derive(Debug, Clone)]
enum Accumulator {
    Values(Vec<f64>),
    Distinct(BTreeSet<KeyValue>),
    Rows(usize),
}

impl Accumulator {
    fn new(spec: &ReductionSpec) -> Self {
        match (&spec.source, spec.op) {
            (Source::Field(_), Reduction::CountDistinct) => Self::Distinct(BTreeSet::new()),
            (Source::Field(_), _) => Self::Rows(0),
            (Source::Metric(_), _) => Self::Values(Vec::new()),
        }
    }

    fn push<R: Record>(&mut self, spec: &ReductionSpec, row: &R) {
        match (self, &spec.source) {
            (Self::Values(values), Source::Metric(name)) => {
                if let Some(v) = row.metric(name) {
                    values.push(v);
                }
            }
            (Self::Distinct(seen), Source::Field(field)) => {
                if let Some(k) = row.key(*field) {
                    seen.insert(k);
                }
            }
            (Self::Rows(n), Source::Field(field)) => {
                if row.key(*field).is_some() {
                    *n += 1;
                }
            }
            _ => {}
        }
    }

    fn finish(self, op: Reduction) -> f64 {
        match self {
            Self::Distinct(seen) => seen.len() as f64,
            Self::Rows(n) => n as f64,
            Self::Values(values) => reduce(&values, op),
        }
    }
}

/// Applies a reduction to the non-missing values of one group.
#[must_use]
pub fn reduce(values: &[f64], op: Reduction) -> f64 {
    match op {
        Reduction::Sum => values.iter().sum(),
        Reduction::Count | Reduction::CountDistinct => values.len() as f64,
        Reduction::Mean => mean(values),
        Reduction::Median => median(values),
        Reduction::StdDev => std_dev(values),
        Reduction::Min => values.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
        Reduction::Max => values.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
        Reduction::First => values.first().copied().unwrap_or(f64::NAN),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation. A single observation has no spread estimate
/// and yields `NaN`.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

fn validate<R: Record>(row: &R, group_keys: &[Field], reductions: &[ReductionSpec]) -> Result<()> {
    for field in group_keys {
        if row.key(*field).is_none() {
            return Err(AnalysisError::UnknownField(*field));
        }
    }
    for spec in reductions {
        match (&spec.source, spec.op) {
            (Source::Metric(name), Reduction::CountDistinct) => {
                return Err(AnalysisError::UnknownMetric(format!(
                    "{name} (count_distinct needs a key field)"
                )));
            }
            (Source::Metric(name), _) if !row.has_metric(name) => {
                return Err(AnalysisError::UnknownMetric(name.clone()));
            }
            (Source::Field(field), Reduction::CountDistinct | Reduction::Count) => {
                if row.key(*field).is_none() {
                    return Err(AnalysisError::UnknownField(*field));
                }
            }
            (Source::Field(field), _) => {
                return Err(AnalysisError::UnknownField(*field));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Groups the rows passing `filter` by `group_keys` and reduces each group.
///
/// Output has exactly one row per distinct key tuple, ordered by key tuple.
///
/// # Errors
///
/// Returns `UnknownField`/`UnknownMetric` if a key or metric is not
/// available on the row type, or a reduction is applied to a source it
/// cannot read.
pub fn aggregate<R, F>(
    rows: &[R],
    filter: F,
    group_keys: &[Field],
    reductions: &[ReductionSpec],
) -> Result<Vec<AggregateRow>>
where
    R: Record,
    F: Fn(&R) -> bool,
{
    let mut groups: BTreeMap<Vec<KeyValue>, Vec<Accumulator>> = BTreeMap::new();
    let mut validated = false;

    for row in rows.iter().filter(|r| filter(r)) {
        if !validated {
            validate(row, group_keys, reductions)?;
            validated = true;
        }
        let key = row
            .key_tuple(group_keys)
            .ok_or_else(|| missing_field(row, group_keys))?;
        let accs = groups
            .entry(key)
            .or_insert_with(|| reductions.iter().map(Accumulator::new).collect());
        for (acc, spec) in accs.iter_mut().zip(reductions) {
            acc.push(spec, row);
        }
    }

    let out: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, accs)| AggregateRow {
            keys: group_keys.iter().copied().zip(key).collect(),
            values: reductions
                .iter()
                .zip(accs)
                .map(|(spec, acc)| (spec.output.clone(), acc.finish(spec.op)))
                .collect(),
        })
        .collect();

    tracing::debug!(
        groups = out.len(),
        keys = ?group_keys,
        "aggregation complete"
    );
    Ok(out)
}

/// Names the first of `fields` that `row` cannot resolve.
pub(crate) fn missing_field<R: Record>(row: &R, fields: &[Field]) -> AnalysisError {
    let field = fields
        .iter()
        .copied()
        .find(|f| row.key(*f).is_none())
        .unwrap_or(Field::Reporter);
    AnalysisError::UnknownField(field)
}
