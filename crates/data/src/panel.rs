//! The unified long-format trade panel.

use crate::loader::LoadedExtract;
use crate::models::TradeRecord;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use tracing::info;
use tradeflow_core::{DataQualityWarning, LoadStats, TradeFlow};

/// All loaded trade records, sorted by (reporter, product, partner, year).
///
/// The canonical order is fixed at construction. Consumers needing another
/// order take a sorted copy via [`Panel::sorted_by`].
#[derive(Debug, Clone, Default)]
pub struct Panel {
    records: Vec<TradeRecord>,
}

/// Canonical panel ordering. Flow breaks remaining ties so the order does
/// not depend on which extract was concatenated first.
fn canonical_order(a: &TradeRecord, b: &TradeRecord) -> Ordering {
    a.reporter
        .cmp(&b.reporter)
        .then_with(|| a.product_code.cmp(&b.product_code))
        .then_with(|| a.partner.cmp(&b.partner))
        .then_with(|| a.year.cmp(&b.year))
        .then_with(|| a.flow.cmp(&b.flow))
}

impl Panel {
    /// Concatenates record batches and sorts them canonically.
    #[must_use]
    pub fn build<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<TradeRecord>>,
    {
        let mut records: Vec<TradeRecord> = batches.into_iter().flatten().collect();
        records.sort_by(canonical_order);
        info!(rows = records.len(), "panel built");
        Self { records }
    }

    /// Builds the panel from loader output, returning the per-file
    /// bookkeeping alongside it.
    #[must_use]
    pub fn from_extracts(
        extracts: Vec<LoadedExtract>,
    ) -> (Self, Vec<(LoadStats, Vec<DataQualityWarning>)>) {
        let mut batches = Vec::with_capacity(extracts.len());
        let mut bookkeeping = Vec::with_capacity(extracts.len());
        for extract in extracts {
            batches.push(extract.records);
            bookkeeping.push((extract.stats, extract.warnings));
        }
        (Self::build(batches), bookkeeping)
    }

    #[must_use]
    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.records.iter()
    }

    /// A copy of the records in a different order. The panel is untouched.
    #[must_use]
    pub fn sorted_by<F>(&self, compare: F) -> Vec<TradeRecord>
    where
        F: FnMut(&TradeRecord, &TradeRecord) -> Ordering,
    {
        let mut copy = self.records.clone();
        copy.sort_by(compare);
        copy
    }

    /// Exact total trade value of records matching `filter`.
    pub fn total_value<F>(&self, filter: F) -> Decimal
    where
        F: Fn(&TradeRecord) -> bool,
    {
        self.records
            .iter()
            .filter(|r| filter(r))
            .map(|r| r.trade_value)
            .sum()
    }

    /// Exact total trade value for one flow.
    #[must_use]
    pub fn flow_total(&self, flow: TradeFlow) -> Decimal {
        self.total_value(|r| r.flow == flow)
    }

    /// Distinct reporters, in panel order.
    #[must_use]
    pub fn reporters(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.records.iter().map(|r| r.reporter.as_str()).collect();
        out.dedup();
        out
    }
}

impl<'a> IntoIterator for &'a Panel {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
