//! Within-partition ranking.
//!
//! Ranks follow standard competition ranking ("1224"): tied values share a
//! rank and the next distinct value skips ahead by the size of the tie. A
//! top-N cut applied afterwards is therefore tie-inclusive and can keep more
//! than N rows in a partition.

use crate::aggregate::{missing_field, AggregateRow};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tradeflow_core::{Field, KeyValue, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankOrder {
    /// Largest value ranks 1
    #[default]
    Descending,
    Ascending,
}

/// An aggregate row with its rank inside its partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub row: AggregateRow,
    /// `None` if the metric was missing for this row
    pub rank: Option<usize>,
}

/// Ranks `rows` by `metric` within each partition.
///
/// Output is grouped by partition (partitions in key order), ranked rows in
/// rank order with ties kept in input order, unranked rows last.
///
/// # Errors
///
/// Returns `UnknownField`/`UnknownMetric` if the partition keys or metric
/// are not columns of the rows.
pub fn rank_within(
    rows: &[AggregateRow],
    partition_keys: &[Field],
    metric: &str,
    order: RankOrder,
) -> Result<Vec<RankedRow>> {
    if let Some(first) = rows.first() {
        if !first.has_metric(metric) {
            return Err(AnalysisError::UnknownMetric(metric.to_string()));
        }
    }

    let mut partitions: BTreeMap<Vec<KeyValue>, Vec<&AggregateRow>> = BTreeMap::new();
    for row in rows {
        let key = row
            .key_tuple(partition_keys)
            .ok_or_else(|| missing_field(row, partition_keys))?;
        partitions.entry(key).or_default().push(row);
    }

    let mut out = Vec::with_capacity(rows.len());
    for members in partitions.into_values() {
        out.extend(rank_partition(&members, metric, order));
    }
    Ok(out)
}

fn rank_partition(members: &[&AggregateRow], metric: &str, order: RankOrder) -> Vec<RankedRow> {
    let mut valued: Vec<(f64, &AggregateRow)> = Vec::with_capacity(members.len());
    let mut missing: Vec<&AggregateRow> = Vec::new();
    for row in members {
        match row.metric(metric) {
            Some(v) => valued.push((v, row)),
            None => missing.push(row),
        }
    }

    // stable: ties stay in input order
    valued.sort_by(|a, b| match order {
        RankOrder::Descending => b.0.total_cmp(&a.0),
        RankOrder::Ascending => a.0.total_cmp(&b.0),
    });

    let mut out = Vec::with_capacity(members.len());
    let mut current_rank = 0;
    let mut previous: Option<f64> = None;
    for (position, (value, row)) in valued.into_iter().enumerate() {
        if previous != Some(value) {
            current_rank = position + 1;
            previous = Some(value);
        }
        out.push(RankedRow {
            row: row.clone(),
            rank: Some(current_rank),
        });
    }
    out.extend(missing.into_iter().map(|row| RankedRow {
        row: row.clone(),
        rank: None,
    }));
    out
}

/// Keeps rows ranked `1..=n`. Ties at the cutoff are all kept.
#[must_use]
pub fn top_n(ranked: Vec<RankedRow>, n: usize) -> Vec<RankedRow> {
    ranked
        .into_iter()
        .filter(|r| r.rank.is_some_and(|rank| rank <= n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reporter: &str, partner: &str, value: f64) -> AggregateRow {
        AggregateRow {
            keys: vec![
                (Field::Reporter, KeyValue::from(reporter)),
                (Field::Partner, KeyValue::from(partner)),
            ],
            values: BTreeMap::from([("value".to_string(), value)]),
        }
    }

    fn ranks(ranked: &[RankedRow]) -> Vec<(String, Option<usize>)> {
        ranked
            .iter()
            .map(|r| (r.row.key_text(Field::Partner), r.rank))
            .collect()
    }

    #[test]
    fn test_ties_share_rank() {
        let rows = vec![
            row("ROM", "DEU", 100.0),
            row("ROM", "ITA", 100.0),
            row("ROM", "HUN", 50.0),
        ];
        let ranked = rank_within(&rows, &[Field::Reporter], "value", RankOrder::Descending).unwrap();

        assert_eq!(
            ranks(&ranked),
            vec![
                ("DEU".to_string(), Some(1)),
                ("ITA".to_string(), Some(1)),
                ("HUN".to_string(), Some(3)),
            ]
        );
        assert_eq!(top_n(ranked, 1).len(), 2);
    }

    #[test]
    fn test_top_n_is_tie_inclusive_at_cutoff() {
        let rows = vec![
            row("ROM", "DEU", 90.0),
            row("ROM", "ITA", 80.0),
            row("ROM", "HUN", 70.0),
            row("ROM", "FRA", 70.0),
            row("ROM", "AUT", 10.0),
        ];
        let ranked = rank_within(&rows, &[Field::Reporter], "value", RankOrder::Descending).unwrap();
        let kept = top_n(ranked, 3);
        assert_eq!(kept.len(), 4);
        assert!(kept.iter().all(|r| r.rank.unwrap() <= 3));
    }

    #[test]
    fn test_partitions_are_ranked_independently() {
        let rows = vec![
            row("ROM", "DEU", 10.0),
            row("BGR", "DEU", 5.0),
            row("ROM", "ITA", 20.0),
            row("BGR", "TUR", 50.0),
        ];
        let ranked = rank_within(&rows, &[Field::Reporter], "value", RankOrder::Descending).unwrap();

        assert_eq!(
            ranks(&ranked),
            vec![
                ("TUR".to_string(), Some(1)),
                ("DEU".to_string(), Some(2)),
                ("ITA".to_string(), Some(1)),
                ("DEU".to_string(), Some(2)),
            ]
        );
        for partition in ["ROM", "BGR"] {
            let firsts: Vec<f64> = ranked
                .iter()
                .filter(|r| r.row.key_text(Field::Reporter) == partition && r.rank == Some(1))
                .map(|r| r.row.value("value"))
                .collect();
            assert!(firsts.windows(2).all(|w| w[0] == w[1]));
        }
    }

    #[test]
    fn test_ascending_order_and_missing_values() {
        let rows = vec![
            row("ROM", "DEU", 3.0),
            row("ROM", "ITA", f64::NAN),
            row("ROM", "HUN", 1.0),
        ];
        let ranked = rank_within(&rows, &[Field::Reporter], "value", RankOrder::Ascending).unwrap();
        assert_eq!(
            ranks(&ranked),
            vec![
                ("HUN".to_string(), Some(1)),
                ("DEU".to_string(), Some(2)),
                ("ITA".to_string(), None),
            ]
        );
        assert_eq!(top_n(ranked, 5).len(), 2);
    }

    #[test]
    fn test_unknown_metric_is_rejected() {
        let rows = vec![row("ROM", "DEU", 1.0)];
        let err = rank_within(&rows, &[Field::Reporter], "share", RankOrder::Descending).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownMetric(_)));
        let err = rank_within(&rows, &[Field::Year], "value", RankOrder::Descending).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownField(Field::Year)));
    }
}
