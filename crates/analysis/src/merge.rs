//! Many-to-one left join of a primary table onto a reference table.
//!
//! Every primary row appears exactly once in the output, matched or not.
//! Reference rows no primary row refers to are dropped and only counted.

use crate::aggregate::missing_field;
use crate::error::{AnalysisError, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;
use tradeflow_core::{Field, KeyValue, MatchStats, Record};

/// A primary row and the reference row it matched, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joined<'a, P, R> {
    pub primary: &'a P,
    pub reference: Option<&'a R>,
}

#[derive(Debug, Clone)]
pub struct JoinOutput<'a, P, R> {
    pub rows: Vec<Joined<'a, P, R>>,
    pub stats: MatchStats,
}

/// Left-joins `primary` onto `reference`.
///
/// `join_keys` are resolved on each primary row; `reference_key` must
/// produce the matching tuple, in the same order, for each reference row.
///
/// # Errors
///
/// Returns `DuplicateReferenceKey` if two reference rows share a key (the
/// join would no longer be many-to-one), or `UnknownField` if a primary row
/// lacks a join key.
pub fn left_join<'a, P, R, FR>(
    table: &str,
    primary: &'a [P],
    join_keys: &[Field],
    reference: &'a [R],
    reference_key: FR,
) -> Result<JoinOutput<'a, P, R>>
where
    P: Record,
    FR: Fn(&R) -> Vec<KeyValue>,
{
    let mut index: BTreeMap<Vec<KeyValue>, &'a R> = BTreeMap::new();
    for row in reference {
        let key = reference_key(row);
        if index.insert(key.clone(), row).is_some() {
            return Err(AnalysisError::DuplicateReferenceKey {
                table: table.to_string(),
                key: format_key(&key),
            });
        }
    }

    let mut used: BTreeSet<&Vec<KeyValue>> = BTreeSet::new();
    let mut rows = Vec::with_capacity(primary.len());
    let mut matched = 0;

    for row in primary {
        let key = row
            .key_tuple(join_keys)
            .ok_or_else(|| missing_field(row, join_keys))?;
        let hit = index.get_key_value(&key);
        if let Some((ref_key, _)) = hit {
            matched += 1;
            used.insert(ref_key);
        }
        rows.push(Joined {
            primary: row,
            reference: hit.map(|(_, r)| *r),
        });
    }

    let stats = MatchStats {
        primary_rows: primary.len(),
        matched_rows: matched,
        unmatched_rows: primary.len() - matched,
        reference_rows: reference.len(),
        reference_rows_unused: index.len() - used.len(),
    };

    info!(
        table,
        primary = stats.primary_rows,
        matched = stats.matched_rows,
        unmatched = stats.unmatched_rows,
        reference_unused = stats.reference_rows_unused,
        match_rate = stats.match_rate(),
        "reference join"
    );

    Ok(JoinOutput { rows, stats })
}

fn format_key(key: &[KeyValue]) -> String {
    let parts: Vec<String> = key.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradeflow_core::TradeFlow;
    use tradeflow_data::{GdpRecord, TradeRecord};

    fn record(partner: &str, year: i32) -> TradeRecord {
        TradeRecord {
            reporter: "ROM".to_string(),
            partner: partner.to_string(),
            partner_name: partner.to_string(),
            flow: TradeFlow::Import,
            product_code: "271011".to_string(),
            product_description: String::new(),
            trade_value: dec!(1),
            quantity_unit: String::new(),
            year,
        }
    }

    fn gdp(country: &str, year: i32, value: f64) -> GdpRecord {
        GdpRecord {
            country: country.to_string(),
            year,
            gdp: Some(value),
        }
    }

    fn gdp_key(g: &GdpRecord) -> Vec<KeyValue> {
        vec![KeyValue::from(g.country.as_str()), KeyValue::Year(g.year)]
    }

    #[test]
    fn test_left_join_keeps_every_primary_row() {
        let primary = vec![record("DEU", 2011), record("DEU", 2011), record("XXX", 2011)];
        let reference = vec![gdp("DEU", 2011, 3.7e12), gdp("FRA", 2011, 2.8e12)];

        let out = left_join(
            "gdp",
            &primary,
            &[Field::Partner, Field::Year],
            &reference,
            gdp_key,
        )
        .unwrap();

        assert_eq!(out.rows.len(), primary.len());
        assert_eq!(out.rows[0].reference.and_then(|g| g.gdp), Some(3.7e12));
        assert_eq!(out.rows[1].reference.and_then(|g| g.gdp), Some(3.7e12));
        assert!(out.rows[2].reference.is_none());

        assert_eq!(out.stats.matched_rows, 2);
        assert_eq!(out.stats.unmatched_rows, 1);
        assert_eq!(out.stats.reference_rows, 2);
        assert_eq!(out.stats.reference_rows_unused, 1);
        assert!((out.stats.match_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reference_only_rows_do_not_inflate_output() {
        let primary = vec![record("DEU", 2011)];
        let reference: Vec<GdpRecord> = (2000..2020).map(|y| gdp("DEU", y, 1.0)).collect();
        let out = left_join("gdp", &primary, &[Field::Partner, Field::Year], &reference, gdp_key)
            .unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.stats.reference_rows_unused, 19);
    }

    #[test]
    fn test_duplicate_reference_keys_are_rejected() {
        let primary = vec![record("DEU", 2011)];
        let reference = vec![gdp("DEU", 2011, 1.0), gdp("DEU", 2011, 2.0)];
        let err = left_join("gdp", &primary, &[Field::Partner, Field::Year], &reference, gdp_key)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateReferenceKey { ref key, .. } if key == "(DEU, 2011)"));
    }

    #[test]
    fn test_empty_primary_has_zero_match_rate() {
        let primary: Vec<TradeRecord> = vec![];
        let reference = vec![gdp("DEU", 2011, 1.0)];
        let out = left_join("gdp", &primary, &[Field::Partner, Field::Year], &reference, gdp_key)
            .unwrap();
        assert!(out.rows.is_empty());
        assert_eq!(out.stats.match_rate(), 0.0);
    }
}
