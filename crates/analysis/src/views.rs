//! Analysis views over the panel, each rendered as a [`ReportTable`].

use crate::aggregate::{aggregate, AggregateRow, Reduction, ReductionSpec};
use crate::error::Result;
use crate::rank::{rank_within, top_n, RankOrder, RankedRow};
use crate::regression::{RegressionResult, CONSTANT};
use std::collections::BTreeMap;
use tradeflow_core::{format_number, Field, KeyValue, ReportTable, TradeFlow};
use tradeflow_data::{TradeRecord, TRADE_VALUE};

/// Label of the all-years row in the summary view.
pub const ALL_YEARS: &str = "all";

const SHARE: &str = "share";
const VALUE_DECIMALS: usize = 3;
const SHARE_DECIMALS: usize = 6;
const COEF_DECIMALS: usize = 4;

const STAT_COLUMNS: [(&str, Reduction); 7] = [
    ("n", Reduction::Count),
    ("mean", Reduction::Mean),
    ("median", Reduction::Median),
    ("sd", Reduction::StdDev),
    ("min", Reduction::Min),
    ("max", Reduction::Max),
    ("sum", Reduction::Sum),
];

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn stat_cells(row: &AggregateRow) -> Vec<String> {
    STAT_COLUMNS
        .iter()
        .map(|(name, op)| match op {
            Reduction::Count => format_number(row.value(name), 0),
            _ => format_number(row.value(name), VALUE_DECIMALS),
        })
        .collect()
}

/// Trade value statistics per (reporter, year, flow), followed by
/// all-years totals per (reporter, flow).
///
/// # Errors
///
/// Propagates aggregation errors.
pub fn summary_statistics(panel: &[TradeRecord]) -> Result<ReportTable> {
    let reductions: Vec<ReductionSpec> = STAT_COLUMNS
        .iter()
        .map(|(name, op)| ReductionSpec::metric(*name, TRADE_VALUE, *op))
        .collect();

    let by_year = aggregate(
        panel,
        |_| true,
        &[Field::Reporter, Field::Year, Field::Flow],
        &reductions,
    )?;
    let all_years = aggregate(panel, |_| true, &[Field::Reporter, Field::Flow], &reductions)?;

    let mut names = vec!["reporter", "year", "flow"];
    names.extend(STAT_COLUMNS.iter().map(|(name, _)| *name));
    let mut table = ReportTable::new("summary_statistics", columns(&names));

    for row in &by_year {
        let mut cells = vec![
            row.key_text(Field::Reporter),
            row.key_text(Field::Year),
            row.key_text(Field::Flow),
        ];
        cells.extend(stat_cells(row));
        table.push_row(cells);
    }
    for row in &all_years {
        let mut cells = vec![
            row.key_text(Field::Reporter),
            ALL_YEARS.to_string(),
            row.key_text(Field::Flow),
        ];
        cells.extend(stat_cells(row));
        table.push_row(cells);
    }
    Ok(table)
}

/// Largest `dimension` values by summed trade value within each
/// (reporter, year, flow), keeping ranks `1..=n` with ties.
fn top_by(panel: &[TradeRecord], dimension: Field, n: usize, name: &str) -> Result<ReportTable> {
    let partition = [Field::Reporter, Field::Year, Field::Flow];
    let mut keys = partition.to_vec();
    keys.push(dimension);

    let totals = aggregate(
        panel,
        |_| true,
        &keys,
        &[ReductionSpec::sum(TRADE_VALUE, TRADE_VALUE)],
    )?;
    let ranked = top_n(
        rank_within(&totals, &partition, TRADE_VALUE, RankOrder::Descending)?,
        n,
    );

    let mut table = ReportTable::new(
        name,
        columns(&[
            "reporter",
            "year",
            "flow",
            dimension.column_name(),
            TRADE_VALUE,
            "rank",
        ]),
    );
    for RankedRow { row, rank } in &ranked {
        table.push_row(vec![
            row.key_text(Field::Reporter),
            row.key_text(Field::Year),
            row.key_text(Field::Flow),
            row.key_text(dimension),
            format_number(row.value(TRADE_VALUE), VALUE_DECIMALS),
            rank.map(|r| r.to_string()).unwrap_or_default(),
        ]);
    }
    Ok(table)
}

/// Top trading partners per reporter, year and flow.
///
/// # Errors
///
/// Propagates aggregation and ranking errors.
pub fn top_partners(panel: &[TradeRecord], n: usize) -> Result<ReportTable> {
    top_by(panel, Field::Partner, n, "top_partners")
}

/// Top HS-6 products per reporter, year and flow.
///
/// # Errors
///
/// Propagates aggregation and ranking errors.
pub fn top_products(panel: &[TradeRecord], n: usize) -> Result<ReportTable> {
    top_by(panel, Field::Product, n, "top_products")
}

/// Each `dimension` value's share of the reporter's exports in a year,
/// ranked by share within (reporter, year) and cut at `n` (tie-inclusive).
///
/// `dimension` is typically [`Field::Partner`] or [`Field::Sector`].
///
/// # Errors
///
/// Propagates aggregation and ranking errors.
pub fn export_shares(panel: &[TradeRecord], dimension: Field, n: usize) -> Result<ReportTable> {
    let is_export = |r: &TradeRecord| r.flow == TradeFlow::Export;
    let partition = [Field::Reporter, Field::Year];
    let sum = [ReductionSpec::sum(TRADE_VALUE, TRADE_VALUE)];

    let reporter_totals: BTreeMap<Vec<KeyValue>, f64> =
        aggregate(panel, is_export, &partition, &sum)?
            .into_iter()
            .map(|row| {
                let total = row.value(TRADE_VALUE);
                (row.keys.into_iter().map(|(_, v)| v).collect(), total)
            })
            .collect();

    let mut rows = aggregate(panel, is_export, &[Field::Reporter, Field::Year, dimension], &sum)?;
    for row in &mut rows {
        let key: Vec<KeyValue> = row.keys[..partition.len()]
            .iter()
            .map(|(_, v)| v.clone())
            .collect();
        let total = reporter_totals.get(&key).copied().unwrap_or(f64::NAN);
        let share = if total > 0.0 {
            row.value(TRADE_VALUE) / total
        } else {
            f64::NAN
        };
        row.set(SHARE, share);
    }

    let ranked = top_n(rank_within(&rows, &partition, SHARE, RankOrder::Descending)?, n);

    let name = match dimension {
        Field::Sector => "sector_export_shares",
        _ => "export_shares",
    };
    let mut table = ReportTable::new(
        name,
        columns(&[
            "reporter",
            "year",
            dimension.column_name(),
            TRADE_VALUE,
            SHARE,
            "rank",
        ]),
    );
    for RankedRow { row, rank } in &ranked {
        table.push_row(vec![
            row.key_text(Field::Reporter),
            row.key_text(Field::Year),
            row.key_text(dimension),
            format_number(row.value(TRADE_VALUE), VALUE_DECIMALS),
            format_number(row.value(SHARE), SHARE_DECIMALS),
            rank.map(|r| r.to_string()).unwrap_or_default(),
        ]);
    }
    Ok(table)
}

/// Side-by-side coefficient table, one column per fitted model.
///
/// Each variable takes two rows: the estimate with significance stars, then
/// the standard error in parentheses. Fixed-effect dummies are summarised
/// as one indicator row per group rather than listed. The table closes with
/// `N` and `R2`.
#[must_use]
pub fn regression_table(name: &str, fits: &[(TradeFlow, &RegressionResult)]) -> ReportTable {
    let mut header = vec!["variable".to_string()];
    header.extend(
        fits.iter()
            .map(|(flow, result)| format!("{}_{}", result.dependent, flow.as_str().to_lowercase())),
    );
    let mut table = ReportTable::new(name, header);

    // variables in first-seen order; dummies are named `group=level`
    let mut variables: Vec<&str> = Vec::new();
    for (_, result) in fits {
        for c in &result.coefficients {
            if !c.name.contains('=') && !variables.contains(&c.name.as_str()) {
                variables.push(&c.name);
            }
        }
    }
    // the constant closes the coefficient block
    variables.retain(|v| *v != CONSTANT);
    variables.push(CONSTANT);

    for variable in variables {
        let mut estimates = vec![variable.to_string()];
        let mut errors = vec![String::new()];
        for (_, result) in fits {
            match result.coefficient(variable) {
                Some(c) if c.omitted => {
                    estimates.push("(omitted)".to_string());
                    errors.push(String::new());
                }
                Some(c) => {
                    estimates.push(format!("{}{}", format_number(c.estimate, COEF_DECIMALS), c.stars()));
                    errors.push(format!("({})", format_number(c.std_error, COEF_DECIMALS)));
                }
                None => {
                    estimates.push(String::new());
                    errors.push(String::new());
                }
            }
        }
        table.push_row(estimates);
        table.push_row(errors);
    }

    let mut groups: Vec<Field> = Vec::new();
    for (_, result) in fits {
        for field in &result.fixed_effects {
            if !groups.contains(field) {
                groups.push(*field);
            }
        }
    }
    for field in groups {
        let mut cells = vec![format!("{field} FE")];
        cells.extend(fits.iter().map(|(_, result)| {
            if result.fixed_effects.contains(&field) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }));
        table.push_row(cells);
    }

    let mut n_row = vec!["N".to_string()];
    n_row.extend(fits.iter().map(|(_, r)| r.n_obs.to_string()));
    table.push_row(n_row);

    let mut r2_row = vec!["R2".to_string()];
    r2_row.extend(fits.iter().map(|(_, r)| format_number(r.r_squared, 3)));
    table.push_row(r2_row);

    table
}
