//! Key and field primitives shared by every table in the pipeline.
//!
//! Tables are plain `Vec`s of records. Grouping, ranking and joining all
//! address records through [`Field`] selectors that resolve to ordered
//! [`KeyValue`]s, so the same transform code works on raw trade rows,
//! merged rows and aggregates alike.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradeFlow {
    Import,
    Export,
}

impl TradeFlow {
    /// Both flows in reporting order.
    pub const ALL: [Self; 2] = [Self::Import, Self::Export];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "Import",
            Self::Export => "Export",
        }
    }
}

impl fmt::Display for TradeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TradeFlow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "export" => Ok(Self::Export),
            other => Err(format!("unknown trade flow '{other}'")),
        }
    }
}

/// Column selector used for grouping, partitioning and joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Reporter,
    Partner,
    PartnerName,
    Product,
    /// HS-2 sector, the first two digits of the product code.
    Sector,
    Year,
    Flow,
}

impl Field {
    /// Column header used in reports.
    #[must_use]
    pub const fn column_name(&self) -> &'static str {
        match self {
            Self::Reporter => "reporter",
            Self::Partner => "partner",
            Self::PartnerName => "partner_name",
            Self::Product => "product",
            Self::Sector => "sector",
            Self::Year => "year",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl std::str::FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reporter" => Ok(Self::Reporter),
            "partner" => Ok(Self::Partner),
            "partner_name" => Ok(Self::PartnerName),
            "product" => Ok(Self::Product),
            "sector" => Ok(Self::Sector),
            "year" => Ok(Self::Year),
            "flow" => Ok(Self::Flow),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

/// A single resolved key component.
///
/// Ordering is total so key tuples can live in `BTreeMap`s; text compares
/// lexicographically and years numerically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Text(String),
    Year(i32),
    Flow(TradeFlow),
}

impl KeyValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_year(&self) -> Option<i32> {
        match self {
            Self::Year(y) => Some(*y),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_flow(&self) -> Option<TradeFlow> {
        match self {
            Self::Flow(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Year(y) => write!(f, "{y}"),
            Self::Flow(flow) => write!(f, "{flow}"),
        }
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i32> for KeyValue {
    fn from(y: i32) -> Self {
        Self::Year(y)
    }
}

impl From<TradeFlow> for KeyValue {
    fn from(f: TradeFlow) -> Self {
        Self::Flow(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_parsing_is_case_insensitive() {
        assert_eq!("Import".parse::<TradeFlow>().unwrap(), TradeFlow::Import);
        assert_eq!(" EXPORT ".parse::<TradeFlow>().unwrap(), TradeFlow::Export);
        assert!("Re-Export".parse::<TradeFlow>().is_err());
    }

    #[test]
    fn test_key_values_order_lexicographically() {
        let mut keys = vec![KeyValue::from("ITA"), KeyValue::from("DEU"), KeyValue::from("HUN")];
        keys.sort();
        assert_eq!(
            keys,
            vec![KeyValue::from("DEU"), KeyValue::from("HUN"), KeyValue::from("ITA")]
        );
    }

    #[test]
    fn test_field_round_trips_through_column_name() {
        for field in [
            Field::Reporter,
            Field::Partner,
            Field::PartnerName,
            Field::Product,
            Field::Sector,
            Field::Year,
            Field::Flow,
        ] {
            assert_eq!(field.column_name().parse::<Field>().unwrap(), field);
        }
    }
}
