//! Trade record data model.
//!
//! One row of a per-country, per-year customs extract.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradeflow_core::{Field, KeyValue, Record, TradeFlow, WarningKind};

/// Partner code of the world aggregate, which double-counts bilateral flows.
pub const WORLD_PARTNER: &str = "WLD";

/// Length of an HS-6 product code.
pub const PRODUCT_CODE_LEN: usize = 6;

/// Metric name under which the trade value is exposed.
pub const TRADE_VALUE: &str = "trade_value";

/// A single bilateral, product-level trade flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Reporting country (ISO3)
    pub reporter: String,
    /// Partner country (ISO3)
    pub partner: String,
    pub partner_name: String,
    pub flow: TradeFlow,
    /// HS-6 product code, always six characters
    pub product_code: String,
    pub product_description: String,
    /// Trade value in thousands of USD
    pub trade_value: Decimal,
    pub quantity_unit: String,
    pub year: i32,
}

impl TradeRecord {
    /// HS-2 sector: the first two digits of the product code.
    #[must_use]
    pub fn sector(&self) -> &str {
        self.product_code.get(..2).unwrap_or(&self.product_code)
    }

    /// Returns true if the partner is the world aggregate.
    #[must_use]
    pub fn is_world_partner(&self) -> bool {
        self.partner == WORLD_PARTNER
    }

    /// Trade value as a float for statistical work.
    #[must_use]
    pub fn value_f64(&self) -> f64 {
        self.trade_value.to_f64().unwrap_or(f64::NAN)
    }
}

impl Record for TradeRecord {
    fn key(&self, field: Field) -> Option<KeyValue> {
        Some(match field {
            Field::Reporter => KeyValue::from(self.reporter.as_str()),
            Field::Partner => KeyValue::from(self.partner.as_str()),
            Field::PartnerName => KeyValue::from(self.partner_name.as_str()),
            Field::Product => KeyValue::from(self.product_code.as_str()),
            Field::Sector => KeyValue::from(self.sector()),
            Field::Year => KeyValue::Year(self.year),
            Field::Flow => KeyValue::Flow(self.flow),
        })
    }

    fn metric(&self, name: &str) -> Option<f64> {
        (name == TRADE_VALUE).then(|| self.value_f64())
    }

    fn has_metric(&self, name: &str) -> bool {
        name == TRADE_VALUE
    }
}

/// Result of normalizing a raw product code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductCode {
    /// Already six digits
    Valid(String),
    /// Five digits whose leading zero was lost upstream; restored
    Padded(String),
    /// Any other shape; the row cannot be placed in the HS hierarchy
    Anomalous(WarningKind),
}

/// Normalizes a raw product code to six characters.
///
/// Only the five-digit case is repaired. Every other length, and any
/// non-digit code, is reported rather than coerced.
#[must_use]
pub fn normalize_product_code(raw: &str) -> ProductCode {
    let code = raw.trim();
    if !code.chars().all(|c| c.is_ascii_digit()) || code.is_empty() {
        return ProductCode::Anomalous(WarningKind::NonNumericProductCode);
    }
    match code.len() {
        PRODUCT_CODE_LEN => ProductCode::Valid(code.to_string()),
        5 => ProductCode::Padded(format!("0{code}")),
        _ => ProductCode::Anomalous(WarningKind::UnexpectedProductCodeLength),
    }
}
