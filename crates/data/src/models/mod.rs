//! Data models for the trade panel.
//!
//! Trade values use `rust_decimal::Decimal` so totals reconcile exactly
//! with the source extracts.

pub mod reference;
pub mod trade;

pub use reference::{GdpRecord, GravityRecord};
pub use trade::{
    normalize_product_code, ProductCode, TradeRecord, PRODUCT_CODE_LEN, TRADE_VALUE,
    WORLD_PARTNER,
};
