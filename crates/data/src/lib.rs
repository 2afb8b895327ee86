//! Data ingestion and output for the trade panel analysis.
//!
//! This crate provides:
//! - Trade and reference-table models
//! - The record loader for per-country, per-year extracts
//! - The canonical panel builder
//! - CSV/JSON report output

pub mod csv_storage;
pub mod loader;
pub mod models;
pub mod panel;
pub mod reference;

pub use csv_storage::CsvStorage;
pub use loader::{load_extracts, ExtractId, LoadedExtract, RecordLoader, EXPECTED_COLUMNS};
pub use panel::Panel;
pub use reference::ReferenceLoader;

pub use models::{
    normalize_product_code, GdpRecord, GravityRecord, ProductCode, TradeRecord, PRODUCT_CODE_LEN,
    TRADE_VALUE, WORLD_PARTNER,
};
