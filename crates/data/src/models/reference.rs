//! Reference datasets joined onto the panel.

use serde::{Deserialize, Serialize};

/// Gross domestic product of a country in a year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdpRecord {
    /// Country (ISO3)
    pub country: String,
    pub year: i32,
    /// GDP in current USD; empty in the source means unknown
    pub gdp: Option<f64>,
}

/// Bilateral gravity variables for an (origin, destination) pair.
///
/// Column names follow the CEPII distance dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityRecord {
    #[serde(rename = "iso_o")]
    pub origin: String,
    #[serde(rename = "iso_d")]
    pub destination: String,
    /// Population-weighted great-circle distance in km
    #[serde(rename = "dist")]
    pub distance: Option<f64>,
    /// 1 if the pair shares a common official language
    #[serde(rename = "comlang_off")]
    pub common_language: Option<u8>,
}

impl GravityRecord {
    #[must_use]
    pub fn shares_language(&self) -> Option<bool> {
        self.common_language.map(|flag| flag != 0)
    }
}
