//! Loaders for the GDP and gravity reference tables.

use crate::models::{GdpRecord, GravityRecord};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;
use tradeflow_core::ParseError;

pub struct ReferenceLoader;

impl ReferenceLoader {
    /// Loads the GDP table (`country,year,gdp`).
    ///
    /// `canonical` maps source country codes onto panel codes.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be read or a row does not
    /// match the expected columns.
    pub fn load_gdp<F>(path: &Path, canonical: F) -> Result<Vec<GdpRecord>, ParseError>
    where
        F: Fn(&str) -> String,
    {
        let mut rows: Vec<GdpRecord> = read_table(open(path)?, path)?;
        for row in &mut rows {
            row.country = canonical(&row.country);
        }
        info!(file = %path.display(), rows = rows.len(), "loaded GDP reference");
        Ok(rows)
    }

    /// Loads the gravity table (CEPII layout: `iso_o,iso_d,...,dist,comlang_off,...`).
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be read or a row does not
    /// match the expected columns.
    pub fn load_gravity<F>(path: &Path, canonical: F) -> Result<Vec<GravityRecord>, ParseError>
    where
        F: Fn(&str) -> String,
    {
        let mut rows: Vec<GravityRecord> = read_table(open(path)?, path)?;
        for row in &mut rows {
            row.origin = canonical(&row.origin);
            row.destination = canonical(&row.destination);
        }
        info!(file = %path.display(), rows = rows.len(), "loaded gravity reference");
        Ok(rows)
    }
}

fn open(path: &Path) -> Result<File, ParseError> {
    File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Deserializes every row of a headed CSV table. Columns not named by `T`
/// are ignored.
pub(crate) fn read_table<T, R>(reader: R, source: &Path) -> Result<Vec<T>, ParseError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source_err| ParseError::Csv {
            path: source.to_path_buf(),
            source: source_err,
        })
}
