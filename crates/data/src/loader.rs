//! Record loader for per-country, per-year trade extracts.
//!
//! Each extract is a 9-column CSV with a header row:
//!
//! | # | column | type |
//! |---|--------|------|
//! | 1 | reporter ISO3 | text |
//! | 2 | partner ISO3 | text |
//! | 3 | partner name | text |
//! | 4 | trade flow (`Import`/`Export`) | text |
//! | 5 | HS-6 product code | text |
//! | 6 | product description | text |
//! | 7 | trade value, thousands USD | numeric |
//! | 8 | quantity unit | text |
//! | 9 | year | numeric |
//!
//! Codes are read as text so leading zeros survive. Key and numeric columns
//! must be UTF-8; the free-text columns (3, 6, 8) are decoded lossily so a
//! Windows-1252 partner name or description only raises a warning.

use crate::models::{normalize_product_code, ProductCode, TradeRecord};
use csv::{ByteRecord, ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};
use tradeflow_core::{DataQualityWarning, LoadStats, ParseError, TradeFlow, WarningKind};

/// Number of columns in a trade extract.
pub const EXPECTED_COLUMNS: usize = 9;

const COLUMN_NAMES: [&str; EXPECTED_COLUMNS] = [
    "reporter",
    "partner",
    "partner_name",
    "trade_flow",
    "product_code",
    "product_description",
    "trade_value",
    "quantity_unit",
    "year",
];

/// Records and bookkeeping for one extract.
#[derive(Debug, Clone)]
pub struct LoadedExtract {
    pub records: Vec<TradeRecord>,
    pub stats: LoadStats,
    pub warnings: Vec<DataQualityWarning>,
}

/// Identity of the extract being read, used to flag rows that disagree
/// with the file they were found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractId {
    pub reporter: String,
    pub year: i32,
}

pub struct RecordLoader;

impl RecordLoader {
    /// Loads one extract from disk.
    ///
    /// The file is opened, read to the end and closed before returning.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the file cannot be opened, a row has the
    /// wrong number of columns, or a numeric/flow column does not parse.
    pub fn load_file(path: &Path, expected: Option<&ExtractId>) -> Result<LoadedExtract, ParseError> {
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extract = Self::load_reader(file, path, expected)?;
        info!(
            file = %path.display(),
            read = extract.stats.rows_read,
            kept = extract.stats.rows_kept,
            world_dropped = extract.stats.world_rows_dropped,
            padded = extract.stats.codes_padded,
            anomalous = extract.stats.anomalous_rows_dropped,
            "loaded trade extract"
        );
        Ok(extract)
    }

    /// Loads an extract from any reader; `source` names it in errors.
    ///
    /// # Errors
    ///
    /// See [`RecordLoader::load_file`].
    pub fn load_reader<R: Read>(
        reader: R,
        source: &Path,
        expected: Option<&ExtractId>,
    ) -> Result<LoadedExtract, ParseError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .byte_headers()
            .map_err(|e| csv_error(source, e))?
            .clone();
        if headers.len() != EXPECTED_COLUMNS {
            return Err(ParseError::Schema {
                path: source.to_path_buf(),
                line: 1,
                expected: EXPECTED_COLUMNS,
                found: headers.len(),
            });
        }

        let source_name = source.display().to_string();
        let mut stats = LoadStats {
            source: source_name.clone(),
            ..LoadStats::default()
        };
        let mut warnings = Vec::new();
        let mut records = Vec::new();

        for result in csv_reader.byte_records() {
            let row = result.map_err(|e| csv_error(source, e))?;
            let line = row.position().map_or(0, csv::Position::line);
            stats.rows_read += 1;

            let (parsed, lossy_columns) = parse_row(&row, source, line)?;
            for idx in lossy_columns {
                warn!(
                    file = %source_name,
                    line,
                    column = COLUMN_NAMES[idx],
                    "non-UTF-8 text replaced"
                );
                warnings.push(DataQualityWarning {
                    source: source_name.clone(),
                    line,
                    kind: WarningKind::InvalidTextEncoding,
                    detail: format!("column '{}' decoded lossily", COLUMN_NAMES[idx]),
                });
            }

            if parsed.is_world_partner() {
                stats.world_rows_dropped += 1;
                continue;
            }

            let mut record = parsed;
            match normalize_product_code(&record.product_code) {
                ProductCode::Valid(code) => record.product_code = code,
                ProductCode::Padded(code) => {
                    stats.codes_padded += 1;
                    record.product_code = code;
                }
                ProductCode::Anomalous(kind) => {
                    stats.anomalous_rows_dropped += 1;
                    warn!(
                        file = %source_name,
                        line,
                        code = %record.product_code,
                        "excluding row with anomalous product code"
                    );
                    warnings.push(DataQualityWarning {
                        source: source_name.clone(),
                        line,
                        kind,
                        detail: format!("product code '{}'", record.product_code),
                    });
                    continue;
                }
            }

            if let Some(id) = expected {
                if record.reporter != id.reporter {
                    warnings.push(DataQualityWarning {
                        source: source_name.clone(),
                        line,
                        kind: WarningKind::ReporterMismatch,
                        detail: format!("reporter '{}' in extract for '{}'", record.reporter, id.reporter),
                    });
                }
                if record.year != id.year {
                    warnings.push(DataQualityWarning {
                        source: source_name.clone(),
                        line,
                        kind: WarningKind::YearMismatch,
                        detail: format!("year {} in extract for {}", record.year, id.year),
                    });
                }
            }

            records.push(record);
        }

        stats.rows_kept = records.len();
        debug!(file = %source_name, rows = stats.rows_kept, "extract parsed");

        Ok(LoadedExtract {
            records,
            stats,
            warnings,
        })
    }
}

fn csv_error(path: &Path, source: csv::Error) -> ParseError {
    ParseError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Parses one row, returning the record and the free-text columns that
/// needed lossy decoding.
fn parse_row(
    row: &ByteRecord,
    path: &Path,
    line: u64,
) -> Result<(TradeRecord, Vec<usize>), ParseError> {
    if row.len() != EXPECTED_COLUMNS {
        return Err(ParseError::Schema {
            path: path.to_path_buf(),
            line,
            expected: EXPECTED_COLUMNS,
            found: row.len(),
        });
    }

    let reporter = required(row, 0, path, line)?.to_string();
    let partner = required(row, 1, path, line)?.to_string();
    let flow_raw = required(row, 3, path, line)?;
    let flow = TradeFlow::from_str(flow_raw).map_err(|_| ParseError::InvalidFlow {
        path: path.to_path_buf(),
        line,
        value: flow_raw.to_string(),
    })?;
    let product_code = utf8(row, 4, path, line)?.to_string();

    let value_raw = required(row, 6, path, line)?;
    let trade_value = Decimal::from_str(value_raw)
        .or_else(|_| Decimal::from_scientific(value_raw))
        .map_err(|_| invalid_number(path, line, 6, value_raw))?;

    let year_raw = required(row, 8, path, line)?;
    let year = year_raw
        .parse::<i32>()
        .map_err(|_| invalid_number(path, line, 8, year_raw))?;

    let mut lossy = Vec::new();
    let record = TradeRecord {
        reporter,
        partner,
        partner_name: lossy_text(row, 2, &mut lossy),
        flow,
        product_code,
        product_description: lossy_text(row, 5, &mut lossy),
        trade_value,
        quantity_unit: lossy_text(row, 7, &mut lossy),
        year,
    };
    Ok((record, lossy))
}

fn invalid_number(path: &Path, line: u64, idx: usize, value: &str) -> ParseError {
    ParseError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        column: COLUMN_NAMES[idx].to_string(),
        value: value.to_string(),
    }
}

fn utf8<'a>(row: &'a ByteRecord, idx: usize, path: &Path, line: u64) -> Result<&'a str, ParseError> {
    std::str::from_utf8(&row[idx]).map_err(|_| ParseError::InvalidEncoding {
        path: path.to_path_buf(),
        line,
        column: COLUMN_NAMES[idx].to_string(),
    })
}

fn lossy_text(row: &ByteRecord, idx: usize, lossy: &mut Vec<usize>) -> String {
    match String::from_utf8_lossy(&row[idx]) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            lossy.push(idx);
            text
        }
    }
}

fn required<'a>(
    row: &'a ByteRecord,
    idx: usize,
    path: &Path,
    line: u64,
) -> Result<&'a str, ParseError> {
    let value = utf8(row, idx, path, line)?;
    if value.is_empty() {
        Err(ParseError::MissingValue {
            path: path.to_path_buf(),
            line,
            column: COLUMN_NAMES[idx].to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Loads every (reporter, year) extract listed by the caller.
///
/// Extracts are read one after another; the first failure aborts.
///
/// # Errors
///
/// Returns the first `ParseError` encountered.
pub fn load_extracts(
    extracts: &[(String, i32)],
    path_for: impl Fn(&str, i32) -> PathBuf,
) -> Result<Vec<LoadedExtract>, ParseError> {
    extracts
        .iter()
        .map(|(reporter, year)| {
            let id = ExtractId {
                reporter: reporter.clone(),
                year: *year,
            };
            RecordLoader::load_file(&path_for(reporter, *year), Some(&id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WORLD_PARTNER;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const HEADER: &str = "ReporterISO3,PartnerISO3,PartnerName,TradeFlowName,ProductCode,ProductDescription,TradeValue in 1000 USD,QuantityToken,Year\n";

    fn load(body: &str) -> Result<LoadedExtract, ParseError> {
        let data = format!("{HEADER}{body}");
        let id = ExtractId {
            reporter: "ROM".to_string(),
            year: 2011,
        };
        RecordLoader::load_reader(data.as_bytes(), Path::new("ROM_2011.csv"), Some(&id))
    }

    #[test]
    fn test_world_rows_are_dropped() {
        let extract = load(
            "ROM,DEU,Germany,Import,271011,Oils,100,Kg,2011\n\
             ROM,ITA,Italy,Import,271011,Oils,50,Kg,2011\n\
             ROM,WLD,World,Import,271011,Oils,9999,Kg,2011\n",
        )
        .unwrap();

        assert_eq!(extract.records.len(), 2);
        assert!(extract.records.iter().all(|r| r.partner != WORLD_PARTNER));
        assert_eq!(extract.stats.rows_read, 3);
        assert_eq!(extract.stats.world_rows_dropped, 1);
        assert_eq!(extract.stats.rows_kept, 2);
        let total: Decimal = extract.records.iter().map(|r| r.trade_value).sum();
        assert_eq!(total, dec!(150));
    }

    #[test]
    fn test_product_codes_are_six_characters_after_loading() {
        let extract = load(
            "ROM,DEU,Germany,Export,10111,Horses,12.5,Item,2011\n\
             ROM,DEU,Germany,Export,271011,Oils,3,Kg,2011\n\
             ROM,DEU,Germany,Export,2710,Oils,4,Kg,2011\n",
        )
        .unwrap();

        assert!(extract.records.iter().all(|r| r.product_code.len() == 6));
        assert_eq!(extract.records[0].product_code, "010111");
        assert_eq!(extract.records[1].product_code, "271011");
        assert_eq!(extract.stats.codes_padded, 1);
        assert_eq!(extract.stats.anomalous_rows_dropped, 1);
        assert_eq!(extract.warnings.len(), 1);
        assert_eq!(
            extract.warnings[0].kind,
            WarningKind::UnexpectedProductCodeLength
        );
        assert_eq!(extract.warnings[0].line, 4);
    }

    #[test]
    fn test_mismatched_reporter_is_flagged_but_kept() {
        let extract = load("BGR,DEU,Germany,Import,271011,Oils,1,Kg,2012\n").unwrap();
        assert_eq!(extract.records.len(), 1);
        let kinds: Vec<_> = extract.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![WarningKind::ReporterMismatch, WarningKind::YearMismatch]
        );
    }

    #[test]
    fn test_wrong_column_count_is_fatal() {
        let err = load("ROM,DEU,Germany,Import,271011,Oils,100,2011\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Schema {
                line: 2,
                expected: 9,
                found: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_non_numeric_value_is_fatal() {
        let err = load("ROM,DEU,Germany,Import,271011,Oils,lots,Kg,2011\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { ref column, .. } if column == "trade_value"));
    }

    #[test]
    fn test_unknown_flow_is_fatal() {
        let err = load("ROM,DEU,Germany,Re-Export,271011,Oils,1,Kg,2011\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFlow { .. }));
    }

    #[test]
    fn test_bad_header_is_fatal() {
        let err = RecordLoader::load_reader("a,b,c\n".as_bytes(), Path::new("x.csv"), None)
            .unwrap_err();
        assert!(matches!(err, ParseError::Schema { line: 1, .. }));
    }

    #[test]
    fn test_scientific_notation_values_parse() {
        let extract = load("ROM,DEU,Germany,Import,271011,Oils,1.5E3,Kg,2011\n").unwrap();
        assert_eq!(extract.records[0].trade_value, dec!(1500));
    }

    #[test]
    fn test_load_extracts_reads_each_file() {
        let dir = tempfile::tempdir().unwrap();
        for year in [2011, 2012] {
            let mut file = File::create(dir.path().join(format!("ROM_{year}.csv"))).unwrap();
            write!(
                file,
                "{HEADER}ROM,DEU,Germany,Import,271011,Oils,10,Kg,{year}\n"
            )
            .unwrap();
        }

        let extracts = load_extracts(
            &[("ROM".to_string(), 2011), ("ROM".to_string(), 2012)],
            |reporter, year| dir.path().join(format!("{reporter}_{year}.csv")),
        )
        .unwrap();

        assert_eq!(extracts.len(), 2);
        assert_eq!(extracts[1].records[0].year, 2012);
        assert!(extracts.iter().all(|e| e.warnings.is_empty()));
    }

    #[test]
    fn test_latin1_partner_name_is_kept_with_warning() {
        let mut data = HEADER.as_bytes().to_vec();
        data.extend_from_slice(b"ROM,CIV,C\xf4te d'Ivoire,Import,180100,Cocoa beans,42,Kg,2011\n");
        data.extend_from_slice(b"ROM,DEU,Germany,Import,271011,Oils,8,Kg,2011\n");
        let id = ExtractId {
            reporter: "ROM".to_string(),
            year: 2011,
        };

        let extract =
            RecordLoader::load_reader(data.as_slice(), Path::new("ROM_2011.csv"), Some(&id)).unwrap();

        assert_eq!(extract.records.len(), 2);
        assert_eq!(extract.records[0].partner, "CIV");
        assert_eq!(extract.records[0].partner_name, "C\u{FFFD}te d'Ivoire");
        assert_eq!(extract.records[0].trade_value, dec!(42));
        assert_eq!(extract.warnings.len(), 1);
        assert_eq!(extract.warnings[0].kind, WarningKind::InvalidTextEncoding);
        assert_eq!(extract.warnings[0].line, 2);
        assert!(extract.warnings[0].detail.contains("partner_name"));
    }

    #[test]
    fn test_non_utf8_key_column_is_fatal() {
        let mut data = HEADER.as_bytes().to_vec();
        data.extend_from_slice(b"ROM,D\xc9U,Germany,Import,271011,Oils,8,Kg,2011\n");

        let err = RecordLoader::load_reader(data.as_slice(), Path::new("ROM_2011.csv"), None)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidEncoding { line: 2, ref column, .. } if column == "partner"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RecordLoader::load_file(Path::new("/nonexistent/ROM_2011.csv"), None).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
