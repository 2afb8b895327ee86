use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tradeflow_core::ReportTable;

pub struct CsvStorage;

impl CsvStorage {
    /// Writes a report table to CSV: header row from the table's columns,
    /// then the rows in table order.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails
    pub fn write_table(path: &Path, table: &ReportTable) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }

        writer.flush()?;
        tracing::info!(file = %path.display(), rows = table.len(), table = %table.name, "wrote report");
        Ok(())
    }

    /// Writes any serializable value as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or serialization fails
    pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
        serde_json::to_writer_pretty(file, value)
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
        tracing::info!(file = %path.display(), "wrote JSON report");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_table_round_trips_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.csv");

        let mut table = ReportTable::new("summary", vec!["reporter".into(), "n".into()]);
        table.push_row(vec!["ROM".into(), "3".into()]);
        table.push_row(vec!["BGR, EU".into(), "1".into()]);
        CsvStorage::write_table(&path, &table).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "reporter,n\nROM,3\n\"BGR, EU\",1\n");
    }

    #[test]
    fn test_write_json_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.json");
        CsvStorage::write_json(&path, &serde_json::json!({"rows": 3})).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"rows\": 3"));
    }

    #[test]
    fn test_diagnostics_file_carries_match_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostics.json");
        let mut diag = tradeflow_core::RunDiagnostics::new();
        diag.record_join(
            "gdp",
            tradeflow_core::MatchStats {
                primary_rows: 4,
                matched_rows: 3,
                unmatched_rows: 1,
                reference_rows: 5,
                reference_rows_unused: 2,
            },
        );
        CsvStorage::write_json(&path, &diag).unwrap();

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["joins"]["gdp"]["match_rate"], serde_json::json!(0.75));
    }
}
