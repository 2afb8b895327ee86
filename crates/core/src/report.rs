use serde::{Deserialize, Serialize};

/// A table handed to the reporting layer: fixed, named columns in a fixed
/// row order. Cells are pre-formatted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Panics
    ///
    /// Panics if the row width differs from the column count.
    pub fn push_row(&mut self, row: Vec<String>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width must match column count of table '{}'",
            self.name
        );
        self.rows.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }
}

/// Formats a float for reports; undefined values render as an empty cell.
#[must_use]
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_lookup_by_column_name() {
        let mut table = ReportTable::new("t", vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec!["1".to_string(), "2".to_string()]);
        assert_eq!(table.cell(0, "b"), Some("2"));
        assert_eq!(table.cell(0, "c"), None);
        assert_eq!(table.cell(1, "a"), None);
    }

    #[test]
    #[should_panic(expected = "row width")]
    fn test_push_row_rejects_wrong_width() {
        let mut table = ReportTable::new("t", vec!["a".to_string()]);
        table.push_row(vec![]);
    }

    #[test]
    fn test_format_number_blanks_nan() {
        assert_eq!(format_number(1.23456, 2), "1.23");
        assert_eq!(format_number(f64::NAN, 2), "");
    }
}
