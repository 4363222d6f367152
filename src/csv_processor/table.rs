use crate::utils::{Result, SheetTranslatorError};
use serde::{Deserialize, Serialize};

/// A fully materialised, ordered table. Every row is exactly as wide as
/// the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Table::new(raw.headers, raw.rows)
    }
}

impl Table {
    /// Short rows are padded with empty cells and cells beyond the last
    /// header are dropped.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Single-column convenience constructor.
    pub fn from_column(header: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            vec![header.into()],
            values.iter().map(|v| vec![v.to_string()]).collect(),
        )
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Writes `values` into the bound target column, appending it if the
    /// table does not have it yet.
    pub fn set_column(&mut self, binding: &ColumnBinding, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(SheetTranslatorError::Ingestion(format!(
                "column length {} does not match row count {}",
                values.len(),
                self.rows.len()
            )));
        }

        let idx = match binding.target {
            Some(idx) if idx < self.headers.len() => idx,
            Some(idx) => {
                return Err(SheetTranslatorError::Ingestion(format!(
                    "target column index {} is outside the header",
                    idx
                )))
            }
            None => {
                self.headers.push(binding.target_name.clone());
                self.headers.len() - 1
            }
        };

        let width = self.headers.len();
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.resize(width, String::new());
            row[idx] = value;
        }

        Ok(())
    }
}

/// Source and target columns resolved against a concrete table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    pub source: usize,
    pub target: Option<usize>,
    pub source_name: String,
    pub target_name: String,
}

impl ColumnBinding {
    pub fn resolve(table: &Table, source_column: &str, target_column: &str) -> Result<Self> {
        let source = table.column_index(source_column).ok_or_else(|| {
            SheetTranslatorError::Ingestion(format!(
                "Source column '{}' not found in the file. Available columns: {}",
                source_column,
                table.headers.join(", ")
            ))
        })?;

        Ok(Self {
            source,
            target: table.column_index(target_column),
            source_name: source_column.to_string(),
            target_name: target_column.to_string(),
        })
    }
}
