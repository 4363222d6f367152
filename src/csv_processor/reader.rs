use crate::csv_processor::table::Table;
use crate::utils::{Result, SheetTranslatorError};
use csv::StringRecord;
use std::path::PathBuf;

pub struct CsvStreamReader {
    path: PathBuf,
}

impl CsvStreamReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the whole file into memory. Every failure, including a missing
    /// file, is reported as an ingestion error.
    pub fn read_table(&self) -> Result<Table> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            SheetTranslatorError::Ingestion(format!(
                "Error reading file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| SheetTranslatorError::Ingestion(format!("Error reading header: {}", e)))?;
        let headers = string_record_to_vec(headers);

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(SheetTranslatorError::Ingestion(
                "File has no header row".to_string(),
            ));
        }

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                SheetTranslatorError::Ingestion(format!("Error reading row {}: {}", index + 1, e))
            })?;
            rows.push(string_record_to_vec(&record));
        }

        Ok(Table::new(headers, rows))
    }

    /// Async wrapper that keeps blocking file I/O off the runtime threads.
    pub async fn read_table_async(self) -> Result<Table> {
        tokio::task::spawn_blocking(move || self.read_table())
            .await
            .map_err(|e| SheetTranslatorError::Ingestion(format!("Reader task failed: {}", e)))?
    }
}

pub fn string_record_to_vec(record: &StringRecord) -> Vec<String> {
    record.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_headers_and_rows_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source,notes").unwrap();
        writeln!(file, "Hello,a").unwrap();
        writeln!(file, ",b").unwrap();
        writeln!(file, "42").unwrap();

        let table = CsvStreamReader::new(file.path()).read_table().unwrap();

        assert_eq!(table.headers(), ["source", "notes"]);
        assert_eq!(table.column_values("source").unwrap(), vec!["Hello", "", "42"]);
        assert_eq!(table.cell(2, 1), Some(""));
    }

    #[test]
    fn missing_file_is_an_ingestion_error() {
        let err = CsvStreamReader::new("/nonexistent/input.csv")
            .read_table()
            .unwrap_err();
        assert!(matches!(err, SheetTranslatorError::Ingestion(_)));
    }

    #[test]
    fn empty_file_is_an_ingestion_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = CsvStreamReader::new(file.path()).read_table().unwrap_err();
        assert!(matches!(err, SheetTranslatorError::Ingestion(_)));
    }
}
