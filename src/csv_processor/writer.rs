use crate::csv_processor::table::Table;
use crate::utils::{Result, SheetTranslatorError};
use csv::Writer;
use std::io::Write;

/// Writes cells verbatim, so reading the output back yields the same table.
pub struct CsvStreamWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> CsvStreamWriter<W> {
    pub fn new(inner: W, headers: &[String]) -> Result<Self> {
        let mut writer = Writer::from_writer(inner);
        writer.write_record(headers)?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.writer.write_record(row)?;
        Ok(())
    }

    pub fn write_rows(&mut self, rows: &[Vec<String>]) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| SheetTranslatorError::IoError(e.into_error()))
    }
}

/// Serialises a table into an in-memory CSV document.
pub fn table_to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut writer = CsvStreamWriter::new(Vec::new(), table.headers())?;
    writer.write_rows(table.rows())?;
    writer.finish()
}
