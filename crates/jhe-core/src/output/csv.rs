//! CSV output writer for tidied tables.

use std::io::Write;

use super::OutputWriter;
use crate::error::{Result, TidyError};
use crate::table::RecordTable;

/// CSV output writer configuration.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    /// Whether to include a header row.
    pub include_header: bool,

    /// Field delimiter (default: comma).
    pub delimiter: u8,

    /// Quote character (default: double quote).
    pub quote: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            include_header: true,
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl CsvWriter {
    /// Create a new CSV writer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include a header row.
    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character.
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }
}

fn output_error(e: impl std::fmt::Display) -> TidyError {
    TidyError::Output(e.to_string())
}

impl OutputWriter for CsvWriter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, table: &RecordTable, output: &mut dyn Write) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(false)
            .from_writer(output);

        if self.include_header {
            writer.write_record(&table.columns).map_err(output_error)?;
        }

        // Nulls render as empty cells
        for row in &table.rows {
            writer
                .write_record(row.iter().map(|value| value.to_string()))
                .map_err(output_error)?;
        }

        writer.flush().map_err(output_error)?;

        Ok(())
    }
}
