//! NDJSON and JSON array writers for tidied tables.

use std::io::Write;

use serde_json::Value;

use super::OutputWriter;
use crate::error::{Result, TidyError};
use crate::table::RecordTable;
use crate::value::FlatValue;

/// Convert a row to a JSON object, omitting null cells.
fn row_to_object(columns: &[String], row: &[FlatValue]) -> Value {
    let mut obj = serde_json::Map::new();
    for (column, value) in columns.iter().zip(row) {
        if !value.is_null() {
            obj.insert(column.clone(), value.to_json());
        }
    }
    Value::Object(obj)
}

/// NDJSON output writer.
///
/// Writes each row as a JSON object on a separate line.
#[derive(Debug, Clone, Default)]
pub struct NdjsonWriter {
    /// Whether to pretty-print each JSON object.
    pub pretty: bool,
}

impl NdjsonWriter {
    /// Create a new NDJSON writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty-printing of JSON objects.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl OutputWriter for NdjsonWriter {
    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }

    fn file_extension(&self) -> &'static str {
        "ndjson"
    }

    fn write(&self, table: &RecordTable, output: &mut dyn Write) -> Result<()> {
        for row in &table.rows {
            let obj = row_to_object(&table.columns, row);

            let line = if self.pretty {
                serde_json::to_string_pretty(&obj)
            } else {
                serde_json::to_string(&obj)
            }
            .map_err(|e| TidyError::Output(e.to_string()))?;

            writeln!(output, "{line}").map_err(|e| TidyError::Output(e.to_string()))?;
        }

        Ok(())
    }
}

/// JSON array output writer.
#[derive(Debug, Clone)]
pub struct JsonArrayWriter {
    /// Whether to pretty-print the array.
    pub pretty: bool,
}

impl Default for JsonArrayWriter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonArrayWriter {
    /// Create a new JSON array writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pretty-printing.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl OutputWriter for JsonArrayWriter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, table: &RecordTable, output: &mut dyn Write) -> Result<()> {
        let array: Vec<Value> = table
            .rows
            .iter()
            .map(|row| row_to_object(&table.columns, row))
            .collect();

        if self.pretty {
            serde_json::to_writer_pretty(&mut *output, &array)
        } else {
            serde_json::to_writer(&mut *output, &array)
        }
        .map_err(|e| TidyError::Output(e.to_string()))?;

        writeln!(output).map_err(|e| TidyError::Output(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FlatRecord;
    use serde_json::json;

    fn sample_table() -> RecordTable {
        let records: Vec<FlatRecord> = vec![
            [("id".to_string(), FlatValue::from(1i64)), ("unit".to_string(), FlatValue::from("MGDL"))]
                .into_iter()
                .collect(),
            [("id".to_string(), FlatValue::from(2i64))].into_iter().collect(),
        ];
        RecordTable::from_records(records)
    }

    #[test]
    fn test_ndjson_writer_skips_nulls() {
        let mut output = Vec::new();
        NdjsonWriter::new().write(&sample_table(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines, [json!({"id": 1, "unit": "MGDL"}), json!({"id": 2})]);
    }

    #[test]
    fn test_json_array_writer() {
        let mut output = Vec::new();
        JsonArrayWriter::new()
            .with_pretty(false)
            .write(&sample_table(), &mut output)
            .unwrap();

        let parsed: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed, json!([{"id": 1, "unit": "MGDL"}, {"id": 2}]));
    }
}
