use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use jhe_core::{FlatRecord, RecordTable, flatten};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

impl OutputFormat {
    /// Writer format for tabular output; `None` renders a terminal table.
    fn writer_format(self) -> Option<jhe_core::OutputFormat> {
        match self {
            Self::Json => Some(jhe_core::OutputFormat::Json),
            Self::Csv => Some(jhe_core::OutputFormat::Csv),
            Self::Ndjson => Some(jhe_core::OutputFormat::Ndjson),
            Self::Table => None,
        }
    }
}

/// Print one API resource.
pub fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        OutputFormat::Table => {
            print_record(&flatten(value, ""));
            Ok(())
        }
        _ => print_table(&RecordTable::from_records([flatten(value, "")]), format),
    }
}

/// Print a list of API resources, flattening them for tabular formats.
pub fn print_values(values: &[Value], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(values)?);
        return Ok(());
    }
    let table: RecordTable = values.iter().map(|v| flatten(v, "")).collect();
    print_table(&table, format)
}

pub fn print_table(table: &RecordTable, format: OutputFormat) -> Result<()> {
    let Some(writer_format) = format.writer_format() else {
        print_as_table(table);
        return Ok(());
    };
    let mut out = io::stdout().lock();
    writer_format.writer().write(table, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn print_as_table(table: &RecordTable) {
    if table.is_empty() {
        println!("No records found.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.columns.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().map(ToString::to_string));
    }
    let rendered = builder.build().with(Style::rounded()).to_string();
    println!("{rendered}");
    println!("Rows: {}", table.len());
}

// Single resource: one row per field
fn print_record(record: &FlatRecord) {
    let mut builder = Builder::default();
    builder.push_record(["Field".to_string(), "Value".to_string()]);
    for (key, value) in record {
        builder.push_record([key.clone(), value.to_string()]);
    }
    let rendered = builder.build().with(Style::rounded()).to_string();
    println!("{rendered}");
}
