use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use jhe_core::{RecordTable, Tidier};
use serde_json::Value;

use crate::cli::{OutputFormat, TidyArgs};
use crate::output::print_table;

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// Split input into observations: one resource, a JSON array, a Bundle or NDJSON.
fn parse_observations(content: &str) -> Result<Vec<Value>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(value) if value.get("resourceType").and_then(Value::as_str) == Some("Bundle") => {
            Ok(value
                .get("entry")
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get("resource").cloned())
                        .collect()
                })
                .unwrap_or_default())
        }
        Ok(value) => Ok(vec![value]),
        Err(_) => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", n + 1))
            })
            .collect(),
    }
}

pub fn tidy(args: &TidyArgs, format: OutputFormat) -> Result<()> {
    let content = read_input(args.file.as_deref())?;
    let observations = parse_observations(&content)?;
    tracing::debug!(count = observations.len(), "read observations");

    let tidier = Tidier::new().strict(args.strict);
    let mut records = Vec::with_capacity(observations.len());
    for (index, result) in tidier.tidy_batch(&observations).into_iter().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(index, category = %e.category(), "skipping observation: {e}");
            }
        }
    }

    print_table(&RecordTable::from_records(records), format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_single_and_array() {
        let single = parse_observations(r#"{"id": 1}"#).unwrap();
        assert_eq!(single, [json!({"id": 1})]);

        let array = parse_observations(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(array.len(), 2);
    }

    #[test]
    fn test_parse_bundle() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [{"resource": {"id": 1}}, {"resource": {"id": 2}}, {"fullUrl": "x"}],
        });
        let items = parse_observations(&bundle.to_string()).unwrap();
        assert_eq!(items, [json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn test_parse_ndjson() {
        let items = parse_observations("{\"id\": 1}\n\n{\"id\": 2}\n").unwrap();
        assert_eq!(items, [json!({"id": 1}), json!({"id": 2})]);

        let err = parse_observations("{\"id\": 1}\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_observations("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"id\": 7}}").unwrap();

        let content = read_input(Some(file.path())).unwrap();
        assert_eq!(parse_observations(&content).unwrap(), [json!({"id": 7})]);
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Some(Path::new("/nonexistent/observations.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
