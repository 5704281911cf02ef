//! Page shapes returned by the exchange's list endpoints.
//!
//! REST endpoints wrap items as `{"count": .., "next": url, "results": [..]}`;
//! FHIR searches return a Bundle whose `link` array carries the `next` page.

use serde_json::Value;

use crate::error::{ClientError, Result};

/// Response layout of a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    Rest,
    Fhir,
}

impl PageStyle {
    pub fn page_size_param(&self) -> &'static str {
        match self {
            Self::Rest => "pageSize",
            Self::Fhir => "_count",
        }
    }

    /// Split a response body into items and the link to the next page.
    pub fn parse(&self, body: Value) -> Result<Page> {
        match self {
            Self::Rest => parse_rest(body),
            Self::Fhir => parse_bundle(body),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Absolute or relative URL of the following page.
    pub next: Option<String>,
}

fn parse_rest(body: Value) -> Result<Page> {
    match body {
        // Unpaginated endpoints return a bare array
        Value::Array(items) => Ok(Page { items, next: None }),
        Value::Object(mut obj) => {
            let items = match obj.remove("results") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(ClientError::unexpected_response(format!(
                        "expected 'results' array, got {other}"
                    )));
                }
            };
            let next = obj.remove("next").and_then(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            });
            Ok(Page { items, next })
        }
        other => Err(ClientError::unexpected_response(format!(
            "unexpected list response: {other}"
        ))),
    }
}

fn parse_bundle(body: Value) -> Result<Page> {
    if body.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
        return Err(ClientError::unexpected_response(
            "expected a FHIR Bundle from search",
        ));
    }

    let items = body
        .get("entry")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("resource").cloned())
                .collect()
        })
        .unwrap_or_default();

    let next = body
        .get("link")
        .and_then(Value::as_array)
        .and_then(|links| {
            links
                .iter()
                .find(|link| link.get("relation").and_then(Value::as_str) == Some("next"))
        })
        .and_then(|link| link.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Page { items, next })
}
