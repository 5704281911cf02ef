use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::time::{format_local, format_utc};

/// A single-level record with compound keys, in insertion order.
pub type FlatRecord = IndexMap<String, FlatValue>;

/// A scalar cell of a [`FlatRecord`]. Never a mapping or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Absolute instant, always held in UTC.
    Timestamp(OffsetDateTime),
    /// Wall-clock time as recorded, with no timezone.
    LocalTimestamp(PrimitiveDateTime),
}

impl FlatValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&OffsetDateTime> {
        match self {
            Self::Timestamp(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_local_timestamp(&self) -> Option<&PrimitiveDateTime> {
        match self {
            Self::LocalTimestamp(dt) => Some(dt),
            _ => None,
        }
    }

    /// JSON representation; timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Timestamp(_) | Self::LocalTimestamp(_) => Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for FlatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            // Values built outside the parser may lie beyond RFC 3339's years
            Self::Timestamp(dt) => match format_utc(dt) {
                Ok(rendered) => f.write_str(&rendered),
                Err(_) => write!(f, "{dt}"),
            },
            Self::LocalTimestamp(dt) => match format_local(dt) {
                Ok(rendered) => f.write_str(&rendered),
                Err(_) => write!(f, "{dt}"),
            },
        }
    }
}

impl Serialize for FlatValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Timestamp(_) | Self::LocalTimestamp(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for FlatValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FlatValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FlatValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// A borrowed view of a JSON value as scalar, mapping or sequence.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Scalar(&'a Value),
    Mapping(&'a Map<String, Value>),
    Sequence(&'a [Value]),
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Node::Mapping(map),
            Value::Array(items) => Node::Sequence(items),
            scalar => Node::Scalar(scalar),
        }
    }
}

impl Node<'_> {
    /// Convert a scalar leaf into a cell. Containers yield `None`.
    pub fn to_flat_value(&self) -> Option<FlatValue> {
        match self {
            Node::Scalar(Value::Null) => Some(FlatValue::Null),
            Node::Scalar(Value::Bool(b)) => Some(FlatValue::Bool(*b)),
            Node::Scalar(Value::Number(n)) => Some(FlatValue::Number(n.clone())),
            Node::Scalar(Value::String(s)) => Some(FlatValue::String(s.clone())),
            Node::Scalar(_) | Node::Mapping(_) | Node::Sequence(_) => None,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self, Node::Scalar(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_timestamps_serialize_as_strings() {
        let utc = FlatValue::Timestamp(datetime!(2025-02-16 01:28:33.271 UTC));
        let local = FlatValue::LocalTimestamp(datetime!(2025-02-15 17:28:33.271));

        assert_eq!(serde_json::to_value(&utc).unwrap(), json!("2025-02-16T01:28:33.271Z"));
        assert_eq!(serde_json::to_value(&local).unwrap(), json!("2025-02-15T17:28:33.271"));
        assert_eq!(local.to_json(), json!("2025-02-15T17:28:33.271"));
    }

    #[test]
    fn test_timestamp_beyond_rfc3339_years_still_renders() {
        let date = time::Date::from_calendar_date(-1, time::Month::December, 31).unwrap();
        let utc = FlatValue::Timestamp(date.midnight().assume_utc());
        let local = FlatValue::LocalTimestamp(date.midnight());

        assert!(!utc.to_string().is_empty());
        assert!(local.to_json().is_string());
        assert!(serde_json::to_value(&utc).unwrap().is_string());
    }

    #[test]
    fn test_null_displays_empty() {
        assert_eq!(FlatValue::Null.to_string(), "");
        assert_eq!(serde_json::to_value(FlatValue::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_node_classification() {
        let obj = json!({"a": 1});
        let arr = json!([1, 2]);
        let num = json!(97);

        assert!(matches!(Node::from(&obj), Node::Mapping(_)));
        assert!(matches!(Node::from(&arr), Node::Sequence(_)));
        assert_eq!(Node::from(&num).to_flat_value(), Some(FlatValue::from(97i64)));
        assert_eq!(Node::from(&obj).to_flat_value(), None);
    }
}
