//! Observation tidying: one exchange Observation in, one flat row out.
//!
//! The observation's `valueAttachment` carries a base64 JSON payload in one of
//! two shapes. Modern payloads split into `{"header": ..., "body": ...}`;
//! legacy payloads are a bare object treated entirely as body. The envelope,
//! header and body are flattened and merged in that order, later keys winning,
//! and every `*date_time` field is then split into a UTC instant and a naive
//! local companion under `<key>_local`.
//!
//! ```text
//! {
//!     "resource_type": "omh:blood-glucose:4.0",
//!     "code": "omh:blood-glucose:4.0",
//!     "resourceType": "Observation",
//!     "id": 64914,
//!     "meta_lastUpdated": 2025-03-12T16:00:50.952478Z,
//!     "identifier_0_value": "u-u-i-d-4",
//!     "subject_reference": "Patient/46007",
//!     "code_coding_0_code": "omh:blood-glucose:4.0",
//!     "schema_id_name": "blood-glucose",
//!     "blood_glucose_unit": "MGDL",
//!     "blood_glucose_value": 97,
//!     "effective_time_frame_date_time": 2025-02-16T01:28:33.271Z,
//!     "effective_time_frame_date_time_local": 2025-02-15T17:28:33.271,
//! }
//! ```

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};

use crate::error::{Result, TidyError};
use crate::flatten::{flatten, flatten_entries, merge};
use crate::time::RecordedTimestamp;
use crate::value::{FlatRecord, FlatValue, Node};

/// Envelope key holding the encoded payload; consumed, never flattened.
pub const ATTACHMENT_KEY: &str = "valueAttachment";

const DATE_TIME_SUFFIX: &str = "date_time";
const LOCAL_SUFFIX: &str = "_local";
const LAST_UPDATED_KEY: &str = "meta_lastUpdated";

/// Standard alphabet, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The decoded attachment payload, split into header and body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub header: Value,
    pub body: Value,
}

impl DecodedPayload {
    /// Base64-decode and parse an attachment's `data` field.
    pub fn decode(data: &str) -> Result<Self> {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = PAYLOAD_ENGINE.decode(compact)?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        Self::from_value(payload)
    }

    /// Split a parsed payload. Without a `body` key the whole object is body.
    pub fn from_value(payload: Value) -> Result<Self> {
        let Value::Object(mut payload) = payload else {
            return Err(TidyError::malformed_payload("payload is not a JSON object"));
        };

        let (header, body) = match payload.remove("body") {
            Some(body) => {
                let header = payload
                    .remove("header")
                    .unwrap_or_else(|| Value::Object(Map::new()));
                (header, body)
            }
            None => (Value::Object(Map::new()), Value::Object(payload)),
        };

        for (part, value) in [("header", &header), ("body", &body)] {
            if !Node::from(value).is_container() {
                return Err(TidyError::malformed_payload(format!(
                    "payload {part} is not an object or array"
                )));
            }
        }

        Ok(Self { header, body })
    }
}

/// Converts raw exchange observations into flat records.
#[derive(Debug, Clone, Default)]
pub struct Tidier {
    /// Reject payloads whose header and body flatten to a shared key.
    pub strict: bool,
}

impl Tidier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict namespace checking between header and body.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Tidy a single observation. The input is only read, never modified.
    pub fn tidy(&self, observation: &Value) -> Result<FlatRecord> {
        let id = require(observation, "id", "id")?;
        let attachment = require(observation, ATTACHMENT_KEY, ATTACHMENT_KEY)?;
        let content_type = require(attachment, "contentType", "valueAttachment.contentType")?;

        let content_type = match content_type {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !content_type.contains("json") {
            return Err(TidyError::unsupported_content_type(
                display_id(id),
                content_type,
            ));
        }

        let data = require(attachment, "data", "valueAttachment.data")?
            .as_str()
            .ok_or_else(|| TidyError::malformed_payload("valueAttachment.data is not a string"))?;
        let payload = DecodedPayload::decode(data)?;

        let code = extract_code(observation)?;
        let mut record = FlatRecord::new();
        record.insert("resource_type".to_string(), code.clone());
        record.insert("code".to_string(), code);

        if let Value::Object(envelope) = observation {
            flatten_entries(
                &mut record,
                envelope
                    .iter()
                    .filter(|(key, _)| key.as_str() != ATTACHMENT_KEY)
                    .map(|(key, value)| (key.as_str(), value)),
                "",
            );
        }

        let header = flatten(&payload.header, "");
        let body = flatten(&payload.body, "");
        if self.strict
            && let Some(key) = header.keys().find(|key| body.contains_key(*key))
        {
            return Err(TidyError::key_collision(key.clone()));
        }
        merge(&mut record, header);
        merge(&mut record, body);

        normalize_timestamps(&mut record)?;

        tracing::trace!(id = %display_id(id), fields = record.len(), "tidied observation");
        Ok(record)
    }

    /// Tidy each observation independently; one failure does not affect the rest.
    pub fn tidy_batch<'a, I>(&self, observations: I) -> Vec<Result<FlatRecord>>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        observations.into_iter().map(|obs| self.tidy(obs)).collect()
    }
}

/// Tidy a single observation with default options.
pub fn tidy_observation(observation: &Value) -> Result<FlatRecord> {
    Tidier::new().tidy(observation)
}

fn require<'a>(value: &'a Value, key: &str, path: &str) -> Result<&'a Value> {
    value.get(key).ok_or_else(|| TidyError::missing_field(path))
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `code.coding[0].code`; any later codings are ignored.
fn extract_code(observation: &Value) -> Result<FlatValue> {
    let coding = require(observation, "code", "code")?;
    let coding = require(coding, "coding", "code.coding")?;
    let first = coding
        .get(0)
        .ok_or_else(|| TidyError::missing_field("code.coding[0]"))?;
    let code = require(first, "code", "code.coding[0].code")?;
    Node::from(code)
        .to_flat_value()
        .ok_or_else(|| TidyError::missing_field("code.coding[0].code"))
}

fn normalize_timestamps(record: &mut FlatRecord) -> Result<()> {
    let keys: Vec<String> = record
        .keys()
        .filter(|key| key.ends_with(DATE_TIME_SUFFIX))
        .cloned()
        .collect();

    for key in keys {
        let Some(recorded) = parse_timestamp(&key, &record[&key])? else {
            record.insert(format!("{key}{LOCAL_SUFFIX}"), FlatValue::Null);
            continue;
        };
        record.insert(key.clone(), FlatValue::Timestamp(recorded.utc()));
        record.insert(
            format!("{key}{LOCAL_SUFFIX}"),
            FlatValue::LocalTimestamp(recorded.local()),
        );
    }

    if let Some(value) = record.get(LAST_UPDATED_KEY)
        && let Some(recorded) = parse_timestamp(LAST_UPDATED_KEY, value)?
    {
        record.insert(
            LAST_UPDATED_KEY.to_string(),
            FlatValue::Timestamp(recorded.utc()),
        );
    }

    Ok(())
}

/// Parse a cell as a timestamp. Null stays null.
fn parse_timestamp(key: &str, value: &FlatValue) -> Result<Option<RecordedTimestamp>> {
    match value {
        FlatValue::Null => Ok(None),
        FlatValue::String(s) => s
            .parse()
            .map(Some)
            .map_err(|_| TidyError::invalid_timestamp(key, s.as_str())),
        other => Err(TidyError::invalid_timestamp(key, other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn encode(payload: &Value) -> String {
        base64::engine::general_purpose::STANDARD.encode(payload.to_string())
    }

    fn observation(payload: &Value) -> Value {
        json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "status": "final",
            "code": {"coding": [{"system": "https://w3id.org/openmhealth", "code": "omh:heart-rate:2.0"}]},
            "valueAttachment": {"contentType": "application/json", "data": encode(payload)},
        })
    }

    #[test]
    fn test_decode_modern_payload() {
        let decoded = DecodedPayload::from_value(json!({"header": {"uuid": "h"}, "body": {"v": 1}}))
            .unwrap();
        assert_eq!(decoded.header, json!({"uuid": "h"}));
        assert_eq!(decoded.body, json!({"v": 1}));
    }

    #[test]
    fn test_decode_body_without_header() {
        let decoded = DecodedPayload::from_value(json!({"body": {"v": 1}})).unwrap();
        assert_eq!(decoded.header, json!({}));
        assert_eq!(decoded.body, json!({"v": 1}));
    }

    #[test]
    fn test_decode_legacy_payload() {
        let legacy = json!({"blood_glucose": {"value": 97, "unit": "MGDL"}});
        let decoded = DecodedPayload::from_value(legacy.clone()).unwrap();
        assert_eq!(decoded.header, json!({}));
        assert_eq!(decoded.body, legacy);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            DecodedPayload::from_value(json!([1, 2])),
            Err(TidyError::MalformedPayload(_))
        ));
        assert!(matches!(
            DecodedPayload::from_value(json!({"body": 5})),
            Err(TidyError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_missing_padding() {
        let data = encode(&json!({"body": {"a": 1}}));
        let wrapped = format!("{}\n{}", &data[..8], data[8..].trim_end_matches('='));
        let decoded = DecodedPayload::decode(&wrapped).unwrap();
        assert_eq!(decoded.body, json!({"a": 1}));
    }

    #[test]
    fn test_code_is_seeded_first() {
        let record = tidy_observation(&observation(&json!({"body": {}}))).unwrap();
        let keys: Vec<&str> = record.keys().take(2).map(String::as_str).collect();
        assert_eq!(keys, ["resource_type", "code"]);
        assert_eq!(record["code"], FlatValue::from("omh:heart-rate:2.0"));
        assert!(!record.contains_key("valueAttachment_data"));
    }

    #[test]
    fn test_body_overrides_header_overrides_envelope() {
        let payload = json!({
            "header": {"status": "from-header", "uuid": "h"},
            "body": {"uuid": "b"},
        });
        let record = tidy_observation(&observation(&payload)).unwrap();
        assert_eq!(record["status"], FlatValue::from("from-header"));
        assert_eq!(record["uuid"], FlatValue::from("b"));
    }

    #[test]
    fn test_strict_mode_rejects_collisions() {
        let payload = json!({"header": {"uuid": "h"}, "body": {"uuid": "b"}});
        let err = Tidier::new()
            .strict(true)
            .tidy(&observation(&payload))
            .unwrap_err();
        assert!(matches!(err, TidyError::KeyCollision { ref key } if key == "uuid"));
    }

    #[test]
    fn test_null_date_time_stays_null() {
        let payload = json!({"body": {"effective_time_frame": {"date_time": null}}});
        let record = tidy_observation(&observation(&payload)).unwrap();
        assert!(record["effective_time_frame_date_time"].is_null());
        assert!(record["effective_time_frame_date_time_local"].is_null());
    }

    #[test]
    fn test_invalid_date_time_is_rejected() {
        let payload = json!({"body": {"creation_date_time": "last tuesday"}});
        let err = tidy_observation(&observation(&payload)).unwrap_err();
        assert!(
            matches!(err, TidyError::InvalidTimestamp { ref key, .. } if key == "creation_date_time")
        );
    }

    #[test]
    fn test_numeric_date_time_is_rejected() {
        let payload = json!({"body": {"effective_time_frame": {"date_time": 1739669313271i64}}});
        let err = tidy_observation(&observation(&payload)).unwrap_err();
        assert!(matches!(
            err,
            TidyError::InvalidTimestamp { ref value, .. } if value == "1739669313271"
        ));
    }

    #[test]
    fn test_last_updated_has_no_local_companion() {
        let mut obs = observation(&json!({"body": {}}));
        obs["meta"] = json!({"lastUpdated": "2025-03-12T17:00:50.952478+01:00"});
        let record = tidy_observation(&obs).unwrap();
        assert_eq!(
            record["meta_lastUpdated"],
            FlatValue::Timestamp(datetime!(2025-03-12 16:00:50.952478 UTC))
        );
        assert!(!record.contains_key("meta_lastUpdated_local"));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let good = observation(&json!({"body": {}}));
        let mut bad = good.clone();
        bad["valueAttachment"]["contentType"] = json!("text/plain");

        let results = Tidier::new().tidy_batch([&good, &bad, &good]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(TidyError::UnsupportedContentType { .. })
        ));
        assert!(results[2].is_ok());
    }
}
