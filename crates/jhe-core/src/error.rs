use thiserror::Error;

/// Errors raised while tidying a single observation.
///
/// Tidying is all-or-nothing per record: any of these aborts the record
/// without producing a partial row.
#[derive(Debug, Error)]
pub enum TidyError {
    #[error("Unrecognized contentType={content_type} in observation {id}")]
    UnsupportedContentType { id: String, content_type: String },

    #[error("Malformed attachment payload: {0}")]
    MalformedPayload(String),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid timestamp in {key}: {value}")]
    InvalidTimestamp { key: String, value: String },

    #[error("Header and body both define {key}")]
    KeyCollision { key: String },

    #[error("Output error: {0}")]
    Output(String),
}

impl TidyError {
    /// Create a new UnsupportedContentType error
    pub fn unsupported_content_type(id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::UnsupportedContentType {
            id: id.into(),
            content_type: content_type.into(),
        }
    }

    /// Create a new MalformedPayload error
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Create a new MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a new InvalidTimestamp error
    pub fn invalid_timestamp(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a new KeyCollision error
    pub fn key_collision(key: impl Into<String>) -> Self {
        Self::KeyCollision { key: key.into() }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedContentType { .. } => ErrorCategory::Unsupported,
            Self::MalformedPayload(_) => ErrorCategory::Decoding,
            Self::MissingField { .. } | Self::InvalidTimestamp { .. } => ErrorCategory::Validation,
            Self::KeyCollision { .. } => ErrorCategory::Conflict,
            Self::Output(_) => ErrorCategory::Output,
        }
    }
}

impl From<base64::DecodeError> for TidyError {
    fn from(err: base64::DecodeError) -> Self {
        Self::MalformedPayload(format!("base64: {err}"))
    }
}

impl From<serde_json::Error> for TidyError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(format!("json: {err}"))
    }
}

/// Error categories for logging and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unsupported,
    Decoding,
    Validation,
    Conflict,
    Output,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::Decoding => write!(f, "decoding"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Convenience result type for tidying operations
pub type Result<T> = std::result::Result<T, TidyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_content_type_message() {
        let err = TidyError::unsupported_content_type("64914", "text/plain");
        assert_eq!(
            err.to_string(),
            "Unrecognized contentType=text/plain in observation 64914"
        );
        assert_eq!(err.category(), ErrorCategory::Unsupported);
    }

    #[test]
    fn test_missing_field_keeps_path() {
        let err = TidyError::missing_field("code.coding[0]");
        assert!(err.to_string().contains("code.coding[0]"));
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let err: TidyError = json_err.into();

        assert!(matches!(err, TidyError::MalformedPayload(_)));
        assert_eq!(err.category(), ErrorCategory::Decoding);
    }

    #[test]
    fn test_base64_error_conversion() {
        use base64::Engine;
        let b64_err = base64::engine::general_purpose::STANDARD
            .decode("not base64!")
            .unwrap_err();
        let err: TidyError = b64_err.into();

        assert!(matches!(err, TidyError::MalformedPayload(ref msg) if msg.starts_with("base64")));
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Unsupported.to_string(), "unsupported");
        assert_eq!(ErrorCategory::Decoding.to_string(), "decoding");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
        assert_eq!(ErrorCategory::Output.to_string(), "output");
    }

    #[test]
    fn test_key_collision_category() {
        let err = TidyError::key_collision("uuid");
        assert_eq!(err.to_string(), "Header and body both define uuid");
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }
}
