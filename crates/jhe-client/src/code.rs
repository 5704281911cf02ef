use std::fmt;
use std::str::FromStr;

/// Coding system for Open mHealth observation codes.
pub const OPENMHEALTH_SYSTEM: &str = "https://w3id.org/openmhealth";

/// Open mHealth schema codes used to filter observations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    BloodGlucose,
    BloodPressure,
    HeartRate,
    /// Any other `namespace:name:version` code.
    Other(String),
}

impl Code {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BloodGlucose => "omh:blood-glucose:4.0",
            Self::BloodPressure => "omh:blood-pressure:4.0",
            Self::HeartRate => "omh:heart-rate:2.0",
            Self::Other(code) => code,
        }
    }

    /// Token for a FHIR `code` search parameter.
    pub fn search_token(&self) -> String {
        format!("{OPENMHEALTH_SYSTEM}|{}", self.as_str())
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Code {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "omh:blood-glucose:4.0" => Self::BloodGlucose,
            "omh:blood-pressure:4.0" => Self::BloodPressure,
            "omh:heart-rate:2.0" => Self::HeartRate,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(code) => code,
            Err(never) => match never {},
        }
    }
}
