//! Timestamp parsing and rendering for tidied records.
//!
//! Observation payloads carry ISO 8601 strings with assorted offsets. Each one
//! is split into the wall-clock time as recorded and the offset (if any) so
//! callers can derive both the absolute UTC instant and the naive local time.

use std::str::FromStr;

use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::{format_description, time};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Years that RFC 3339 can render.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// A parsed timestamp that remembers the offset it was recorded with.
///
/// Both the wall clock and the UTC instant fall within years 0000-9999, so
/// either can always be rendered as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTimestamp {
    wall: PrimitiveDateTime,
    offset: Option<UtcOffset>,
    utc: OffsetDateTime,
}

/// Error returned when a string is not a usable timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampParseError {
    #[error("unrecognized timestamp '{0}'")]
    Unrecognized(String),

    #[error("timestamp '{0}' is outside years 0000-9999")]
    OutOfRange(String),
}

impl RecordedTimestamp {
    /// Validate a wall clock and offset pair.
    ///
    /// # Errors
    ///
    /// `OutOfRange` when the wall clock or its UTC instant leaves years 0000-9999.
    pub fn new(
        wall: PrimitiveDateTime,
        offset: Option<UtcOffset>,
    ) -> Result<Self, TimestampParseError> {
        let out_of_range = || TimestampParseError::OutOfRange(format!("{wall} {offset:?}"));

        let shift = Duration::seconds(offset.map_or(0, |o| i64::from(o.whole_seconds())));
        let utc_wall = wall.checked_sub(shift).ok_or_else(out_of_range)?;
        if !in_range(wall.year()) || !in_range(utc_wall.year()) {
            return Err(out_of_range());
        }

        Ok(Self {
            wall,
            offset,
            utc: utc_wall.assume_utc(),
        })
    }

    /// Wall-clock time exactly as recorded, with no offset applied.
    pub fn local(&self) -> PrimitiveDateTime {
        self.wall
    }

    /// The recorded offset, or `None` for naive input.
    pub fn offset(&self) -> Option<UtcOffset> {
        self.offset
    }

    /// The absolute instant in UTC. Naive input is taken to be UTC already.
    pub fn utc(&self) -> OffsetDateTime {
        self.utc
    }
}

fn in_range(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

impl FromStr for RecordedTimestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let checked = |wall, offset| {
            Self::new(wall, offset).map_err(|_| TimestampParseError::OutOfRange(s.to_string()))
        };

        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
        {
            return checked(PrimitiveDateTime::new(dt.date(), dt.time()), Some(dt.offset()));
        }

        let spaced = format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
        );
        if let Ok(wall) = PrimitiveDateTime::parse(s, &Iso8601::DEFAULT)
            .or_else(|_| PrimitiveDateTime::parse(s, spaced))
        {
            return checked(wall, None);
        }

        if let Ok(date) = Date::parse(s, &Iso8601::DEFAULT) {
            return checked(PrimitiveDateTime::new(date, time!(00:00)), None);
        }

        Err(TimestampParseError::Unrecognized(s.to_string()))
    }
}

/// Render a UTC instant as RFC 3339 with a `Z` suffix.
pub fn format_utc(dt: &OffsetDateTime) -> Result<String, time::error::Format> {
    let shift = Duration::seconds(i64::from(dt.offset().whole_seconds()));
    PrimitiveDateTime::new(dt.date(), dt.time())
        .checked_sub(shift)
        .ok_or(time::error::Format::InvalidComponent("year"))?
        .assume_utc()
        .format(&Rfc3339)
}

/// Render a naive timestamp as RFC 3339 without any offset designator.
pub fn format_local(dt: &PrimitiveDateTime) -> Result<String, time::error::Format> {
    let rendered = dt.assume_utc().format(&Rfc3339)?;
    Ok(rendered.trim_end_matches('Z').to_string())
}
