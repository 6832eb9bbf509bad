//! Time offset parsing for segment boundaries.
//!
//! Offsets arrive as whole seconds. Clients that skip their own conversion may
//! send `HH:MM:SS`, `MM:SS` or `SS` strings instead; both forms deserialize to
//! [`TimeOffset`].

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, StringValidation, SubschemaValidation};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_OFFSET_SECS: u64 = 86_400;

/// A position in the source video, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TimeOffset(pub u64);

/// Accepted on input as either whole seconds or a clock string.
impl JsonSchema for TimeOffset {
    fn schema_name() -> String {
        "TimeOffset".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        let clock = SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            string: Some(Box::new(StringValidation {
                pattern: Some(r"^\s*\d+(:\d+){0,2}\s*$".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        };

        SchemaObject {
            subschemas: Some(Box::new(SubschemaValidation {
                any_of: Some(vec![gen.subschema_for::<u64>(), clock.into()]),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}

impl TimeOffset {
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TimeOffset {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl std::fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TimeOffset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawOffset {
            Seconds(u64),
            Text(String),
        }

        match RawOffset::deserialize(deserializer)? {
            RawOffset::Seconds(secs) => Ok(TimeOffset(secs)),
            RawOffset::Text(text) => parse_offset(&text)
                .map(TimeOffset)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Parse a timestamp string to whole seconds.
///
/// Supports formats:
/// - `HH:MM:SS`
/// - `MM:SS`
/// - `SS`
///
/// # Examples
/// ```
/// use segcut_models::timestamp::parse_offset;
/// assert_eq!(parse_offset("01:30:00").unwrap(), 5400);
/// assert_eq!(parse_offset("05:30").unwrap(), 330);
/// assert_eq!(parse_offset("90").unwrap(), 90);
/// ```
pub fn parse_offset(ts: &str) -> Result<u64, OffsetError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(OffsetError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(OffsetError::InvalidFormat(ts.to_string()));
    }

    // Components are read right to left: seconds, minutes, hours
    let names = ["seconds", "minutes", "hours"];
    let multipliers = [1, 60, 3600];

    let mut total = 0u64;
    for (idx, part) in parts.iter().rev().enumerate() {
        let value = parse_component(names[idx], part)?;
        total = value
            .checked_mul(multipliers[idx])
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| OffsetError::OutOfRange(ts.to_string()))?;
    }

    if total > MAX_OFFSET_SECS {
        return Err(OffsetError::OutOfRange(ts.to_string()));
    }

    Ok(total)
}

fn parse_component(name: &'static str, part: &str) -> Result<u64, OffsetError> {
    let part = part.trim();
    if part.starts_with('-') {
        return Err(OffsetError::Negative);
    }
    if part.contains('.') {
        return Err(OffsetError::Fractional(part.to_string()));
    }
    part.parse()
        .map_err(|_| OffsetError::InvalidValue(name, part.to_string()))
}

/// Format seconds into HH:MM:SS.
pub fn format_offset(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Offset parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OffsetError {
    #[error("Timestamp cannot be empty")]
    Empty,
    #[error("Timestamp cannot be negative")]
    Negative,
    #[error("Fractional seconds are not supported: {0}")]
    Fractional(String),
    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, MM:SS, or whole seconds")]
    InvalidFormat(String),
    #[error("Timestamp '{0}' exceeds the maximum allowed duration (24 hours)")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset_formats() {
        assert_eq!(parse_offset("00:00:00").unwrap(), 0);
        assert_eq!(parse_offset("01:30:45").unwrap(), 5445);
        assert_eq!(parse_offset("53:53").unwrap(), 3233);
        assert_eq!(parse_offset("90").unwrap(), 90);
    }

    #[test]
    fn test_parse_offset_errors() {
        assert_eq!(parse_offset(""), Err(OffsetError::Empty));
        assert_eq!(parse_offset("  "), Err(OffsetError::Empty));
        assert_eq!(parse_offset("-5"), Err(OffsetError::Negative));
        assert!(matches!(parse_offset("00:00:30.5"), Err(OffsetError::Fractional(_))));
        assert!(matches!(parse_offset("abc"), Err(OffsetError::InvalidValue("seconds", _))));
        assert!(matches!(parse_offset("1:2:3:4"), Err(OffsetError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_offset_rejects_overflow_and_huge_values() {
        assert!(matches!(
            parse_offset("5124095576030432:00:16"),
            Err(OffsetError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_offset("9999999999999999:00:00"),
            Err(OffsetError::OutOfRange(_))
        ));
        assert!(matches!(parse_offset("24:00:01"), Err(OffsetError::OutOfRange(_))));
        assert_eq!(parse_offset("24:00:00").unwrap(), MAX_OFFSET_SECS);

        assert!(serde_json::from_str::<TimeOffset>("\"5124095576030432:00:16\"").is_err());
    }

    #[test]
    fn test_schema_accepts_seconds_or_clock() {
        let schema = serde_json::to_value(schemars::schema_for!(TimeOffset)).unwrap();
        let variants = schema["anyOf"].as_array().unwrap();
        assert_eq!(variants.len(), 2);
        assert!(variants.iter().any(|v| v["type"] == "integer"));
        assert!(variants.iter().any(|v| v["type"] == "string"));
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "00:00:00");
        assert_eq!(format_offset(90), "00:01:30");
        assert_eq!(format_offset(3661), "01:01:01");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let n: TimeOffset = serde_json::from_str("10").unwrap();
        assert_eq!(n, TimeOffset(10));

        let s: TimeOffset = serde_json::from_str("\"00:01:05\"").unwrap();
        assert_eq!(s, TimeOffset(65));

        assert!(serde_json::from_str::<TimeOffset>("\"later\"").is_err());
        assert!(serde_json::from_str::<TimeOffset>("-3").is_err());
    }
}
