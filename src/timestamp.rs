//! Timestamps as codeBeamer writes them: `YYYY-MM-DDTHH:MM:SS.ffffff`.
//!
//! The microsecond part is mandatory. A value without it is a format
//! error, not another accepted format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::{CbError, Result};

/// A server timestamp (no zone information is sent).
pub type Timestamp = NaiveDateTime;

/// The one accepted wire format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%6f";

const TIMESTAMP_LEN: usize = "YYYY-MM-DDTHH:MM:SS.ffffff".len();

/// Parse a wire timestamp.
pub fn parse(value: &str) -> Result<Timestamp> {
    if value.len() != TIMESTAMP_LEN {
        return Err(CbError::InvalidTimestamp(value.to_string()));
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| CbError::InvalidTimestamp(value.to_string()))
}

/// Format a timestamp for the wire, always with six fractional digits.
pub fn format(value: &Timestamp) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde `serialize_with` for [`Timestamp`].
pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
}

/// Serde `deserialize_with` for [`Timestamp`].
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Timestamp, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

/// Serde helpers for optional timestamps.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Timestamp>,
        serializer: S,
    ) -> core::result::Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Option<Timestamp>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.as_deref()
            .map(parse)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
