//! Timestamp formatting shared by tasks and the store.
//!
//! Every timestamp is written as RFC 3339 UTC with millisecond precision,
//! e.g. `2024-05-01T12:00:00.000Z`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time as a JSON string value, ready to drop into a record.
pub fn now() -> Value {
    Value::String(format(&Utc::now()))
}
