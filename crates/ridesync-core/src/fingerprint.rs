//! Deterministic activity identifiers and content fingerprints

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::model::SyncedActivity;
use crate::utils::{sha256_hex, short_hash};

/// Length of an activity fingerprint in hex characters
pub const FINGERPRINT_LENGTH: usize = 24;

/// Attributes covered by the fingerprint
pub const FINGERPRINT_FIELDS: &[&str] = &[
    "id",
    "name",
    "type",
    "start_time",
    "end_time",
    "distance_raw",
    "moving_time_raw",
    "elapsed_time_raw",
    "elevation_gain_raw",
    "has_power_meter",
    "trainer",
    "commute",
    "calories",
    "start_timestamp",
    "extended_stats",
    "athlete_snapshot",
    "source_connector",
    "lat_lng_center",
];

/// Activity id derived from its time boundaries
pub fn activity_id(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        short_hash(&start.to_rfc3339_opts(SecondsFormat::Millis, true)),
        short_hash(&end.to_rfc3339_opts(SecondsFormat::Millis, true))
    )
}

/// Serialize `value` as JSON with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Fingerprint of the whitelisted attributes of a JSON activity
pub fn fingerprint_value(activity: &Value) -> String {
    let mut essentials = serde_json::Map::new();
    for field in FINGERPRINT_FIELDS {
        let value = activity.get(*field).cloned().unwrap_or(Value::Null);
        essentials.insert((*field).to_string(), value);
    }

    let mut digest = sha256_hex(canonical_json(&Value::Object(essentials)));
    digest.truncate(FINGERPRINT_LENGTH);
    digest
}

/// Fingerprint of an activity's essential attributes
pub fn activity_fingerprint(activity: &SyncedActivity) -> Result<String> {
    Ok(fingerprint_value(&serde_json::to_value(activity)?))
}
