//! Activity data structures and types

mod athlete;
mod sport;
mod streams;

pub use athlete::*;
pub use sport::*;
pub use streams::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Connector an activity or event originates from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    #[default]
    File,
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
        }
    }
}

/// File an activity was imported from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    pub path: PathBuf,
}

/// Activity with its primitive attributes, before statistics are attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BareActivity {
    /// Derived from start and end time only
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub sport: SportType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Meters
    pub distance_raw: Option<f64>,
    /// Seconds
    pub moving_time_raw: Option<f64>,
    /// Seconds
    pub elapsed_time_raw: Option<f64>,
    /// Meters
    pub elevation_gain_raw: Option<f64>,
    pub has_power_meter: bool,
    pub trainer: bool,
    pub commute: Option<bool>,
    pub calories: Option<f64>,
    /// Unix seconds of `start_time`
    pub start_timestamp: i64,
    pub source_connector: ConnectorType,
    pub origin: FileLocation,
}

impl BareActivity {
    /// Elapsed seconds between start and end
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Average and maximum of a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub avg: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub ascent: f64,
    pub descent: f64,
    pub min: f64,
    pub max: f64,
}

/// Statistics computed from an activity's streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedStats {
    pub moving_time: Option<f64>,
    pub elapsed_time: Option<f64>,
    pub pause_time: Option<f64>,
    pub distance: Option<f64>,
    pub elevation: Option<ElevationStats>,
    pub speed: Option<ChannelStats>,
    pub heart_rate: Option<ChannelStats>,
    pub cadence: Option<ChannelStats>,
    pub power: Option<ChannelStats>,
    /// Additional values attached by custom statistics computers
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Totals reported by the source file itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSourceData {
    pub distance: Option<f64>,
    pub elapsed_time: Option<f64>,
    pub moving_time: Option<f64>,
    pub elevation_gain: Option<f64>,
}

/// Fully assembled activity ready to be persisted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedActivity {
    #[serde(flatten)]
    pub activity: BareActivity,
    pub extended_stats: Option<ExtendedStats>,
    pub athlete_snapshot: AthleteSnapshot,
    pub lat_lng_center: Option<LatLng>,
    /// Whether the sport type was guessed from the activity profile
    #[serde(default)]
    pub auto_detected_type: bool,
    /// Content fingerprint, 24 hex characters
    pub hash: String,
}

impl SyncedActivity {
    pub fn id(&self) -> &str {
        &self.activity.id
    }

    pub fn name(&self) -> &str {
        &self.activity.name
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal bare activity between `start` and `start + duration_secs`
    pub fn bare_activity(name: &str, start: DateTime<Utc>, duration_secs: i64) -> BareActivity {
        BareActivity {
            id: format!("{}-{}", start.timestamp(), duration_secs),
            name: name.to_string(),
            sport: SportType::Ride,
            start_time: start,
            end_time: start + chrono::Duration::seconds(duration_secs),
            distance_raw: None,
            moving_time_raw: None,
            elapsed_time_raw: None,
            elevation_gain_raw: None,
            has_power_meter: false,
            trainer: false,
            commute: None,
            calories: None,
            start_timestamp: start.timestamp(),
            source_connector: ConnectorType::File,
            origin: FileLocation::default(),
        }
    }

    /// Synced activity wrapping [`bare_activity`]
    pub fn synced_activity(name: &str, start: DateTime<Utc>, duration_secs: i64) -> SyncedActivity {
        SyncedActivity {
            activity: bare_activity(name, start, duration_secs),
            extended_stats: None,
            athlete_snapshot: AthleteSnapshot::default(),
            lat_lng_center: None,
            auto_detected_type: false,
            hash: "0".repeat(24),
        }
    }
}
