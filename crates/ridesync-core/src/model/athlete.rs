//! Athlete settings and snapshot resolution

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Men,
    Women,
}

/// Physiological settings of an athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteSettings {
    pub max_hr: f64,
    pub rest_hr: f64,
    /// Lactate threshold heart rate
    pub lthr: Option<f64>,
    pub cycling_ftp: Option<f64>,
    /// Threshold pace in seconds per kilometer
    pub running_ftp: Option<f64>,
    /// Threshold pace in meters per minute
    pub swim_ftp: Option<f64>,
    /// Body weight in kilograms
    pub weight: Option<f64>,
}

impl Default for AthleteSettings {
    fn default() -> Self {
        Self {
            max_hr: 190.0,
            rest_hr: 65.0,
            lthr: None,
            cycling_ftp: None,
            running_ftp: None,
            swim_ftp: None,
            weight: Some(75.0),
        }
    }
}

/// Athlete settings as they were when an activity was recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteSnapshot {
    pub gender: Gender,
    pub settings: AthleteSettings,
}

/// Resolves the athlete snapshot in effect at a given instant
pub trait AthleteSnapshotResolver: Send + Sync {
    fn resolve(&self, at: DateTime<Utc>) -> AthleteSnapshot;
}

/// Same snapshot for every activity
#[derive(Debug, Clone, Default)]
pub struct FixedAthleteSnapshot(pub AthleteSnapshot);

impl AthleteSnapshotResolver for FixedAthleteSnapshot {
    fn resolve(&self, _at: DateTime<Utc>) -> AthleteSnapshot {
        self.0.clone()
    }
}

/// Settings effective from a given day on. `since: None` applies to all
/// dates not covered by a dated entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedSettings {
    pub since: Option<NaiveDate>,
    pub settings: AthleteSettings,
}

/// History of athlete settings, resolved by activity date
#[derive(Debug, Clone, Default)]
pub struct DatedAthleteSettings {
    gender: Gender,
    entries: Vec<DatedSettings>,
}

impl DatedAthleteSettings {
    pub fn new(gender: Gender, entries: Vec<DatedSettings>) -> Self {
        Self { gender, entries }
    }
}

impl AthleteSnapshotResolver for DatedAthleteSettings {
    fn resolve(&self, at: DateTime<Utc>) -> AthleteSnapshot {
        let day = at.date_naive();

        let dated = self
            .entries
            .iter()
            .filter(|entry| entry.since.map_or(false, |since| since <= day))
            .max_by_key(|entry| entry.since);
        let fallback = self.entries.iter().find(|entry| entry.since.is_none());

        let settings = dated
            .or(fallback)
            .map(|entry| entry.settings.clone())
            .unwrap_or_default();

        AthleteSnapshot {
            gender: self.gender,
            settings,
        }
    }
}
