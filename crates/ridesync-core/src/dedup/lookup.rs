//! Read access to previously synced activities

use chrono::{DateTime, Duration, Utc};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::SyncedActivity;

/// Query side of the activity store
pub trait ActivityLookup: Send + Sync {
    /// Activities overlapping the window `[start, start + duration_secs]`
    fn find_overlapping(
        &self,
        start: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<Vec<SyncedActivity>>;
}

/// In-memory activity store
#[derive(Debug, Clone, Default)]
pub struct MemoryActivityStore {
    activities: Vec<SyncedActivity>,
}

impl MemoryActivityStore {
    pub fn new(activities: Vec<SyncedActivity>) -> Self {
        Self { activities }
    }

    /// Load a JSON array of synced activities
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let activities: Vec<SyncedActivity> = serde_json::from_str(&content)
            .map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded {} known activities from {}", activities.len(), path.display());
        Ok(Self::new(activities))
    }

    /// Write all activities as a JSON array
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.activities)?)?;
        Ok(())
    }

    /// Insert an activity, replacing one with the same id
    pub fn upsert(&mut self, activity: SyncedActivity) {
        match self.activities.iter_mut().find(|a| a.id() == activity.id()) {
            Some(existing) => *existing = activity,
            None => self.activities.push(activity),
        }
    }

    pub fn activities(&self) -> &[SyncedActivity] {
        &self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

impl ActivityLookup for MemoryActivityStore {
    fn find_overlapping(
        &self,
        start: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<Vec<SyncedActivity>> {
        let end = start + Duration::milliseconds((duration_secs * 1000.0).round() as i64);

        Ok(self
            .activities
            .iter()
            .filter(|a| a.activity.start_time <= end && start <= a.activity.end_time)
            .cloned()
            .collect())
    }
}
