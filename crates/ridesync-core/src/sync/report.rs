//! Summary of a finished sync run

use serde::Serialize;

use super::{ErrorSyncEvent, SyncEvent};
use crate::model::SyncedActivity;

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunEnd {
    Completed,
    Stopped,
    Failed,
}

impl std::fmt::Display for RunEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "Completed"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Activity produced during the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProducedActivity {
    pub is_new: bool,
    pub activity: SyncedActivity,
}

/// Result of a sync run, folded from its events
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Activities not known to the store
    pub created: usize,
    /// Activities matching a stored one
    pub updated: usize,
    /// Files skipped because of an error
    pub failed: usize,
    /// All error events, including fatal ones
    pub errors: Vec<ErrorSyncEvent>,
    pub activities: Vec<ProducedActivity>,
    /// `None` when the stream ended without a terminal event
    pub end: Option<RunEnd>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain `events` into a report
    pub fn collect(events: impl IntoIterator<Item = SyncEvent>) -> Self {
        let mut report = Self::new();
        for event in events {
            report.record(&event);
        }
        report
    }

    /// Account for one event
    pub fn record(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::Started { .. } => {}
            SyncEvent::ActivityProduced {
                is_new, activity, ..
            } => {
                if *is_new {
                    self.created += 1;
                } else {
                    self.updated += 1;
                }
                self.activities.push(ProducedActivity {
                    is_new: *is_new,
                    activity: activity.as_ref().clone(),
                });
            }
            SyncEvent::Error(error) => {
                if error.code.is_fatal() {
                    self.end = Some(RunEnd::Failed);
                } else if error.source.is_some() {
                    self.failed += 1;
                }
                self.errors.push(error.clone());
            }
            SyncEvent::Stopped { .. } => self.end = Some(RunEnd::Stopped),
            SyncEvent::Completed { .. } => self.end = Some(RunEnd::Completed),
        }
    }

    /// Total number of files handled
    pub fn total(&self) -> usize {
        self.created + self.updated + self.failed
    }

    /// Whether the run completed without any error
    pub fn is_success(&self) -> bool {
        self.end == Some(RunEnd::Completed) && self.errors.is_empty()
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: SyncReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.activities.extend(other.activities);
        if other.end.is_some() {
            self.end = other.end;
        }
    }
}
