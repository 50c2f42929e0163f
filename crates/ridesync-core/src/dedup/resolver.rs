//! Decide whether an imported activity is new, an update, or ambiguous

use chrono::{DateTime, Utc};

use super::ActivityLookup;
use crate::error::Result;
use crate::model::{SportType, SyncedActivity};

/// What to do with a candidate activity
#[derive(Debug, Clone, PartialEq)]
pub enum DedupOutcome {
    /// Nothing overlaps, create the activity
    New,
    /// Exactly one stored activity overlaps
    Existing(Box<SyncedActivity>),
    /// Several stored activities overlap, no safe choice
    Conflict(Vec<SyncedActivity>),
}

/// Look up stored activities overlapping a candidate
pub fn resolve_duplicates(
    lookup: &dyn ActivityLookup,
    start: DateTime<Utc>,
    duration_secs: f64,
) -> Result<DedupOutcome> {
    let mut matches = lookup.find_overlapping(start, duration_secs)?;

    Ok(match matches.len() {
        0 => DedupOutcome::New,
        1 => DedupOutcome::Existing(Box::new(matches.remove(0))),
        _ => DedupOutcome::Conflict(matches),
    })
}

/// Human readable description of an ambiguous match
pub fn describe_conflict(name: &str, sport: SportType, matches: &[SyncedActivity]) -> String {
    let listing = matches
        .iter()
        .map(|existing| {
            format!(
                "{} ({})",
                existing.name(),
                existing.activity.start_time.format("%a %b %d %Y %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Unable to create activity \"{}\" of type {} because multiple activities overlap it: {}",
        name, sport, listing
    )
}
