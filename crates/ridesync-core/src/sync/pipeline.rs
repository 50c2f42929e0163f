//! Work done by one sync run

use chrono::{DateTime, Timelike, Utc};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;

use super::{compress_streams, ErrorSyncEvent, SyncEvent};
use crate::classifier::{ActivityProfile, SportClassifier};
use crate::config::FileConnectorConfig;
use crate::dedup::{describe_conflict, resolve_duplicates, ActivityLookup, DedupOutcome};
use crate::error::{Error, Result};
use crate::fingerprint::{activity_fingerprint, activity_id};
use crate::model::{
    ActivityStreams, AthleteSnapshotResolver, BareActivity, ConnectorType, FileLocation,
    SportType, SyncedActivity,
};
use crate::parser::{parse_activity_file, ParsedActivity};
use crate::scanner::{ActivityFile, ArchiveExtractor, DirectoryScanner};
use crate::stats::{elevation_stats, update_primitive_stats, StatsComputer, StatsInput};
use crate::streams::{compute_additional_streams, extract_streams};

/// Number of files parsed ahead in parallel
const PARSE_BATCH_SIZE: usize = 8;

const CONNECTOR: ConnectorType = ConnectorType::File;

/// How a run ended when no fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    Stopped,
}

/// Collaborators and channels available to a run
pub(crate) struct SyncRun<'a> {
    pub config: &'a FileConnectorConfig,
    pub lookup: &'a dyn ActivityLookup,
    pub athlete: &'a dyn AthleteSnapshotResolver,
    pub stats: &'a dyn StatsComputer,
    pub stop: &'a AtomicBool,
    pub events: &'a Sender<SyncEvent>,
}

impl SyncRun<'_> {
    /// Run the pipeline to the end of the file list or until a stop request.
    ///
    /// Per-file failures are reported on the event stream. The returned
    /// error, if any, ends the run; the terminal event is left to the caller.
    pub fn execute(&self) -> Result<RunOutcome> {
        let root = &self.config.source_directory;
        if !root.is_dir() {
            return Err(Error::SourceDirectoryMissing(root.clone()));
        }

        let started = Instant::now();
        self.emit(SyncEvent::Started {
            connector: CONNECTOR,
        });

        // Incremental runs never inflate or delete archives
        if self.config.extract_archive_files && self.config.sync_after.is_none() {
            let extractor = ArchiveExtractor::new(self.config.delete_archives_after_extract);
            let extracted = extractor.extract_in_directory(
                root,
                self.config.scan_sub_directories,
                |archive| {
                    if archive.deleted {
                        tracing::info!("Deleted archive {}", archive.archive.display());
                    }
                },
            )?;
            tracing::debug!("Archive extraction produced {} files", extracted.len());
        } else if self.config.extract_archive_files {
            tracing::debug!("Skipping archive extraction for incremental sync");
        }

        let files = DirectoryScanner::new(root)
            .recursive(self.config.scan_sub_directories)
            .modified_after(self.config.sync_after)
            .scan()?;
        tracing::info!("Found {} activity files in {}", files.len(), root.display());

        let classifier = SportClassifier::new(self.config.detect_sport_type_when_unknown);
        let mut processed = 0usize;

        for batch in files.chunks(PARSE_BATCH_SIZE) {
            if self.stop_requested() {
                break;
            }

            let parsed: Vec<Result<ParsedActivity>> =
                batch.par_iter().map(parse_activity_file).collect();

            for (file, parsed) in batch.iter().zip(parsed) {
                if self.stop_requested() {
                    break;
                }

                let result = parsed.and_then(|activity| self.process(&classifier, activity));
                match result {
                    Ok(event) => self.emit(event),
                    Err(e) => self.report_file_error(file, e)?,
                }
                processed += 1;
            }
        }

        if self.stop_requested() {
            tracing::info!(
                "Sync stopped after {}/{} files in {:.1}s",
                processed,
                files.len(),
                started.elapsed().as_secs_f64()
            );
            return Ok(RunOutcome::Stopped);
        }

        tracing::info!(
            "Sync completed: {} files in {:.1}s",
            processed,
            started.elapsed().as_secs_f64()
        );
        Ok(RunOutcome::Completed)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Sync event dropped, no receiver left");
        }
    }

    /// Report a recoverable failure, or hand back an error that ends the run
    fn report_file_error(&self, file: &ActivityFile, error: Error) -> Result<()> {
        let Some(code) = error.sync_error_code() else {
            tracing::error!("Sync aborted on {}: {}", file.path.display(), error);
            return Err(error);
        };

        tracing::warn!("Skipping {}: {}", file.path.display(), error);
        self.emit(SyncEvent::Error(
            ErrorSyncEvent::new(code, CONNECTOR, error.to_string()).with_source(&file.path),
        ));
        Ok(())
    }

    /// Turn one parsed file into an `ActivityProduced` event
    fn process(&self, classifier: &SportClassifier, parsed: ParsedActivity) -> Result<SyncEvent> {
        let mut streams = extract_streams(&parsed);

        let classification = classifier.classify(parsed.sport.as_deref(), &profile(&parsed, &streams));
        let sport = classification.sport;
        let name = parsed
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| default_name(parsed.start_time, sport));

        match resolve_duplicates(self.lookup, parsed.start_time, parsed.duration_secs())? {
            DedupOutcome::New => {}
            DedupOutcome::Existing(existing) => {
                tracing::debug!(
                    "{} matches stored activity {}",
                    parsed.path.display(),
                    existing.id()
                );
                return Ok(SyncEvent::ActivityProduced {
                    connector: CONNECTOR,
                    is_new: false,
                    activity: existing,
                    compressed_stream: None,
                });
            }
            DedupOutcome::Conflict(matches) => {
                return Err(Error::MultipleActivitiesFound {
                    description: describe_conflict(&name, sport, &matches),
                });
            }
        }

        let mut bare = BareActivity {
            id: activity_id(parsed.start_time, parsed.end_time),
            name,
            sport,
            start_time: parsed.start_time,
            end_time: parsed.end_time,
            distance_raw: None,
            moving_time_raw: None,
            elapsed_time_raw: None,
            elevation_gain_raw: None,
            has_power_meter: !streams.watts.is_empty(),
            trainer: parsed.trainer || sport.is_virtual(),
            commute: None,
            calories: parsed.summary.calories,
            start_timestamp: parsed.start_time.timestamp(),
            source_connector: CONNECTOR,
            origin: FileLocation {
                path: parsed.path.clone(),
            },
        };

        let athlete = self.athlete.resolve(bare.start_time);
        compute_additional_streams(&bare, &mut streams, &athlete.settings)?;

        let source = parsed.primitive_source_data();
        let extended_stats = self
            .stats
            .compute(&StatsInput {
                activity: &bare,
                streams: &streams,
                athlete: &athlete,
                source: &source,
            })
            .map_err(|e| match e {
                Error::Compute(_) => e,
                other => Error::Compute(other.to_string()),
            })?;
        update_primitive_stats(&mut bare, Some(&extended_stats), &streams, &source);

        let mut activity = SyncedActivity {
            lat_lng_center: streams.lat_lng_center(),
            activity: bare,
            extended_stats: Some(extended_stats),
            athlete_snapshot: athlete,
            auto_detected_type: classification.auto_detected,
            hash: String::new(),
        };
        activity.hash = activity_fingerprint(&activity)?;

        let compressed_stream = compress_streams(&streams)?;
        tracing::debug!(
            "Produced {} \"{}\" ({}) from {}",
            activity.id(),
            activity.name(),
            sport,
            parsed.path.display()
        );

        Ok(SyncEvent::ActivityProduced {
            connector: CONNECTOR,
            is_new: true,
            activity: Box::new(activity),
            compressed_stream: Some(compressed_stream),
        })
    }
}

/// Profile the classifier guesses the sport from
fn profile(parsed: &ParsedActivity, streams: &ActivityStreams) -> ActivityProfile {
    let distance = parsed.summary.distance.or_else(|| streams.covered_distance());
    let duration = parsed
        .summary
        .elapsed_time
        .or_else(|| Some(parsed.duration_secs()).filter(|d| *d > 0.0));
    let ascent = parsed
        .summary
        .ascent
        .or_else(|| elevation_stats(&streams.altitude).map(|e| e.ascent));
    let avg_speed = distance
        .zip(parsed.summary.moving_time.or(duration))
        .filter(|(_, time)| *time > 0.0)
        .map(|(distance, time)| distance / time);
    let max_speed = streams
        .velocity_smooth
        .iter()
        .copied()
        .reduce(f64::max);

    ActivityProfile {
        distance,
        duration,
        ascent,
        avg_speed,
        max_speed,
    }
}

/// Name like "Morning Ride" from the UTC start hour
pub(crate) fn default_name(start: DateTime<Utc>, sport: SportType) -> String {
    let moment = match start.hour() {
        0..=5 => "Night",
        6..=11 => "Morning",
        12..=17 => "Afternoon",
        _ => "Evening",
    };
    format!("{} {}", moment, sport.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 8, 15, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_default_name() {
        assert_eq!(default_name(at(3), SportType::Run), "Night Run");
        assert_eq!(default_name(at(6), SportType::Ride), "Morning Ride");
        assert_eq!(default_name(at(13), SportType::Ride), "Afternoon Ride");
        assert_eq!(default_name(at(23), SportType::Walk), "Evening Walk");
    }
}
