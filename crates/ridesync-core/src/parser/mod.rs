//! Activity file importers (GPX, TCX, FIT)

mod fit;
mod gpx;
mod tcx;
mod xml;

pub use fit::parse_fit;
pub use gpx::{parse_gpx, parse_gpx_str};
pub use tcx::{parse_tcx, parse_tcx_str};

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{LatLng, PrimitiveSourceData};
use crate::scanner::{ActivityFile, ActivityFileType};

/// One timed record of a track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSample {
    pub time: DateTime<Utc>,
    pub position: Option<LatLng>,
    /// Meters
    pub altitude: Option<f64>,
    /// Cumulative meters
    pub distance: Option<f64>,
    /// m/s
    pub speed: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    /// Watts
    pub power: Option<f64>,
}

impl TrackSample {
    /// Sample at `time` with no channel values
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time,
            position: None,
            altitude: None,
            distance: None,
            speed: None,
            heart_rate: None,
            cadence: None,
            power: None,
        }
    }
}

/// Totals stored in the file itself
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceSummary {
    pub distance: Option<f64>,
    pub elapsed_time: Option<f64>,
    pub moving_time: Option<f64>,
    pub ascent: Option<f64>,
    pub calories: Option<f64>,
}

/// Format neutral view of an imported activity
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedActivity {
    pub path: PathBuf,
    pub file_type: ActivityFileType,
    /// Sport as written by the recording device or service
    pub sport: Option<String>,
    pub name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Recorded indoors on a trainer or treadmill
    pub trainer: bool,
    /// Samples in chronological order
    pub samples: Vec<TrackSample>,
    pub summary: SourceSummary,
}

impl ParsedActivity {
    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    /// Source totals in the shape used to fill primitive activity stats
    pub fn primitive_source_data(&self) -> PrimitiveSourceData {
        PrimitiveSourceData {
            distance: self.summary.distance,
            elapsed_time: self.summary.elapsed_time,
            moving_time: self.summary.moving_time,
            elevation_gain: self.summary.ascent,
        }
    }
}

/// Accumulates importer output before validation
#[derive(Debug, Default)]
pub(crate) struct ActivityDraft {
    pub sport: Option<String>,
    pub name: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub trainer: bool,
    pub samples: Vec<TrackSample>,
    pub summary: SourceSummary,
    pub dropped_samples: usize,
}

impl ActivityDraft {
    pub fn finish(mut self, path: &Path, file_type: ActivityFileType) -> Result<ParsedActivity> {
        if self.dropped_samples > 0 {
            tracing::debug!(
                "Dropped {} samples without timestamp from {}",
                self.dropped_samples,
                path.display()
            );
        }

        self.samples.sort_by_key(|sample| sample.time);

        let start_time = match (self.start_time, self.samples.first()) {
            (Some(start), Some(first)) => start.min(first.time),
            (Some(start), None) => start,
            (None, Some(first)) => first.time,
            (None, None) => return Err(Error::parse(path, "no timed samples found")),
        };

        let end_time = match self.samples.last() {
            Some(last) => last.time,
            None => {
                let elapsed = self.summary.elapsed_time.unwrap_or(0.0);
                start_time + chrono::Duration::milliseconds((elapsed * 1000.0) as i64)
            }
        };

        Ok(ParsedActivity {
            path: path.to_path_buf(),
            file_type,
            sport: self.sport.filter(|s| !s.trim().is_empty()),
            name: self.name.filter(|s| !s.trim().is_empty()),
            start_time,
            end_time: end_time.max(start_time),
            trainer: self.trainer,
            samples: self.samples,
            summary: self.summary,
        })
    }
}

/// Add `value` to an optional running total
pub(crate) fn accumulate(total: &mut Option<f64>, value: Option<f64>) {
    if let Some(value) = value {
        *total = Some(total.unwrap_or(0.0) + value);
    }
}

/// Parse an activity file with the importer matching its format
pub fn parse_activity_file(file: &ActivityFile) -> Result<ParsedActivity> {
    tracing::debug!("Parsing {} as {}", file.path.display(), file.file_type);

    match file.file_type {
        ActivityFileType::Gpx => parse_gpx(&file.path),
        ActivityFileType::Tcx => parse_tcx(&file.path),
        ActivityFileType::Fit => parse_fit(&file.path),
    }
}

/// Read a text based activity file, reporting failures as parse errors
pub(crate) fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::parse(path, e))
}
