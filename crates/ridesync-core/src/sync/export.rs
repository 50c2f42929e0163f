//! Writing sync reports to disk

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;
use serde::Serialize;

use super::{ProducedActivity, SyncReport};
use crate::error::{Error, Result};

/// Column names of the activity table
const ACTIVITY_COLUMNS: [&str; 11] = [
    "id",
    "name",
    "type",
    "start_time",
    "distance_m",
    "moving_time_s",
    "elapsed_time_s",
    "elevation_gain_m",
    "hash",
    "is_new",
    "source",
];

/// Layout of a written report, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// The whole report, errors included
    Json,
    /// Produced activities only, one row each
    Csv,
}

impl ReportFormat {
    /// Format for `path`, or [`Error::UnsupportedReportFormat`]
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(Error::UnsupportedReportFormat(path.to_path_buf())),
        }
    }
}

/// One CSV row per produced activity
#[derive(Serialize)]
struct ActivityRow<'a> {
    id: &'a str,
    name: &'a str,
    sport: String,
    start_time: String,
    distance_m: Option<f64>,
    moving_time_s: Option<f64>,
    elapsed_time_s: Option<f64>,
    elevation_gain_m: Option<f64>,
    hash: &'a str,
    is_new: bool,
    source: String,
}

impl<'a> From<&'a ProducedActivity> for ActivityRow<'a> {
    fn from(produced: &'a ProducedActivity) -> Self {
        let activity = &produced.activity.activity;
        Self {
            id: &activity.id,
            name: &activity.name,
            sport: activity.sport.to_string(),
            start_time: activity
                .start_time
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            distance_m: tenths(activity.distance_raw),
            moving_time_s: tenths(activity.moving_time_raw),
            elapsed_time_s: tenths(activity.elapsed_time_raw),
            elevation_gain_m: tenths(activity.elevation_gain_raw),
            hash: &produced.activity.hash,
            is_new: produced.is_new,
            source: activity.origin.path.display().to_string(),
        }
    }
}

fn tenths(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 10.0).round() / 10.0)
}

impl SyncReport {
    /// Write the report to `path` in the format its extension names
    pub fn write_to(&self, path: &Path) -> Result<ReportFormat> {
        let format = ReportFormat::for_path(path)?;
        let mut out = BufWriter::new(File::create(path)?);

        match format {
            ReportFormat::Json => self.write_json(&mut out)?,
            ReportFormat::Csv => self.write_activities_csv(&mut out)?,
        }
        out.flush()?;

        tracing::info!("Wrote {} report to {}", format_label(format), path.display());
        Ok(format)
    }

    /// Pretty printed JSON of the whole report
    pub fn write_json<W: Write>(&self, out: W) -> Result<()> {
        serde_json::to_writer_pretty(out, self)?;
        Ok(())
    }

    /// Produced activities as CSV, header row always present
    pub fn write_activities_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);

        writer.write_record(ACTIVITY_COLUMNS)?;
        for produced in &self.activities {
            writer.serialize(ActivityRow::from(produced))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn format_label(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Json => "JSON",
        ReportFormat::Csv => "CSV",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::synced_activity;
    use crate::sync::RunEnd;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn ride_report() -> SyncReport {
        let start = Utc.with_ymd_and_hms(2019, 8, 15, 13, 0, 0).unwrap();
        let mut activity = synced_activity("Afternoon Ride", start, 3600);
        activity.activity.distance_raw = Some(30000.04);
        activity.activity.moving_time_raw = Some(3540.0);

        SyncReport {
            created: 1,
            activities: vec![ProducedActivity {
                is_new: true,
                activity,
            }],
            end: Some(RunEnd::Completed),
            ..Default::default()
        }
    }

    // ==================== Format Tests ====================

    #[test]
    fn test_report_format_for_path() {
        assert_eq!(
            ReportFormat::for_path(Path::new("report.CSV")).unwrap(),
            ReportFormat::Csv
        );
        assert_eq!(
            ReportFormat::for_path(Path::new("out/report.json")).unwrap(),
            ReportFormat::Json
        );
        assert!(matches!(
            ReportFormat::for_path(Path::new("report.txt")),
            Err(Error::UnsupportedReportFormat(_))
        ));
        assert!(ReportFormat::for_path(Path::new("report")).is_err());
    }

    // ==================== CSV Tests ====================

    #[test]
    fn test_activities_csv_rows() {
        let mut out = Vec::new();
        ride_report().write_activities_csv(&mut out).unwrap();

        let content = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ACTIVITY_COLUMNS.join(","));
        assert!(lines[1].contains("Afternoon Ride,Ride,2019-08-15T13:00:00Z,30000.0,3540.0,,,"));
        assert!(lines[1].ends_with(",true,"));
    }

    #[test]
    fn test_empty_report_csv_keeps_header() {
        let mut out = Vec::new();
        SyncReport::new().write_activities_csv(&mut out).unwrap();

        let content = String::from_utf8(out).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("id,name,type,start_time"));
    }

    // ==================== File Tests ====================

    #[test]
    fn test_write_to_json_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.json");

        let format = ride_report().write_to(&path).unwrap();
        assert_eq!(format, ReportFormat::Json);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["created"], 1);
        assert_eq!(value["end"], "completed");
        assert_eq!(value["activities"][0]["activity"]["name"], "Afternoon Ride");
        assert_eq!(value["activities"][0]["activity"]["type"], "Ride");
    }

    #[test]
    fn test_write_to_unsupported_extension_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.txt");

        assert!(ride_report().write_to(&path).is_err());
        assert!(!path.exists());
    }
}
