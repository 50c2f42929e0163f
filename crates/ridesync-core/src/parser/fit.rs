//! FIT (Flexible and Interoperable Data Transfer) importer

use chrono::{DateTime, Utc};
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use std::fs::File;
use std::path::Path;

use super::{accumulate, ActivityDraft, ParsedActivity, TrackSample};
use crate::error::{Error, Result};
use crate::scanner::ActivityFileType;

/// Degrees per semicircle
const SEMICIRCLE_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Sub sports recorded indoors
const INDOOR_SUB_SPORTS: &[&str] = &[
    "indoor_cycling",
    "virtual_activity",
    "treadmill",
    "indoor_running",
    "indoor_rowing",
    "spin",
];

/// Parse a FIT activity file
pub fn parse_fit(path: &Path) -> Result<ParsedActivity> {
    let mut file = File::open(path).map_err(|e| Error::parse(path, e))?;
    let records = fitparser::from_reader(&mut file).map_err(|e| Error::parse(path, e))?;

    let mut draft = ActivityDraft::default();
    let mut sport: Option<String> = None;
    let mut sub_sport: Option<String> = None;

    for record in &records {
        match record.kind() {
            MesgNum::Record => match record_sample(record) {
                Some(sample) => draft.samples.push(sample),
                None => draft.dropped_samples += 1,
            },
            MesgNum::Session => {
                if let Some(start) = timestamp(record, "start_time") {
                    draft.start_time = Some(draft.start_time.map_or(start, |s| s.min(start)));
                }
                accumulate(&mut draft.summary.distance, number(record, "total_distance"));
                accumulate(&mut draft.summary.elapsed_time, number(record, "total_elapsed_time"));
                accumulate(&mut draft.summary.moving_time, number(record, "total_timer_time"));
                accumulate(&mut draft.summary.ascent, number(record, "total_ascent"));
                accumulate(&mut draft.summary.calories, number(record, "total_calories"));
                sport = sport.or_else(|| text(record, "sport"));
                sub_sport = sub_sport.or_else(|| text(record, "sub_sport"));
            }
            MesgNum::Sport => {
                sport = sport.or_else(|| text(record, "sport"));
                sub_sport = sub_sport.or_else(|| text(record, "sub_sport"));
                if draft.name.is_none() {
                    draft.name = text(record, "name");
                }
            }
            _ => {}
        }
    }

    draft.trainer = sub_sport
        .as_deref()
        .map(|sub| INDOOR_SUB_SPORTS.contains(&sub))
        .unwrap_or(false);
    draft.sport = sport.map(|sport| sport_name(&sport, sub_sport.as_deref()));

    draft.finish(path, ActivityFileType::Fit)
}

/// Combine FIT sport and sub sport into a single source type name
pub(crate) fn sport_name(sport: &str, sub_sport: Option<&str>) -> String {
    let name = match (sport, sub_sport.unwrap_or("generic")) {
        ("cycling", "virtual_activity" | "indoor_cycling" | "spin") => "virtual_ride",
        ("cycling", "mountain" | "downhill" | "cyclocross") => "mountain_biking",
        ("cycling", "gravel_cycling") => "gravel_cycling",
        ("cycling", "e_bike_fitness" | "e_bike_mountain") => "e_biking",
        ("running", "virtual_activity" | "treadmill" | "indoor_running") => "virtual_run",
        ("running", "trail") => "trail_running",
        (sport, _) => sport,
    };
    name.to_string()
}

fn record_sample(record: &FitDataRecord) -> Option<TrackSample> {
    let time = timestamp(record, "timestamp")?;

    let latitude = number(record, "position_lat").map(|v| v * SEMICIRCLE_TO_DEGREES);
    let longitude = number(record, "position_long").map(|v| v * SEMICIRCLE_TO_DEGREES);
    let position = latitude
        .zip(longitude)
        .filter(|(lat, lng)| lat.abs() <= 90.0 && lng.abs() <= 180.0)
        .map(|(lat, lng)| [lat, lng]);

    Some(TrackSample {
        position,
        altitude: number(record, "enhanced_altitude").or_else(|| number(record, "altitude")),
        distance: number(record, "distance"),
        speed: number(record, "enhanced_speed").or_else(|| number(record, "speed")),
        heart_rate: number(record, "heart_rate"),
        cadence: number(record, "cadence"),
        power: number(record, "power"),
        ..TrackSample::at(time)
    })
}

fn field<'a>(record: &'a FitDataRecord, name: &str) -> Option<&'a Value> {
    record
        .fields()
        .iter()
        .find(|field| field.name() == name)
        .map(|field| field.value())
}

fn number(record: &FitDataRecord, name: &str) -> Option<f64> {
    field(record, name).and_then(value_as_f64)
}

fn text(record: &FitDataRecord, name: &str) -> Option<String> {
    match field(record, name)? {
        Value::String(value) => Some(value.clone()),
        _ => None,
    }
}

fn timestamp(record: &FitDataRecord, name: &str) -> Option<DateTime<Utc>> {
    match field(record, name)? {
        Value::Timestamp(value) => Some(value.with_timezone(&Utc)),
        _ => None,
    }
}

/// Numeric value of a FIT field, `None` for non numeric or non finite values
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => f64::from(*v),
        Value::SInt8(v) => f64::from(*v),
        Value::SInt16(v) => f64::from(*v),
        Value::UInt16(v) | Value::UInt16z(v) => f64::from(*v),
        Value::SInt32(v) => f64::from(*v),
        Value::UInt32(v) | Value::UInt32z(v) => f64::from(*v),
        Value::SInt64(v) => *v as f64,
        Value::UInt64(v) | Value::UInt64z(v) => *v as f64,
        Value::Float32(v) => f64::from(*v),
        Value::Float64(v) => *v,
        _ => return None,
    };
    Some(number).filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&Value::UInt8(120)), Some(120.0));
        assert_eq!(value_as_f64(&Value::SInt32(-5)), Some(-5.0));
        assert_eq!(value_as_f64(&Value::Float64(2.5)), Some(2.5));
        assert_eq!(value_as_f64(&Value::Float32(f32::NAN)), None);
        assert_eq!(value_as_f64(&Value::String("cycling".into())), None);
    }

    #[test]
    fn test_semicircle_conversion() {
        let semicircles = 522_254_442.0;
        let degrees = semicircles * SEMICIRCLE_TO_DEGREES;
        assert!((degrees - 43.774_86).abs() < 1e-4);
    }

    #[test]
    fn test_sport_name() {
        assert_eq!(sport_name("cycling", None), "cycling");
        assert_eq!(sport_name("cycling", Some("road")), "cycling");
        assert_eq!(sport_name("cycling", Some("virtual_activity")), "virtual_ride");
        assert_eq!(sport_name("cycling", Some("mountain")), "mountain_biking");
        assert_eq!(sport_name("running", Some("treadmill")), "virtual_run");
        assert_eq!(sport_name("running", Some("trail")), "trail_running");
        assert_eq!(sport_name("alpine_skiing", Some("generic")), "alpine_skiing");
    }

    #[test]
    fn test_parse_fit_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.fit");
        std::fs::write(&path, b"this is not a fit file at all").unwrap();

        assert!(matches!(parse_fit(&path), Err(Error::ActivityParse { .. })));
    }

    #[test]
    fn test_parse_fit_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = parse_fit(&temp.path().join("missing.fit"));
        assert!(matches!(result, Err(Error::ActivityParse { .. })));
    }
}
