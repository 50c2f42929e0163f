//! Garmin Training Center (TCX) importer

use chrono::{DateTime, Utc};
use std::path::Path;

use super::xml::{attribute, parse_number, parse_timestamp, path_ends_with, walk_xml, within};
use super::xml::{Attribute, XmlVisitor};
use super::{accumulate, read_text, ActivityDraft, ParsedActivity, SourceSummary, TrackSample};
use crate::error::{Error, Result};
use crate::scanner::ActivityFileType;

/// Parse a TCX file
pub fn parse_tcx(path: &Path) -> Result<ParsedActivity> {
    let content = read_text(path)?;
    parse_tcx_str(&content, path)
}

/// Parse TCX content; `path` is only used for reporting.
///
/// Only the first `<Activity>` of the document is imported.
pub fn parse_tcx_str(content: &str, path: &Path) -> Result<ParsedActivity> {
    let mut visitor = TcxVisitor::default();
    walk_xml(content, &mut visitor).map_err(|e| Error::parse(path, e))?;

    if visitor.activities == 0 {
        return Err(Error::parse(path, "no <Activity> element found"));
    }
    if visitor.activities > 1 {
        tracing::warn!(
            "{} holds {} activities, importing the first one",
            path.display(),
            visitor.activities
        );
    }

    visitor.draft.summary = visitor.laps;
    visitor.draft.finish(path, ActivityFileType::Tcx)
}

#[derive(Default)]
struct TcxVisitor {
    draft: ActivityDraft,
    laps: SourceSummary,
    point: Option<PendingPoint>,
    activities: usize,
}

#[derive(Default)]
struct PendingPoint {
    time: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    distance: Option<f64>,
    speed: Option<f64>,
    heart_rate: Option<f64>,
    cadence: Option<f64>,
    power: Option<f64>,
}

impl TcxVisitor {
    /// Elements after the first activity are ignored
    fn in_first_activity(&self) -> bool {
        self.activities == 1
    }
}

impl XmlVisitor for TcxVisitor {
    fn start(&mut self, path: &[String], attributes: &[Attribute]) {
        match path.last().map(String::as_str) {
            Some("Activity") if within(path, "Activities") => {
                self.activities += 1;
                if self.in_first_activity() {
                    self.draft.sport = attribute(attributes, "Sport").map(str::to_string);
                }
            }
            Some("Lap") if self.in_first_activity() => {
                if self.draft.start_time.is_none() {
                    self.draft.start_time = attribute(attributes, "StartTime").and_then(parse_timestamp);
                }
            }
            Some("Trackpoint") if self.in_first_activity() => {
                self.point = Some(PendingPoint::default());
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if !self.in_first_activity() {
            return;
        }

        if let Some(point) = self.point.as_mut().filter(|_| within(path, "Trackpoint")) {
            let value = parse_number(text);
            match path.last().map(String::as_str) {
                Some("Time") => point.time = parse_timestamp(text),
                Some("LatitudeDegrees") => point.latitude = value,
                Some("LongitudeDegrees") => point.longitude = value,
                Some("AltitudeMeters") => point.altitude = value,
                Some("DistanceMeters") => point.distance = value,
                Some("Value") if within(path, "HeartRateBpm") => point.heart_rate = value,
                Some("Cadence") | Some("RunCadence") => point.cadence = value,
                Some("Speed") => point.speed = value,
                Some("Watts") => point.power = value,
                _ => {}
            }
            return;
        }

        let value = parse_number(text);
        if path_ends_with(path, &["Activity", "Id"]) {
            if let Some(start) = parse_timestamp(text) {
                self.draft.start_time = Some(start);
            }
        } else if path_ends_with(path, &["Lap", "TotalTimeSeconds"]) {
            accumulate(&mut self.laps.elapsed_time, value);
        } else if path_ends_with(path, &["Lap", "DistanceMeters"]) {
            accumulate(&mut self.laps.distance, value);
        } else if path_ends_with(path, &["Lap", "Calories"]) {
            accumulate(&mut self.laps.calories, value);
        } else if path_ends_with(path, &["Activity", "Notes"]) {
            self.draft.name = Some(text.to_string());
        }
    }

    fn end(&mut self, path: &[String]) {
        if path.last().map(String::as_str) != Some("Trackpoint") {
            return;
        }
        let Some(point) = self.point.take() else {
            return;
        };
        let Some(time) = point.time else {
            self.draft.dropped_samples += 1;
            return;
        };

        self.draft.samples.push(TrackSample {
            position: point.latitude.zip(point.longitude).map(|(lat, lng)| [lat, lng]),
            altitude: point.altitude,
            distance: point.distance,
            speed: point.speed,
            heart_rate: point.heart_rate,
            cadence: point.cadence,
            power: point.power,
            ..TrackSample::at(time)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RUN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2"
  xmlns:ns3="http://www.garmin.com/xmlschemas/ActivityExtension/v2">
  <Activities>
    <Activity Sport="Running">
      <Id>2021-04-10T07:30:00.000Z</Id>
      <Lap StartTime="2021-04-10T07:30:00.000Z">
        <TotalTimeSeconds>10.0</TotalTimeSeconds>
        <DistanceMeters>30.0</DistanceMeters>
        <Calories>2</Calories>
        <AverageHeartRateBpm><Value>140</Value></AverageHeartRateBpm>
        <Track>
          <Trackpoint>
            <Time>2021-04-10T07:30:00.000Z</Time>
            <Position>
              <LatitudeDegrees>48.8566</LatitudeDegrees>
              <LongitudeDegrees>2.3522</LongitudeDegrees>
            </Position>
            <AltitudeMeters>35.0</AltitudeMeters>
            <DistanceMeters>0.0</DistanceMeters>
            <HeartRateBpm><Value>138</Value></HeartRateBpm>
            <Extensions><ns3:TPX><ns3:Speed>2.9</ns3:Speed><ns3:RunCadence>84</ns3:RunCadence></ns3:TPX></Extensions>
          </Trackpoint>
          <Trackpoint>
            <Time>2021-04-10T07:30:10.000Z</Time>
            <Position>
              <LatitudeDegrees>48.8568</LatitudeDegrees>
              <LongitudeDegrees>2.3525</LongitudeDegrees>
            </Position>
            <AltitudeMeters>36.0</AltitudeMeters>
            <DistanceMeters>30.0</DistanceMeters>
            <HeartRateBpm><Value>142</Value></HeartRateBpm>
          </Trackpoint>
        </Track>
      </Lap>
      <Lap StartTime="2021-04-10T07:30:10.000Z">
        <TotalTimeSeconds>5.0</TotalTimeSeconds>
        <DistanceMeters>15.0</DistanceMeters>
      </Lap>
    </Activity>
  </Activities>
</TrainingCenterDatabase>"#;

    #[test]
    fn test_parse_tcx_run() {
        let parsed = parse_tcx_str(RUN, Path::new("run.tcx")).unwrap();

        assert_eq!(parsed.sport.as_deref(), Some("Running"));
        assert_eq!(parsed.name, None);
        assert_eq!(
            parsed.start_time,
            Utc.with_ymd_and_hms(2021, 4, 10, 7, 30, 0).unwrap()
        );
        assert_eq!(parsed.samples.len(), 2);

        let first = &parsed.samples[0];
        assert_eq!(first.position, Some([48.8566, 2.3522]));
        assert_eq!(first.heart_rate, Some(138.0));
        assert_eq!(first.speed, Some(2.9));
        assert_eq!(first.cadence, Some(84.0));
        assert_eq!(parsed.samples[1].distance, Some(30.0));

        assert_eq!(parsed.summary.elapsed_time, Some(15.0));
        assert_eq!(parsed.summary.distance, Some(45.0));
        assert_eq!(parsed.summary.calories, Some(2.0));
    }

    #[test]
    fn test_parse_tcx_without_activity_fails() {
        let tcx = r#"<TrainingCenterDatabase><Courses/></TrainingCenterDatabase>"#;
        let result = parse_tcx_str(tcx, Path::new("course.tcx"));
        assert!(matches!(result, Err(Error::ActivityParse { .. })));
    }

    #[test]
    fn test_parse_tcx_keeps_first_activity_only() {
        let tcx = r#"<TrainingCenterDatabase><Activities>
<Activity Sport="Biking"><Id>2021-01-01T10:00:00Z</Id><Lap><Track>
<Trackpoint><Time>2021-01-01T10:00:00Z</Time></Trackpoint>
<Trackpoint><Time>2021-01-01T10:00:01Z</Time></Trackpoint>
</Track></Lap></Activity>
<Activity Sport="Running"><Id>2021-01-02T10:00:00Z</Id><Lap><Track>
<Trackpoint><Time>2021-01-02T10:00:00Z</Time></Trackpoint>
</Track></Lap></Activity>
</Activities></TrainingCenterDatabase>"#;

        let parsed = parse_tcx_str(tcx, Path::new("multi.tcx")).unwrap();
        assert_eq!(parsed.sport.as_deref(), Some("Biking"));
        assert_eq!(parsed.samples.len(), 2);
    }
}
