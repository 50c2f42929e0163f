//! GPX track importer

use std::path::Path;

use super::xml::{attribute, parse_number, parse_timestamp, path_ends_with, walk_xml, within};
use super::xml::{Attribute, XmlVisitor};
use super::{read_text, ActivityDraft, ParsedActivity, TrackSample};
use crate::error::{Error, Result};
use crate::scanner::ActivityFileType;

/// Parse a GPX file
pub fn parse_gpx(path: &Path) -> Result<ParsedActivity> {
    let content = read_text(path)?;
    parse_gpx_str(&content, path)
}

/// Parse GPX content; `path` is only used for reporting
pub fn parse_gpx_str(content: &str, path: &Path) -> Result<ParsedActivity> {
    let mut visitor = GpxVisitor::default();
    walk_xml(content, &mut visitor).map_err(|e| Error::parse(path, e))?;

    if !visitor.seen_root {
        return Err(Error::parse(path, "missing <gpx> root element"));
    }

    visitor.draft.finish(path, ActivityFileType::Gpx)
}

/// Point being read, filled until its closing tag
#[derive(Default)]
struct PendingPoint {
    time: Option<chrono::DateTime<chrono::Utc>>,
    position: Option<[f64; 2]>,
    altitude: Option<f64>,
    speed: Option<f64>,
    heart_rate: Option<f64>,
    cadence: Option<f64>,
    power: Option<f64>,
}

#[derive(Default)]
struct GpxVisitor {
    draft: ActivityDraft,
    point: Option<PendingPoint>,
    metadata_name: Option<String>,
    seen_root: bool,
}

impl XmlVisitor for GpxVisitor {
    fn start(&mut self, path: &[String], attributes: &[Attribute]) {
        match path.last().map(String::as_str) {
            Some("gpx") if path.len() == 1 => self.seen_root = true,
            Some("trkpt") => {
                let lat = attribute(attributes, "lat").and_then(parse_number);
                let lon = attribute(attributes, "lon").and_then(parse_number);
                self.point = Some(PendingPoint {
                    position: lat.zip(lon).map(|(lat, lon)| [lat, lon]),
                    ..Default::default()
                });
            }
            _ => {}
        }
    }

    fn text(&mut self, path: &[String], text: &str) {
        if let Some(point) = self.point.as_mut().filter(|_| within(path, "trkpt")) {
            let value = parse_number(text);
            match path.last().map(String::as_str) {
                Some("time") => point.time = parse_timestamp(text),
                Some("ele") => point.altitude = value,
                Some("hr") => point.heart_rate = value,
                Some("cad") => point.cadence = value,
                Some("speed") => point.speed = value,
                Some("power") | Some("PowerInWatts") | Some("watts") => point.power = value,
                _ => {}
            }
            return;
        }

        if path_ends_with(path, &["trk", "name"]) {
            self.draft.name = Some(text.to_string());
        } else if path_ends_with(path, &["metadata", "name"]) {
            self.metadata_name = Some(text.to_string());
        } else if path_ends_with(path, &["trk", "type"]) {
            self.draft.sport = Some(text.to_string());
        } else if path_ends_with(path, &["metadata", "time"]) {
            self.draft.start_time = parse_timestamp(text);
        }
    }

    fn end(&mut self, path: &[String]) {
        match path.last().map(String::as_str) {
            Some("trkpt") => {
                if let Some(point) = self.point.take() {
                    self.push_point(point);
                }
            }
            Some("gpx") if path.len() == 1 => {
                if self.draft.name.is_none() {
                    self.draft.name = self.metadata_name.take();
                }
            }
            _ => {}
        }
    }
}

impl GpxVisitor {
    fn push_point(&mut self, point: PendingPoint) {
        let Some(time) = point.time else {
            self.draft.dropped_samples += 1;
            return;
        };

        self.draft.samples.push(TrackSample {
            position: point.position,
            altitude: point.altitude,
            speed: point.speed,
            heart_rate: point.heart_rate,
            cadence: point.cadence,
            power: point.power,
            ..TrackSample::at(time)
        });
    }
}
