//! Canonical time-series channels of an activity

use serde::{Deserialize, Serialize};

/// A `[latitude, longitude]` pair in degrees
pub type LatLng = [f64; 2];

/// Channel-aligned time series extracted from an activity file.
///
/// Every non-empty channel has exactly as many samples as `time`.
/// Channels without source data are empty, never missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStreams {
    /// Seconds elapsed since the first sample
    pub time: Vec<f64>,
    pub latlng: Vec<LatLng>,
    /// Cumulative distance in meters
    pub distance: Vec<f64>,
    /// Altitude in meters
    pub altitude: Vec<f64>,
    /// Speed in m/s
    pub velocity_smooth: Vec<f64>,
    /// Grade in percent
    pub grade_smooth: Vec<f64>,
    pub heartrate: Vec<f64>,
    pub cadence: Vec<f64>,
    pub watts: Vec<f64>,
    /// Grade adjusted speed in m/s
    pub grade_adjusted_speed: Vec<f64>,
}

impl ActivityStreams {
    /// Number of samples in the time channel
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Names of channels whose length differs from the time channel
    pub fn misaligned_channels(&self) -> Vec<&'static str> {
        let expected = self.time.len();
        let lengths = [
            ("latlng", self.latlng.len()),
            ("distance", self.distance.len()),
            ("altitude", self.altitude.len()),
            ("velocity_smooth", self.velocity_smooth.len()),
            ("grade_smooth", self.grade_smooth.len()),
            ("heartrate", self.heartrate.len()),
            ("cadence", self.cadence.len()),
            ("watts", self.watts.len()),
            ("grade_adjusted_speed", self.grade_adjusted_speed.len()),
        ];

        lengths
            .into_iter()
            .filter(|(_, len)| *len != 0 && *len != expected)
            .map(|(name, _)| name)
            .collect()
    }

    /// Whether all non-empty channels match the time channel length
    pub fn is_aligned(&self) -> bool {
        self.misaligned_channels().is_empty()
    }

    /// Distance covered according to the distance channel
    pub fn covered_distance(&self) -> Option<f64> {
        match (self.distance.first(), self.distance.last()) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        }
    }

    /// Center of the bounding box of all positions
    pub fn lat_lng_center(&self) -> Option<LatLng> {
        geo_bary_center(&self.latlng)
    }
}

/// Center of the bounding box enclosing `points`, `None` when empty.
pub fn geo_bary_center(points: &[LatLng]) -> Option<LatLng> {
    let first = points.first()?;
    let (mut min_lat, mut max_lat) = (first[0], first[0]);
    let (mut min_lng, mut max_lng) = (first[1], first[1]);

    for [lat, lng] in points.iter().skip(1) {
        min_lat = min_lat.min(*lat);
        max_lat = max_lat.max(*lat);
        min_lng = min_lng.min(*lng);
        max_lng = max_lng.max(*lng);
    }

    Some([(min_lat + max_lat) / 2.0, (min_lng + max_lng) / 2.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_bary_center() {
        let points = [[0.0, 0.0], [10.0, 20.0], [20.0, 0.0]];
        assert_eq!(geo_bary_center(&points), Some([10.0, 10.0]));
    }

    #[test]
    fn test_geo_bary_center_empty() {
        assert_eq!(geo_bary_center(&[]), None);
        assert_eq!(ActivityStreams::default().lat_lng_center(), None);
    }

    #[test]
    fn test_alignment() {
        let mut streams = ActivityStreams {
            time: vec![0.0, 1.0, 2.0],
            distance: vec![0.0, 3.0, 6.0],
            ..Default::default()
        };
        assert!(streams.is_aligned());

        streams.heartrate = vec![120.0];
        assert_eq!(streams.misaligned_channels(), vec!["heartrate"]);
    }

    #[test]
    fn test_covered_distance() {
        let streams = ActivityStreams {
            time: vec![0.0, 1.0],
            distance: vec![5.0, 1000.0],
            ..Default::default()
        };
        assert_eq!(streams.covered_distance(), Some(995.0));
        assert_eq!(ActivityStreams::default().covered_distance(), None);
    }
}
