//! Turn parsed samples into aligned activity streams

use crate::model::{ActivityStreams, LatLng};
use crate::parser::{ParsedActivity, TrackSample};

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Horizontal distance over which grade is measured
const GRADE_WINDOW_METERS: f64 = 20.0;

/// Grades beyond this are treated as GPS or barometer noise
const MAX_GRADE_PERCENT: f64 = 40.0;

const SMOOTHING_WINDOW: usize = 5;

/// A channel for which the source holds no value at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoStreamData;

impl std::fmt::Display for NoStreamData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "No streams found")
    }
}

impl std::error::Error for NoStreamData {}

/// Build canonical streams from a parsed activity.
///
/// Channels without data come out empty; partially recorded channels are
/// filled so that every non-empty channel matches the time channel.
pub fn extract_streams(parsed: &ParsedActivity) -> ActivityStreams {
    let samples = &parsed.samples;
    let Some(first) = samples.first() else {
        tracing::debug!("{} has no samples", parsed.path.display());
        return ActivityStreams::default();
    };

    let origin = first.time;
    let time: Vec<f64> = samples
        .iter()
        .map(|s| (s.time - origin).num_milliseconds() as f64 / 1000.0)
        .collect();

    let read = |name: &str, values: Result<Vec<f64>, NoStreamData>| -> Vec<f64> {
        values.unwrap_or_else(|reason| {
            tracing::debug!("{}: {} for {}", parsed.path.display(), reason, name);
            Vec::new()
        })
    };

    let latlng: Vec<LatLng> = squash(samples.iter().map(|s| s.position)).unwrap_or_else(|reason| {
        tracing::debug!("{}: {} for latlng", parsed.path.display(), reason);
        Vec::new()
    });
    let altitude = read("altitude", channel(samples, |s| s.altitude));
    let heartrate = read("heartrate", channel(samples, |s| s.heart_rate));
    let cadence = read("cadence", channel(samples, |s| s.cadence));
    let watts = read("watts", channel(samples, |s| s.power));

    let distance = match channel(samples, |s| s.distance) {
        Ok(distance) => distance,
        Err(_) if !latlng.is_empty() => cumulative_distance(&latlng),
        Err(reason) => read("distance", Err(reason)),
    };

    let velocity_smooth = match channel(samples, |s| s.speed) {
        Ok(speed) => speed,
        Err(_) if !distance.is_empty() => {
            moving_average(&speed_from_distance(&time, &distance), SMOOTHING_WINDOW)
        }
        Err(reason) => read("velocity_smooth", Err(reason)),
    };

    let grade_smooth = if !distance.is_empty() && !altitude.is_empty() {
        moving_average(&grade_stream(&distance, &altitude), SMOOTHING_WINDOW)
    } else {
        read("grade_smooth", Err(NoStreamData))
    };

    ActivityStreams {
        time,
        latlng,
        distance,
        altitude,
        velocity_smooth,
        grade_smooth,
        heartrate,
        cadence,
        watts,
        grade_adjusted_speed: Vec::new(),
    }
}

fn channel<F>(samples: &[TrackSample], value: F) -> Result<Vec<f64>, NoStreamData>
where
    F: Fn(&TrackSample) -> Option<f64>,
{
    squash(samples.iter().map(value))
}

/// Fill gaps with the previous value, leading gaps with the first value.
///
/// Fails when no value is present at all.
pub fn squash<T, I>(values: I) -> Result<Vec<T>, NoStreamData>
where
    T: Copy,
    I: IntoIterator<Item = Option<T>>,
{
    let values: Vec<Option<T>> = values.into_iter().collect();
    let mut last = values.iter().flatten().next().copied().ok_or(NoStreamData)?;

    Ok(values
        .into_iter()
        .map(|value| {
            if let Some(value) = value {
                last = value;
            }
            last
        })
        .collect())
}

/// Great circle distance in meters
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a[0].to_radians(), b[0].to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b[1] - a[1]).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

fn cumulative_distance(latlng: &[LatLng]) -> Vec<f64> {
    let mut total = 0.0;
    let mut distance = Vec::with_capacity(latlng.len());
    distance.push(0.0);
    for pair in latlng.windows(2) {
        total += haversine_distance(pair[0], pair[1]);
        distance.push(total);
    }
    distance.truncate(latlng.len());
    distance
}

fn speed_from_distance(time: &[f64], distance: &[f64]) -> Vec<f64> {
    let mut speed = Vec::with_capacity(time.len());
    let mut last = 0.0;
    for i in 0..time.len() {
        if i > 0 {
            let dt = time[i] - time[i - 1];
            if dt > 0.0 {
                last = ((distance[i] - distance[i - 1]) / dt).max(0.0);
            }
        }
        speed.push(last);
    }
    speed
}

/// Grade in percent measured over at least [`GRADE_WINDOW_METERS`]
fn grade_stream(distance: &[f64], altitude: &[f64]) -> Vec<f64> {
    let mut grade = Vec::with_capacity(distance.len());
    let mut anchor = 0;
    let mut last = 0.0;

    for i in 0..distance.len() {
        while anchor + 1 < i && distance[i] - distance[anchor + 1] >= GRADE_WINDOW_METERS {
            anchor += 1;
        }
        let run = distance[i] - distance[anchor];
        if anchor < i && run >= GRADE_WINDOW_METERS {
            last = (100.0 * (altitude[i] - altitude[anchor]) / run)
                .clamp(-MAX_GRADE_PERCENT, MAX_GRADE_PERCENT);
        }
        grade.push(last);
    }
    grade
}

/// Centered moving average
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let from = i.saturating_sub(half);
            let to = (i + half + 1).min(values.len());
            let slice = &values[from..to];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceSummary;
    use crate::scanner::ActivityFileType;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::path::PathBuf;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 8, 15, 13, 0, 0).unwrap()
    }

    fn parsed(samples: Vec<TrackSample>) -> ParsedActivity {
        ParsedActivity {
            path: PathBuf::from("test.gpx"),
            file_type: ActivityFileType::Gpx,
            sport: None,
            name: None,
            start_time: start(),
            end_time: samples.last().map(|s| s.time).unwrap_or_else(start),
            trainer: false,
            samples,
            summary: SourceSummary::default(),
        }
    }

    fn sample(secs: i64) -> TrackSample {
        TrackSample::at(start() + Duration::seconds(secs))
    }

    #[test]
    fn test_squash() {
        assert_eq!(
            squash(vec![None, Some(1.0), None, Some(3.0), None]),
            Ok(vec![1.0, 1.0, 1.0, 3.0, 3.0])
        );
        assert_eq!(squash::<f64, _>(vec![None, None]), Err(NoStreamData));
        assert_eq!(squash::<f64, _>(Vec::new()), Err(NoStreamData));
    }

    #[test]
    fn test_haversine_distance() {
        // One degree of latitude is about 111.2 km
        let d = haversine_distance([0.0, 0.0], [1.0, 0.0]);
        assert!((d - 111_195.0).abs() < 10.0);
        assert_eq!(haversine_distance([45.0, 5.0], [45.0, 5.0]), 0.0);
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[1.0, 2.0, 3.0], 3), vec![1.5, 2.0, 2.5]);
        assert!(moving_average(&[], 5).is_empty());
    }

    #[test]
    fn test_extract_missing_channels_are_empty() {
        let samples = (0..4)
            .map(|i| TrackSample {
                heart_rate: Some(120.0 + i as f64),
                ..sample(i)
            })
            .collect();

        let streams = extract_streams(&parsed(samples));

        assert_eq!(streams.time, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(streams.heartrate, vec![120.0, 121.0, 122.0, 123.0]);
        assert!(streams.latlng.is_empty());
        assert!(streams.distance.is_empty());
        assert!(streams.altitude.is_empty());
        assert!(streams.velocity_smooth.is_empty());
        assert!(streams.grade_smooth.is_empty());
        assert!(streams.cadence.is_empty());
        assert!(streams.watts.is_empty());
        assert!(streams.grade_adjusted_speed.is_empty());
        assert!(streams.is_aligned());
    }

    #[test]
    fn test_extract_derives_distance_speed_and_grade() {
        // Heading north at ~11.1 m/s on a steady 5% climb
        let samples = (0..30)
            .map(|i| TrackSample {
                position: Some([45.0 + i as f64 * 0.0001, 6.0]),
                altitude: Some(100.0 + i as f64 * 0.556),
                ..sample(i)
            })
            .collect();

        let streams = extract_streams(&parsed(samples));

        assert!(streams.is_aligned());
        assert_eq!(streams.latlng.len(), 30);
        assert_eq!(streams.latlng[1], [45.0001, 6.0]);

        let total = streams.distance[29];
        assert!((total - 29.0 * 11.12).abs() < 1.0, "distance {}", total);

        let speed = streams.velocity_smooth[15];
        assert!((speed - 11.12).abs() < 0.1, "speed {}", speed);

        let grade = streams.grade_smooth[20];
        assert!((grade - 5.0).abs() < 0.2, "grade {}", grade);
        assert!(streams.watts.is_empty());
        assert!(streams.grade_adjusted_speed.is_empty());
    }

    #[test]
    fn test_extract_prefers_source_distance_and_speed() {
        let samples = (0..3)
            .map(|i| TrackSample {
                position: Some([10.0, 10.0]),
                distance: Some(i as f64 * 5.0),
                speed: if i == 1 { None } else { Some(5.0) },
                ..sample(i)
            })
            .collect();

        let streams = extract_streams(&parsed(samples));

        assert_eq!(streams.distance, vec![0.0, 5.0, 10.0]);
        assert_eq!(streams.velocity_smooth, vec![5.0, 5.0, 5.0]);
        assert_eq!(streams.latlng, vec![[10.0, 10.0]; 3]);
    }

    #[test]
    fn test_extract_without_samples() {
        let streams = extract_streams(&parsed(Vec::new()));
        assert_eq!(streams, ActivityStreams::default());
    }
}
