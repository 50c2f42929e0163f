//! Summary statistics computed from activity streams

use crate::error::Result;
use crate::model::{
    ActivityStreams, AthleteSnapshot, BareActivity, ChannelStats, ElevationStats, ExtendedStats,
    PrimitiveSourceData,
};

/// Everything a statistics computer may look at
#[derive(Debug, Clone, Copy)]
pub struct StatsInput<'a> {
    pub activity: &'a BareActivity,
    pub streams: &'a ActivityStreams,
    pub athlete: &'a AthleteSnapshot,
    pub source: &'a PrimitiveSourceData,
}

/// Computes extended statistics of an activity.
///
/// Implementations must be deterministic: the same input always yields the
/// same statistics, since they feed the activity fingerprint.
pub trait StatsComputer: Send + Sync {
    fn compute(&self, input: &StatsInput<'_>) -> Result<ExtendedStats>;
}

/// Speed under which a cyclist is considered stopped, m/s
const CYCLING_MOVING_THRESHOLD: f64 = 1.0;
/// Speed under which anyone else is considered stopped, m/s
const DEFAULT_MOVING_THRESHOLD: f64 = 0.5;
/// Altitude change needed before it counts as climbing or descending, meters
const ELEVATION_THRESHOLD: f64 = 2.0;

/// Straightforward averages and totals over the streams
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicStatsComputer;

impl StatsComputer for BasicStatsComputer {
    fn compute(&self, input: &StatsInput<'_>) -> Result<ExtendedStats> {
        let streams = input.streams;

        let elapsed_time = match (streams.time.first(), streams.time.last()) {
            (Some(first), Some(last)) if streams.time.len() > 1 => Some(last - first),
            _ => None,
        };

        let threshold = if input.activity.sport.is_cycling() {
            CYCLING_MOVING_THRESHOLD
        } else {
            DEFAULT_MOVING_THRESHOLD
        };
        let moving_time = moving_time(&streams.time, &streams.velocity_smooth, threshold);
        let pause_time = elapsed_time
            .zip(moving_time)
            .map(|(elapsed, moving)| (elapsed - moving).max(0.0));

        Ok(ExtendedStats {
            moving_time,
            elapsed_time,
            pause_time,
            distance: streams.covered_distance(),
            elevation: elevation_stats(&streams.altitude),
            speed: channel_stats(&streams.velocity_smooth, false),
            heart_rate: channel_stats(&streams.heartrate, true),
            cadence: channel_stats(&streams.cadence, true),
            power: channel_stats(&streams.watts, false),
            ..Default::default()
        })
    }
}

/// Sum of time steps spent above `threshold`
fn moving_time(time: &[f64], velocity: &[f64], threshold: f64) -> Option<f64> {
    if velocity.len() != time.len() || time.len() < 2 {
        return None;
    }

    let moving = time
        .windows(2)
        .zip(&velocity[1..])
        .filter(|(_, speed)| **speed >= threshold)
        .map(|(step, _)| step[1] - step[0])
        .sum();

    Some(moving)
}

/// Ascent and descent ignoring altitude jitter below a small threshold
pub(crate) fn elevation_stats(altitude: &[f64]) -> Option<ElevationStats> {
    let first = *altitude.first()?;
    let mut stats = ElevationStats {
        min: first,
        max: first,
        ..Default::default()
    };

    let mut reference = first;
    for &value in &altitude[1..] {
        stats.min = stats.min.min(value);
        stats.max = stats.max.max(value);

        let delta = value - reference;
        if delta.abs() >= ELEVATION_THRESHOLD {
            if delta > 0.0 {
                stats.ascent += delta;
            } else {
                stats.descent -= delta;
            }
            reference = value;
        }
    }

    Some(stats)
}

/// Mean and max of a channel, optionally ignoring zero samples
fn channel_stats(values: &[f64], skip_zeros: bool) -> Option<ChannelStats> {
    let counted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| !skip_zeros || *v > 0.0)
        .collect();
    if counted.is_empty() {
        return None;
    }

    Some(ChannelStats {
        avg: counted.iter().sum::<f64>() / counted.len() as f64,
        max: counted.iter().copied().fold(f64::MIN, f64::max),
    })
}

/// Fill the primitive totals of `activity`.
///
/// Computed statistics win, then values reported by the source file; totals
/// known from neither stay `None`. Distance comes from the distance stream
/// when there is one.
pub fn update_primitive_stats(
    activity: &mut BareActivity,
    stats: Option<&ExtendedStats>,
    streams: &ActivityStreams,
    source: &PrimitiveSourceData,
) {
    activity.elapsed_time_raw = stats
        .and_then(|s| s.elapsed_time)
        .or(source.elapsed_time);
    activity.moving_time_raw = stats.and_then(|s| s.moving_time).or(source.moving_time);
    activity.elevation_gain_raw = stats
        .and_then(|s| s.elevation)
        .map(|e| e.ascent)
        .or(source.elevation_gain);
    activity.distance_raw = streams.covered_distance().or(source.distance);
}
