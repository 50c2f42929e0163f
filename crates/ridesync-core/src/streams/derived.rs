//! Streams synthesized when the source did not record them

use crate::error::{Error, Result};
use crate::model::{ActivityStreams, AthleteSettings, BareActivity, SportType};

const GRAVITY: f64 = 9.80665;
const AIR_DENSITY: f64 = 1.225;
/// Drag area of a rider on the hoods
const DRAG_AREA: f64 = 0.3;
const ROLLING_RESISTANCE: f64 = 0.005;
const DRIVETRAIN_EFFICIENCY: f64 = 0.97;
const BIKE_WEIGHT_KG: f64 = 10.0;

/// Energy cost of running on flat ground, J/kg/m
const FLAT_RUNNING_COST: f64 = 3.6;
const MAX_RUNNING_GRADE: f64 = 0.45;

/// Estimate cycling power in watts for each speed/grade sample.
///
/// Speeds are in m/s, grades in percent, weight in kilograms.
pub fn estimate_cycling_power_stream(
    sport: SportType,
    speeds: &[f64],
    grades: &[f64],
    rider_weight: Option<f64>,
) -> Result<Vec<f64>> {
    if !matches!(sport, SportType::Ride | SportType::VirtualRide) {
        return Err(Error::Compute(format!(
            "Cannot estimate cycling power for sport {}",
            sport
        )));
    }
    if speeds.is_empty() {
        return Err(Error::Compute("Velocity stream is empty".into()));
    }
    if grades.is_empty() {
        return Err(Error::Compute("Grade stream is empty".into()));
    }
    if speeds.len() != grades.len() {
        return Err(Error::Compute(format!(
            "Velocity ({}) and grade ({}) streams are not aligned",
            speeds.len(),
            grades.len()
        )));
    }
    let weight = rider_weight
        .filter(|w| *w > 0.0)
        .ok_or_else(|| Error::Compute("Athlete weight is required to estimate power".into()))?;

    let total_mass = weight + BIKE_WEIGHT_KG;

    Ok(speeds
        .iter()
        .zip(grades)
        .map(|(&speed, &grade)| {
            let angle = (grade / 100.0).atan();
            let climbing = total_mass * GRAVITY * angle.sin();
            let rolling = total_mass * GRAVITY * angle.cos() * ROLLING_RESISTANCE;
            let drag = 0.5 * AIR_DENSITY * DRAG_AREA * speed * speed;
            let power = (climbing + rolling + drag) * speed / DRIVETRAIN_EFFICIENCY;
            power.max(0.0).round()
        })
        .collect())
}

/// Minetti cost of running at `grade` (fraction), J/kg/m
fn running_cost(grade: f64) -> f64 {
    let i = grade.clamp(-MAX_RUNNING_GRADE, MAX_RUNNING_GRADE);
    155.4 * i.powi(5) - 30.4 * i.powi(4) - 43.3 * i.powi(3) + 46.3 * i.powi(2) + 19.5 * i
        + FLAT_RUNNING_COST
}

/// Equivalent flat ground speed for each speed/grade sample
pub fn grade_adjusted_speed_stream(speeds: &[f64], grades: &[f64]) -> Vec<f64> {
    speeds
        .iter()
        .zip(grades)
        .map(|(&speed, &grade)| speed * running_cost(grade / 100.0) / FLAT_RUNNING_COST)
        .collect()
}

/// Fill in streams the recording device did not provide.
///
/// Cycling activities without power get an estimated power stream when a
/// grade stream exists. Runs get a grade adjusted speed stream.
pub fn compute_additional_streams(
    activity: &BareActivity,
    streams: &mut ActivityStreams,
    settings: &AthleteSettings,
) -> Result<()> {
    let sport = activity.sport;

    if matches!(sport, SportType::Ride | SportType::VirtualRide) && streams.watts.is_empty() {
        if streams.grade_smooth.is_empty() {
            tracing::debug!("No grade stream for {}, skipping power estimation", activity.id);
        } else {
            streams.watts = estimate_cycling_power_stream(
                sport,
                &streams.velocity_smooth,
                &streams.grade_smooth,
                settings.weight,
            )?;
        }
    }

    if sport.is_running()
        && streams.grade_adjusted_speed.is_empty()
        && !streams.velocity_smooth.is_empty()
        && streams.velocity_smooth.len() == streams.grade_smooth.len()
    {
        streams.grade_adjusted_speed =
            grade_adjusted_speed_stream(&streams.velocity_smooth, &streams.grade_smooth);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectorType, FileLocation};
    use chrono::{TimeZone, Utc};

    fn activity(sport: SportType) -> BareActivity {
        let start = Utc.with_ymd_and_hms(2019, 8, 15, 13, 0, 0).unwrap();
        BareActivity {
            id: "abc123-def456".into(),
            name: "Afternoon Ride".into(),
            sport,
            start_time: start,
            end_time: start + chrono::Duration::seconds(4),
            distance_raw: None,
            moving_time_raw: None,
            elapsed_time_raw: None,
            elevation_gain_raw: None,
            has_power_meter: false,
            trainer: false,
            commute: None,
            calories: None,
            start_timestamp: start.timestamp(),
            source_connector: ConnectorType::File,
            origin: FileLocation::default(),
        }
    }

    fn streams() -> ActivityStreams {
        ActivityStreams {
            time: vec![0.0, 1.0, 2.0, 3.0],
            velocity_smooth: vec![8.0, 9.0, 10.0, 0.0],
            grade_smooth: vec![0.0, 2.0, 5.0, 0.0],
            ..Default::default()
        }
    }

    // ==================== Power Estimation Tests ====================

    #[test]
    fn test_power_one_sample_per_input() {
        let s = streams();
        let power =
            estimate_cycling_power_stream(SportType::Ride, &s.velocity_smooth, &s.grade_smooth, Some(75.0))
                .unwrap();

        assert_eq!(power.len(), 4);
        assert!(power[0] > 0.0);
        assert!(power[2] > power[1], "climbing harder needs more power");
        assert_eq!(power[3], 0.0);
    }

    #[test]
    fn test_power_on_flat_ground() {
        // 10 m/s on the flat, 85 kg system
        let power =
            estimate_cycling_power_stream(SportType::VirtualRide, &[10.0], &[0.0], Some(75.0)).unwrap();
        let expected = (85.0 * GRAVITY * ROLLING_RESISTANCE + 0.5 * AIR_DENSITY * DRAG_AREA * 100.0)
            * 10.0
            / DRIVETRAIN_EFFICIENCY;
        assert_eq!(power[0], expected.round());
    }

    #[test]
    fn test_power_downhill_clamps_to_zero() {
        let power =
            estimate_cycling_power_stream(SportType::Ride, &[12.0], &[-12.0], Some(75.0)).unwrap();
        assert_eq!(power, vec![0.0]);
    }

    #[test]
    fn test_power_rejects_invalid_inputs() {
        let s = streams();
        let v = &s.velocity_smooth;
        let g = &s.grade_smooth;

        assert!(estimate_cycling_power_stream(SportType::Run, v, g, Some(75.0)).is_err());
        assert!(estimate_cycling_power_stream(SportType::Ride, &[], g, Some(75.0)).is_err());
        assert!(estimate_cycling_power_stream(SportType::Ride, v, &[], Some(75.0)).is_err());
        assert!(estimate_cycling_power_stream(SportType::Ride, v, g, None).is_err());
        assert!(estimate_cycling_power_stream(SportType::Ride, v, &g[..2], Some(75.0)).is_err());
    }

    // ==================== Additional Streams Tests ====================

    #[test]
    fn test_additional_streams_estimates_missing_power() {
        let mut s = streams();
        compute_additional_streams(&activity(SportType::Ride), &mut s, &AthleteSettings::default())
            .unwrap();
        assert_eq!(s.watts.len(), 4);
    }

    #[test]
    fn test_additional_streams_skips_without_grade() {
        let mut s = streams();
        s.grade_smooth.clear();
        compute_additional_streams(&activity(SportType::Ride), &mut s, &AthleteSettings::default())
            .unwrap();
        assert!(s.watts.is_empty());
    }

    #[test]
    fn test_additional_streams_keeps_recorded_power() {
        let mut s = streams();
        s.watts = vec![100.0, 110.0, 120.0, 0.0];
        compute_additional_streams(&activity(SportType::Ride), &mut s, &AthleteSettings::default())
            .unwrap();
        assert_eq!(s.watts, vec![100.0, 110.0, 120.0, 0.0]);
    }

    #[test]
    fn test_additional_streams_fails_without_weight() {
        let mut s = streams();
        let settings = AthleteSettings {
            weight: None,
            ..Default::default()
        };
        let result = compute_additional_streams(&activity(SportType::Ride), &mut s, &settings);
        assert!(matches!(result, Err(Error::Compute(_))));
    }

    #[test]
    fn test_additional_streams_run_grade_adjusted_speed() {
        let mut s = streams();
        compute_additional_streams(&activity(SportType::Run), &mut s, &AthleteSettings::default())
            .unwrap();

        assert!(s.watts.is_empty());
        assert_eq!(s.grade_adjusted_speed.len(), 4);
        assert!((s.grade_adjusted_speed[0] - 8.0).abs() < 1e-9);
        assert!(s.grade_adjusted_speed[2] > 10.0, "uphill is harder than flat");
    }

    #[test]
    fn test_running_cost_is_flat_at_zero() {
        assert_eq!(running_cost(0.0), FLAT_RUNNING_COST);
        assert!(running_cost(0.1) > FLAT_RUNNING_COST);
        assert!(running_cost(-0.1) < FLAT_RUNNING_COST);
    }
}
