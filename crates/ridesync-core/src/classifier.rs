//! Map source activity types to canonical sports, with a profile based
//! fallback for files that do not say what they are

use serde::{Deserialize, Serialize};

use crate::model::SportType;

/// Source type names understood by the classifier, normalized to lowercase
/// alphanumerics (`"Road Biking"` and `"road_biking"` both become `roadbiking`)
static SOURCE_TYPES: &[(&str, SportType)] = &[
    ("ride", SportType::Ride),
    ("cycling", SportType::Ride),
    ("biking", SportType::Ride),
    ("roadbiking", SportType::Ride),
    ("roadcycling", SportType::Ride),
    ("bike", SportType::Ride),
    ("virtualride", SportType::VirtualRide),
    ("virtualcycling", SportType::VirtualRide),
    ("indoorcycling", SportType::VirtualRide),
    ("ebikeride", SportType::EBikeRide),
    ("ebiking", SportType::EBikeRide),
    ("mountainbikeride", SportType::MountainBikeRide),
    ("mountainbiking", SportType::MountainBikeRide),
    ("gravelride", SportType::GravelRide),
    ("gravelcycling", SportType::GravelRide),
    ("run", SportType::Run),
    ("running", SportType::Run),
    ("streetrunning", SportType::Run),
    ("trackrunning", SportType::Run),
    ("virtualrun", SportType::VirtualRun),
    ("treadmillrunning", SportType::VirtualRun),
    ("indoorrunning", SportType::VirtualRun),
    ("trailrun", SportType::TrailRun),
    ("trailrunning", SportType::TrailRun),
    ("walk", SportType::Walk),
    ("walking", SportType::Walk),
    ("hike", SportType::Hike),
    ("hiking", SportType::Hike),
    ("swim", SportType::Swim),
    ("swimming", SportType::Swim),
    ("lapswimming", SportType::Swim),
    ("openwaterswimming", SportType::Swim),
    ("alpineski", SportType::AlpineSki),
    ("alpineskiing", SportType::AlpineSki),
    ("resortskiing", SportType::AlpineSki),
    ("backcountryski", SportType::BackcountrySki),
    ("backcountryskiing", SportType::BackcountrySki),
    ("nordicski", SportType::NordicSki),
    ("crosscountryskiing", SportType::NordicSki),
    ("snowboard", SportType::Snowboard),
    ("snowboarding", SportType::Snowboard),
    ("rowing", SportType::Rowing),
    ("indoorrowing", SportType::Rowing),
    ("kayaking", SportType::Kayaking),
    ("paddling", SportType::Kayaking),
    ("inlineskate", SportType::InlineSkate),
    ("inlineskating", SportType::InlineSkate),
    ("workout", SportType::Workout),
    ("training", SportType::Workout),
    ("fitnessequipment", SportType::Workout),
];

/// Map a source type string to a sport, `None` when unknown
pub fn sport_from_source_type(source_type: &str) -> Option<SportType> {
    let key: String = source_type
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    SOURCE_TYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, sport)| *sport)
}

/// Summary figures of an activity used to guess its sport
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    /// Meters
    pub distance: Option<f64>,
    /// Seconds
    pub duration: Option<f64>,
    /// Meters
    pub ascent: Option<f64>,
    /// m/s
    pub avg_speed: Option<f64>,
    /// m/s
    pub max_speed: Option<f64>,
}

const SKI_ASCENT_PER_KM: f64 = 75.0;
const SKI_MAX_KPH: f64 = 60.0;
const RIDE_AVG_KPH: f64 = 18.0;
const RIDE_MAX_KPH: f64 = 25.0;
const MIN_AVG_KPH: f64 = 3.0;
const UNCERTAIN_MAX_KPH: f64 = 18.0;
const UNCERTAIN_AVG_KPH: f64 = 9.5;

/// Guess Ride, Run or Other from an activity profile.
///
/// Total and pure. Profiles that do not clearly look like a ride or a run,
/// such as lift assisted ski days or slow efforts with fast bursts, are
/// reported as Other.
pub fn attempt_detect_common_sport(profile: &ActivityProfile) -> SportType {
    let positive = |value: Option<f64>| value.filter(|v| v.is_finite() && *v > 0.0);

    let (Some(distance), Some(_), Some(avg_speed), Some(max_speed)) = (
        positive(profile.distance),
        positive(profile.duration),
        positive(profile.avg_speed),
        positive(profile.max_speed),
    ) else {
        return SportType::Other;
    };

    let distance_km = distance / 1000.0;
    let ascent = profile.ascent.filter(|a| a.is_finite()).unwrap_or(0.0);
    let ascent_per_km = ascent / distance_km;
    let avg_kph = avg_speed * 3.6;
    let max_kph = max_speed * 3.6;

    if ascent_per_km >= SKI_ASCENT_PER_KM && max_kph >= SKI_MAX_KPH {
        SportType::Other
    } else if avg_kph >= RIDE_AVG_KPH || max_kph >= RIDE_MAX_KPH {
        SportType::Ride
    } else if avg_kph < MIN_AVG_KPH {
        SportType::Other
    } else if max_kph >= UNCERTAIN_MAX_KPH && avg_kph < UNCERTAIN_AVG_KPH {
        SportType::Other
    } else {
        SportType::Run
    }
}

/// Sport decided for an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SportClassification {
    pub sport: SportType,
    /// Guessed from the profile rather than read from the file
    pub auto_detected: bool,
}

/// Decides the sport of imported activities
#[derive(Debug, Clone, Copy)]
pub struct SportClassifier {
    detect_when_unknown: bool,
}

impl SportClassifier {
    pub fn new(detect_when_unknown: bool) -> Self {
        Self {
            detect_when_unknown,
        }
    }

    pub fn classify(&self, source_type: Option<&str>, profile: &ActivityProfile) -> SportClassification {
        if let Some(sport) = source_type.and_then(sport_from_source_type) {
            return SportClassification {
                sport,
                auto_detected: false,
            };
        }

        if self.detect_when_unknown {
            let sport = attempt_detect_common_sport(profile);
            tracing::debug!(
                "Detected {} for unknown source type {:?}",
                sport,
                source_type
            );
            SportClassification {
                sport,
                auto_detected: true,
            }
        } else {
            SportClassification {
                sport: SportType::Other,
                auto_detected: false,
            }
        }
    }
}

impl Default for SportClassifier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Profile from km, minutes, meters, km/h, km/h
    fn profile(
        km: Option<f64>,
        minutes: Option<f64>,
        ascent: Option<f64>,
        avg_kph: Option<f64>,
        max_kph: Option<f64>,
    ) -> ActivityProfile {
        ActivityProfile {
            distance: km.map(|d| d * 1000.0),
            duration: minutes.map(|m| m * 60.0),
            ascent,
            avg_speed: avg_kph.map(|s| s / 3.6),
            max_speed: max_kph.map(|s| s / 3.6),
        }
    }

    fn check(cases: &[(f64, f64, Option<f64>, f64, f64, SportType)]) {
        for (km, minutes, ascent, avg, max, expected) in cases {
            let p = profile(Some(*km), Some(*minutes), *ascent, Some(*avg), Some(*max));
            assert_eq!(
                attempt_detect_common_sport(&p),
                *expected,
                "{} km, {} min, {:?} m, {} km/h avg, {} km/h max",
                km,
                minutes,
                ascent,
                avg,
                max
            );
        }
    }

    #[test]
    fn test_detect_rides() {
        use SportType::Ride;
        check(&[
            (162.0, 268.0, Some(3562.2), 36.3, 81.7, Ride),
            (66.0, 213.0, Some(1578.0), 20.9, 70.9, Ride),
            (30.0, 60.0, Some(15.0), 30.0, 55.0, Ride),
            (17.0, 41.0, Some(33.0), 26.0, 37.4, Ride),
            (168.0, 506.0, Some(274.0), 28.0, 45.3, Ride),
            (32.0, 70.0, Some(721.0), 27.5, 91.8, Ride),
            (49.0, 135.0, Some(1054.56), 22.2, 77.0, Ride),
            (141.0, 394.0, Some(4043.44), 21.9, 70.5, Ride),
            (31.0, 94.0, Some(525.0), 20.0, 56.5, Ride),
            (44.0, 122.0, Some(554.0), 22.1, 61.2, Ride),
            (82.0, 217.0, Some(1098.0), 25.4, 61.9, Ride),
            (53.0, 90.0, None, 35.3, 39.9, Ride),
            (32.0, 90.0, None, 21.9, 28.4, Ride),
            (12.0, 23.0, Some(20.0), 30.8, 38.1, Ride),
            (20.0, 79.0, Some(99.0), 22.4, 38.8, Ride),
        ]);
    }

    #[test]
    fn test_detect_runs() {
        use SportType::{Other, Run};
        check(&[
            (12.0, 57.0, Some(226.0), 12.8, 17.0, Run),
            (3.0, 37.0, Some(16.2052), 6.6, 18.3, Other),
            (6.0, 56.0, Some(343.0), 6.7, 12.0, Run),
            (6.17, 34.0, Some(316.0), 10.0, 16.4, Run),
            (8.0, 38.0, Some(44.5919), 13.3, 21.9, Run),
            (5.0, 28.0, Some(10.1495), 10.9, 18.3, Run),
            (4.0, 33.0, Some(6.0), 10.4, 15.8, Run),
            (2.0, 28.0, Some(37.0), 6.3, 11.5, Run),
            (12.0, 77.0, Some(42.0), 9.8, 13.6, Run),
            (1.0, 25.0, Some(17.145), 4.6, 7.9, Run),
            (15.0, 62.0, Some(205.137), 14.5, 20.8, Run),
            (1.0, 14.0, None, 6.3, 12.9, Run),
            (6.0, 109.0, Some(594.8), 4.8, 10.4, Run),
            (2.0, 41.0, Some(12.4471), 4.7, 12.2, Run),
        ]);
    }

    #[test]
    fn test_detect_low_pace_rides() {
        use SportType::{Other, Ride};
        check(&[
            (1.0, 6.0, Some(2.0), 21.3, 33.4, Ride),
            (1.0, 6.0, None, 19.4, 29.5, Ride),
            (7.0, 88.0, Some(55.0), 8.4, 19.8, Other),
            (11.0, 111.0, Some(103.688), 12.2, 34.2, Ride),
            (2.0, 7.0, Some(14.0), 19.9, 28.8, Ride),
        ]);
    }

    #[test]
    fn test_detect_alpine_ski_as_other() {
        use SportType::Other;
        check(&[
            (129.0, 477.0, Some(14283.0), 18.3, 108.7, Other),
            (100.0, 398.0, Some(10511.0), 17.6, 144.3, Other),
            (42.0, 224.0, Some(3405.0), 13.2, 85.3, Other),
            (40.0, 297.0, Some(4477.0), 13.2, 81.3, Other),
        ]);
    }

    #[test]
    fn test_detect_incomplete_profiles_as_other() {
        let missing_speeds = profile(Some(10.0), Some(60.0), Some(10.0), None, None);
        assert_eq!(attempt_detect_common_sport(&missing_speeds), SportType::Other);

        let missing_distance = profile(None, Some(60.0), Some(10.0), Some(10.0), Some(15.0));
        assert_eq!(attempt_detect_common_sport(&missing_distance), SportType::Other);

        assert_eq!(
            attempt_detect_common_sport(&ActivityProfile::default()),
            SportType::Other
        );
    }

    #[test]
    fn test_sport_from_source_type() {
        assert_eq!(sport_from_source_type("Biking"), Some(SportType::Ride));
        assert_eq!(sport_from_source_type("cycling"), Some(SportType::Ride));
        assert_eq!(sport_from_source_type("road_biking"), Some(SportType::Ride));
        assert_eq!(sport_from_source_type("Running"), Some(SportType::Run));
        assert_eq!(sport_from_source_type("virtual_ride"), Some(SportType::VirtualRide));
        assert_eq!(sport_from_source_type("trail_running"), Some(SportType::TrailRun));
        assert_eq!(sport_from_source_type("alpine_skiing"), Some(SportType::AlpineSki));
        assert_eq!(sport_from_source_type("Other"), None);
        assert_eq!(sport_from_source_type(""), None);
    }

    #[test]
    fn test_classifier_prefers_source_type() {
        let classifier = SportClassifier::new(true);
        let ride_profile = profile(Some(30.0), Some(60.0), Some(15.0), Some(30.0), Some(55.0));

        let result = classifier.classify(Some("Running"), &ride_profile);
        assert_eq!(result.sport, SportType::Run);
        assert!(!result.auto_detected);
    }

    #[test]
    fn test_classifier_detects_unknown_type() {
        let ride_profile = profile(Some(30.0), Some(60.0), Some(15.0), Some(30.0), Some(55.0));

        let detected = SportClassifier::new(true).classify(Some("Other"), &ride_profile);
        assert_eq!(detected.sport, SportType::Ride);
        assert!(detected.auto_detected);

        let disabled = SportClassifier::new(false).classify(None, &ride_profile);
        assert_eq!(disabled.sport, SportType::Other);
        assert!(!disabled.auto_detected);
    }
}
