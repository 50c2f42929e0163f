//! Canonical sport taxonomy

use serde::{Deserialize, Serialize};

/// Canonical sport type of an activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SportType {
    Ride,
    VirtualRide,
    EBikeRide,
    MountainBikeRide,
    GravelRide,
    Run,
    VirtualRun,
    TrailRun,
    Walk,
    Hike,
    Swim,
    AlpineSki,
    BackcountrySki,
    NordicSki,
    Snowboard,
    Rowing,
    Kayaking,
    InlineSkate,
    Workout,
    #[default]
    Other,
}

impl SportType {
    /// Any cycling discipline
    pub fn is_cycling(&self) -> bool {
        matches!(
            self,
            Self::Ride
                | Self::VirtualRide
                | Self::EBikeRide
                | Self::MountainBikeRide
                | Self::GravelRide
        )
    }

    /// Any running discipline
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Run | Self::VirtualRun | Self::TrailRun)
    }

    /// Indoor variants recorded on a trainer or treadmill
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::VirtualRide | Self::VirtualRun)
    }

    /// Human label used in default activity names
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ride => "Ride",
            Self::VirtualRide => "Virtual Ride",
            Self::EBikeRide => "E-Bike Ride",
            Self::MountainBikeRide => "Mountain Bike Ride",
            Self::GravelRide => "Gravel Ride",
            Self::Run => "Run",
            Self::VirtualRun => "Virtual Run",
            Self::TrailRun => "Trail Run",
            Self::Walk => "Walk",
            Self::Hike => "Hike",
            Self::Swim => "Swim",
            Self::AlpineSki => "Alpine Ski",
            Self::BackcountrySki => "Backcountry Ski",
            Self::NordicSki => "Nordic Ski",
            Self::Snowboard => "Snowboard",
            Self::Rowing => "Rowing",
            Self::Kayaking => "Kayaking",
            Self::InlineSkate => "Inline Skate",
            Self::Workout => "Workout",
            Self::Other => "Activity",
        }
    }
}

impl std::fmt::Display for SportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_families() {
        assert!(SportType::Ride.is_cycling());
        assert!(SportType::VirtualRide.is_cycling());
        assert!(!SportType::Run.is_cycling());
        assert!(SportType::TrailRun.is_running());
        assert!(SportType::VirtualRun.is_virtual());
        assert!(!SportType::Ride.is_virtual());
    }

    #[test]
    fn test_sport_display_matches_serde() {
        assert_eq!(SportType::VirtualRide.to_string(), "VirtualRide");
        assert_eq!(
            serde_json::to_string(&SportType::VirtualRide).unwrap(),
            "\"VirtualRide\""
        );
        assert_eq!(SportType::default(), SportType::Other);
    }
}
