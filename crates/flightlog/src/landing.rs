//! Day and night landing classification.
//!
//! A landing counts only when the crew member flew it (`LANDING` = 1). It is a
//! night landing when touchdown is before local sunrise or at/after the end of
//! civil twilight at the destination. Takeoffs use the same rule at the
//! origin. Whenever the sun window cannot be computed the event counts as day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::airport::AirportInfo;
use crate::sun::SunCalculator;
use crate::transform::Issue;

/// Outcome of classifying a takeoff or landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingClass {
    /// Not flown by this crew member.
    #[default]
    None,
    /// Daytime.
    Day,
    /// Night.
    Night,
}

impl LandingClass {
    /// `(day, night)` counts.
    #[must_use]
    pub fn counts(self) -> (u32, u32) {
        match self {
            Self::None => (0, 0),
            Self::Day => (1, 0),
            Self::Night => (0, 1),
        }
    }
}

impl std::fmt::Display for LandingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Day => write!(f, "day"),
            Self::Night => write!(f, "night"),
        }
    }
}

/// Classifies takeoffs and landings against local twilight.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandingClassifier {
    sun: SunCalculator,
}

impl LandingClassifier {
    /// Create a classifier.
    #[must_use]
    pub fn new(sun: SunCalculator) -> Self {
        Self { sun }
    }

    /// Classify a landing at `destination` touching down at `touchdown`.
    #[must_use]
    pub fn classify_landing(
        &self,
        performed: bool,
        destination: &AirportInfo,
        touchdown: DateTime<Utc>,
    ) -> (LandingClass, Option<Issue>) {
        self.classify(performed, destination, touchdown, "landing")
    }

    /// Classify a takeoff from `origin` lifting off at `liftoff`.
    #[must_use]
    pub fn classify_takeoff(
        &self,
        performed: bool,
        origin: &AirportInfo,
        liftoff: DateTime<Utc>,
    ) -> (LandingClass, Option<Issue>) {
        self.classify(performed, origin, liftoff, "takeoff")
    }

    fn classify(
        &self,
        performed: bool,
        airport: &AirportInfo,
        at: DateTime<Utc>,
        context: &str,
    ) -> (LandingClass, Option<Issue>) {
        if !performed {
            return (LandingClass::None, None);
        }
        if airport.is_unknown() {
            return (LandingClass::Day, None);
        }

        let tz = airport.timezone;
        let date = at.with_timezone(&tz).date_naive();
        let window = self.sun.window(airport.latitude, airport.longitude, date, &tz);

        match window.is_past_twilight_at(at) {
            Some(true) => (LandingClass::Night, None),
            Some(false) => (LandingClass::Day, None),
            None => (
                LandingClass::Day,
                Some(Issue::SunCalculation {
                    location: airport.code.clone(),
                    date,
                    status: window.status,
                    context: context.to_string(),
                }),
            ),
        }
    }
}
