//! Night-time estimation.
//!
//! Two methods share one contract: given the resolved origin and destination
//! and the gate-out and gate-in instants, return the fraction of the flight
//! flown at night.
//!
//! - [`NightMethod::Boundary`] compares the flight against the origin's night
//!   windows and answers 0, 0.5 or 1. Used when the two airports' UTC offsets
//!   differ by no more than the method threshold (4 hours by default).
//! - [`NightMethod::Sampling`] walks the route in fixed steps,
//!   interpolating the position linearly, and counts the samples taken after
//!   local sunset or before local sunrise.
//!
//! The boundary method is deliberately coarse, so the fraction jumps at the
//! threshold. Both methods are deterministic.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::airport::AirportInfo;
use crate::sun::{SunCalculator, SunWindow};
use crate::transform::Issue;

/// Default offset difference, in hours, up to which the boundary method is used.
pub const DEFAULT_METHOD_THRESHOLD_HOURS: f64 = 4.0;

/// Default spacing of route samples, in minutes.
pub const DEFAULT_SAMPLE_INTERVAL_MINUTES: u32 = 10;

/// Night estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightMethod {
    /// Three-way classification against the origin's night windows.
    Boundary,
    /// Ratio of dark samples along the interpolated route.
    Sampling,
}

impl std::fmt::Display for NightMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boundary => write!(f, "boundary"),
            Self::Sampling => write!(f, "sampling"),
        }
    }
}

/// Result of one night estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct NightEstimate {
    /// The method used, or `None` when the estimate short-circuited.
    pub method: Option<NightMethod>,
    /// Night fraction in `[0, 1]`.
    pub fraction: f64,
    /// Warnings raised while estimating.
    pub issues: Vec<Issue>,
}

impl NightEstimate {
    fn skipped() -> Self {
        Self {
            method: None,
            fraction: 0.0,
            issues: Vec::new(),
        }
    }
}

/// Night-time estimator.
#[derive(Debug, Clone, Copy)]
pub struct NightEstimator {
    sun: SunCalculator,
    threshold_hours: f64,
    sample_interval: Duration,
}

impl Default for NightEstimator {
    fn default() -> Self {
        Self::new(
            SunCalculator::default(),
            DEFAULT_METHOD_THRESHOLD_HOURS,
            DEFAULT_SAMPLE_INTERVAL_MINUTES,
        )
    }
}

impl NightEstimator {
    /// Create an estimator.
    ///
    /// A zero sample interval is treated as one minute.
    #[must_use]
    pub fn new(sun: SunCalculator, threshold_hours: f64, sample_interval_minutes: u32) -> Self {
        Self {
            sun,
            threshold_hours,
            sample_interval: Duration::minutes(i64::from(sample_interval_minutes.max(1))),
        }
    }

    /// Choose the method for a flight departing at `at`.
    #[must_use]
    pub fn select_method(
        &self,
        origin: &AirportInfo,
        destination: &AirportInfo,
        at: DateTime<Utc>,
    ) -> NightMethod {
        let diff = (origin.utc_offset_hours(at) - destination.utc_offset_hours(at)).abs();
        if diff <= self.threshold_hours {
            NightMethod::Boundary
        } else {
            NightMethod::Sampling
        }
    }

    /// Night fraction of the flight from `out` to `arrival`.
    #[must_use]
    pub fn night_fraction(
        &self,
        origin: &AirportInfo,
        destination: &AirportInfo,
        out: DateTime<Utc>,
        arrival: DateTime<Utc>,
    ) -> f64 {
        self.estimate(origin, destination, out, arrival).fraction
    }

    /// Estimate the night fraction with the method and any warnings.
    ///
    /// Unknown airports and non-positive durations short-circuit to 0.
    #[must_use]
    pub fn estimate(
        &self,
        origin: &AirportInfo,
        destination: &AirportInfo,
        out: DateTime<Utc>,
        arrival: DateTime<Utc>,
    ) -> NightEstimate {
        if origin.is_unknown() || destination.is_unknown() || arrival <= out {
            return NightEstimate::skipped();
        }

        let method = self.select_method(origin, destination, out);
        let estimate = match method {
            NightMethod::Boundary => self.boundary(origin, out, arrival),
            NightMethod::Sampling => self.sampling(origin, destination, out, arrival),
        };
        debug!(
            origin = %origin.code,
            destination = %destination.code,
            %method,
            fraction = estimate.fraction,
            "estimated night fraction"
        );
        estimate
    }

    fn boundary(
        &self,
        origin: &AirportInfo,
        out: DateTime<Utc>,
        arrival: DateTime<Utc>,
    ) -> NightEstimate {
        let tz = origin.timezone;
        let day = out.with_timezone(&tz).date_naive();
        let days = [day.pred_opt(), Some(day), day.succ_opt()];

        let mut windows: Vec<SunWindow> = Vec::with_capacity(3);
        for date in days {
            let Some(date) = date else {
                return NightEstimate::skipped();
            };
            let window = self.sun.window(origin.latitude, origin.longitude, date, &tz);
            if !window.is_valid() {
                return NightEstimate {
                    method: Some(NightMethod::Boundary),
                    fraction: 0.0,
                    issues: vec![Issue::SunCalculation {
                        location: origin.code.clone(),
                        date,
                        status: window.status,
                        context: "night time".to_string(),
                    }],
                };
            }
            windows.push(window);
        }

        // Night spans from one day's sunset to the next day's sunrise.
        let nights: Vec<(DateTime<Utc>, DateTime<Utc>)> = windows
            .windows(2)
            .filter_map(|pair| Some((pair[0].sunset_utc()?, pair[1].sunrise_utc()?)))
            .collect();

        let fraction = boundary_fraction(&nights, out, arrival);
        NightEstimate {
            method: Some(NightMethod::Boundary),
            fraction,
            issues: Vec::new(),
        }
    }

    fn sampling(
        &self,
        origin: &AirportInfo,
        destination: &AirportInfo,
        out: DateTime<Utc>,
        arrival: DateTime<Utc>,
    ) -> NightEstimate {
        let total_seconds = (arrival - out).num_seconds().max(1);
        let delta_lon = shortest_longitude_delta(origin.longitude, destination.longitude);

        let mut instants = Vec::new();
        let mut at = out;
        while at < arrival {
            instants.push(at);
            at += self.sample_interval;
        }
        instants.push(arrival);

        let mut dark = 0usize;
        let mut valid = 0usize;
        for &at in &instants {
            #[allow(clippy::cast_precision_loss)]
            let progress = (at - out).num_seconds() as f64 / total_seconds as f64;
            let latitude = origin.latitude + progress * (destination.latitude - origin.latitude);
            let longitude = normalize_longitude(origin.longitude + progress * delta_lon);

            let zone = solar_zone(longitude);
            let date: NaiveDate = at.with_timezone(&zone).date_naive();
            let window = self.sun.window(latitude, longitude, date, &zone);

            match window.is_dark_at(at) {
                Some(is_dark) => {
                    valid += 1;
                    if is_dark {
                        dark += 1;
                    }
                }
                None => {
                    trace!(latitude, longitude, %date, status = %window.status, "sample excluded");
                }
            }
        }

        let total = instants.len();
        let mut issues = Vec::new();
        if valid < total {
            issues.push(Issue::SamplesExcluded {
                excluded: total - valid,
                total,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let fraction = if valid == 0 {
            0.0
        } else {
            dark as f64 / valid as f64
        };

        NightEstimate {
            method: Some(NightMethod::Sampling),
            fraction,
            issues,
        }
    }
}

/// Classify `[out, arrival]` against night intervals: 1 when inside one,
/// 0 when touching none, 0.5 otherwise.
fn boundary_fraction(
    nights: &[(DateTime<Utc>, DateTime<Utc>)],
    out: DateTime<Utc>,
    arrival: DateTime<Utc>,
) -> f64 {
    if nights
        .iter()
        .any(|&(dusk, dawn)| out >= dusk && arrival <= dawn)
    {
        return 1.0;
    }
    if nights
        .iter()
        .any(|&(dusk, dawn)| out < dawn && arrival > dusk)
    {
        return 0.5;
    }
    0.0
}

/// Signed longitude change along the shorter arc, in `(-180, 180]`.
fn shortest_longitude_delta(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Wrap a longitude into `[-180, 180]`.
fn normalize_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        return longitude;
    }
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

/// Whole-hour offset nearest to the local solar time at `longitude`.
fn solar_zone(longitude: f64) -> FixedOffset {
    #[allow(clippy::cast_possible_truncation)]
    let hours = (longitude / 15.0).round() as i32;
    FixedOffset::east_opt(hours.clamp(-12, 12) * 3600).unwrap_or_else(|| Utc.fix())
}
