//! Sun event calculation.
//!
//! Sunrise and sunset come from the NREL solar position algorithm via
//! `solar-positioning`, evaluated for the local calendar date at a coordinate.
//! Twilight end is sunset plus a fixed offset, not a recomputed depression
//! angle. Polar day, polar night and numerical failures never raise; they
//! produce a [`SunWindow`] whose [`SunStatus`] is not `Regular`.

use chrono::{Datelike, DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use solar_positioning::time::DeltaT;
use solar_positioning::{spa, Horizon, SunriseResult};
use tracing::trace;

/// Default gap between sunset and the end of civil twilight, in minutes.
pub const DEFAULT_TWILIGHT_MINUTES: u32 = 30;

/// Outcome of a sun event computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunStatus {
    /// The sun rises and sets on this date.
    Regular,
    /// The sun stays above the horizon all day.
    PolarDay,
    /// The sun stays below the horizon all day.
    PolarNight,
    /// The computation failed (bad coordinate or date).
    Failed,
}

impl std::fmt::Display for SunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::PolarDay => write!(f, "polar day"),
            Self::PolarNight => write!(f, "polar night"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Sun events for one valid window, in the location's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunEvents {
    /// Sunrise.
    pub sunrise: DateTime<FixedOffset>,
    /// Sunset.
    pub sunset: DateTime<FixedOffset>,
    /// End of civil twilight (sunset plus the twilight offset).
    pub twilight_end: DateTime<FixedOffset>,
}

/// Sun events for one coordinate and local date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunWindow {
    /// The local calendar date the window belongs to.
    pub date: NaiveDate,
    /// Computation outcome.
    pub status: SunStatus,
    /// Present only when `status` is [`SunStatus::Regular`].
    pub events: Option<SunEvents>,
}

impl SunWindow {
    fn invalid(date: NaiveDate, status: SunStatus) -> Self {
        Self {
            date,
            status,
            events: None,
        }
    }

    /// True when sunrise, sunset and twilight end are all known.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.events.is_some()
    }

    /// Sunrise as a UTC instant.
    #[must_use]
    pub fn sunrise_utc(&self) -> Option<DateTime<Utc>> {
        self.events.map(|e| e.sunrise.with_timezone(&Utc))
    }

    /// Sunset as a UTC instant.
    #[must_use]
    pub fn sunset_utc(&self) -> Option<DateTime<Utc>> {
        self.events.map(|e| e.sunset.with_timezone(&Utc))
    }

    /// Twilight end as a UTC instant.
    #[must_use]
    pub fn twilight_end_utc(&self) -> Option<DateTime<Utc>> {
        self.events.map(|e| e.twilight_end.with_timezone(&Utc))
    }

    /// Whether `at` is before sunrise or after sunset of this date.
    ///
    /// `None` when the window is invalid.
    #[must_use]
    pub fn is_dark_at(&self, at: DateTime<Utc>) -> Option<bool> {
        Some(at < self.sunrise_utc()? || at > self.sunset_utc()?)
    }

    /// Whether `at` is before sunrise or at/after twilight end of this date.
    ///
    /// `None` when the window is invalid.
    #[must_use]
    pub fn is_past_twilight_at(&self, at: DateTime<Utc>) -> Option<bool> {
        Some(at < self.sunrise_utc()? || at >= self.twilight_end_utc()?)
    }
}

/// Computes [`SunWindow`]s with a fixed twilight offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunCalculator {
    twilight: Duration,
}

impl Default for SunCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_TWILIGHT_MINUTES)
    }
}

impl SunCalculator {
    /// Create a calculator whose twilight ends `twilight_minutes` after sunset.
    #[must_use]
    pub fn new(twilight_minutes: u32) -> Self {
        Self {
            twilight: Duration::minutes(i64::from(twilight_minutes)),
        }
    }

    /// The twilight offset.
    #[must_use]
    pub fn twilight(&self) -> Duration {
        self.twilight
    }

    /// Compute the sun window at a coordinate for a local date in `zone`.
    #[must_use]
    pub fn window<Z: TimeZone>(
        &self,
        latitude: f64,
        longitude: f64,
        date: NaiveDate,
        zone: &Z,
    ) -> SunWindow {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            trace!(latitude, longitude, %date, "coordinate out of range");
            return SunWindow::invalid(date, SunStatus::Failed);
        }

        let Some(midnight) = local_midnight(date, zone) else {
            trace!(%date, "no local midnight for date");
            return SunWindow::invalid(date, SunStatus::Failed);
        };

        let Ok(delta_t) = DeltaT::estimate_from_date(date.year(), date.month()) else {
            return SunWindow::invalid(date, SunStatus::Failed);
        };

        let result = spa::sunrise_sunset_for_horizon(
            midnight,
            latitude,
            longitude,
            delta_t,
            Horizon::SunriseSunset,
        );

        let window = match result {
            Ok(SunriseResult::RegularDay {
                sunrise, sunset, ..
            }) => {
                let sunrise = sunrise.fixed_offset();
                let sunset = sunset.fixed_offset();
                SunWindow {
                    date,
                    status: SunStatus::Regular,
                    events: Some(SunEvents {
                        sunrise,
                        sunset,
                        twilight_end: sunset + self.twilight,
                    }),
                }
            }
            Ok(SunriseResult::AllDay { .. }) => SunWindow::invalid(date, SunStatus::PolarDay),
            Ok(SunriseResult::AllNight { .. }) => SunWindow::invalid(date, SunStatus::PolarNight),
            Err(_) => SunWindow::invalid(date, SunStatus::Failed),
        };

        trace!(latitude, longitude, %date, status = %window.status, "computed sun window");
        window
    }
}

fn local_midnight<Z: TimeZone>(date: NaiveDate, zone: &Z) -> Option<DateTime<Z>> {
    // A few zones skip midnight on their DST change day.
    [0, 1]
        .into_iter()
        .find_map(|hour| {
            let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
            zone.from_local_datetime(&date.and_time(time)).earliest()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_memphis_summer_solstice() {
        let calc = SunCalculator::default();
        let window = calc.window(35.0424, -89.9767, date(2024, 6, 21), &chrono_tz::America::Chicago);

        assert_eq!(window.status, SunStatus::Regular);
        let events = window.events.unwrap();
        let sunrise = events.sunrise.time();
        let sunset = events.sunset.time();
        assert!(sunrise.hour() == 5 && sunrise.minute() >= 30, "sunrise {sunrise}");
        assert!(sunset.hour() == 20 && sunset.minute() <= 30, "sunset {sunset}");
        assert_eq!(events.twilight_end - events.sunset, Duration::minutes(30));
    }

    #[test]
    fn test_custom_twilight_offset() {
        let calc = SunCalculator::new(45);
        let window = calc.window(35.0424, -89.9767, date(2024, 6, 21), &chrono_tz::America::Chicago);
        let events = window.events.unwrap();
        assert_eq!(events.twilight_end - events.sunset, Duration::minutes(45));
        assert_eq!(calc.twilight(), Duration::minutes(45));
    }

    #[test]
    fn test_polar_day_and_night() {
        let calc = SunCalculator::default();
        let oslo = chrono_tz::Europe::Oslo;

        let summer = calc.window(69.65, 18.96, date(2024, 6, 21), &oslo);
        assert_eq!(summer.status, SunStatus::PolarDay);
        assert!(!summer.is_valid());

        let winter = calc.window(69.65, 18.96, date(2024, 12, 21), &oslo);
        assert_eq!(winter.status, SunStatus::PolarNight);
        assert!(winter.is_dark_at(Utc::now()).is_none());
    }

    #[test]
    fn test_out_of_range_coordinate_fails() {
        let calc = SunCalculator::default();
        let window = calc.window(95.0, 0.0, date(2024, 1, 1), &Utc);
        assert_eq!(window.status, SunStatus::Failed);

        let window = calc.window(0.0, f64::NAN, date(2024, 1, 1), &Utc);
        assert_eq!(window.status, SunStatus::Failed);
    }

    #[test]
    fn test_fixed_offset_zone() {
        let calc = SunCalculator::default();
        let zone = FixedOffset::east_opt(0).unwrap();
        let window = calc.window(5.6052, -0.1668, date(2024, 3, 15), &zone);
        let sunset = window.sunset_utc().unwrap();
        // Accra sets around 18:05 UTC in March.
        assert_eq!(sunset.hour(), 18);
        assert!(window.sunrise_utc().unwrap().hour() == 6);
    }

    #[test]
    fn test_darkness_predicates() {
        let calc = SunCalculator::default();
        let window = calc.window(5.6052, -0.1668, date(2024, 3, 15), &chrono_tz::Africa::Accra);
        let sunset = window.sunset_utc().unwrap();

        let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap();
        assert_eq!(window.is_dark_at(at(12, 0)), Some(false));
        assert_eq!(window.is_dark_at(at(3, 0)), Some(true));
        assert_eq!(window.is_dark_at(at(23, 0)), Some(true));

        // Between sunset and twilight end: dark but not past twilight.
        let dusk = sunset + Duration::minutes(10);
        assert_eq!(window.is_dark_at(dusk), Some(true));
        assert_eq!(window.is_past_twilight_at(dusk), Some(false));
        assert_eq!(window.is_past_twilight_at(window.twilight_end_utc().unwrap()), Some(true));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SunStatus::PolarNight.to_string(), "polar night");
        assert_eq!(SunStatus::Regular.to_string(), "regular");
    }
}
