//! Time normalization.
//!
//! Turns the raw date and clock strings of a flight row into UTC instants.
//! Clock values are read in the configured record timezone. A clock value that
//! cannot be read (a lone `.`, an empty cell, `25:99`) is replaced by local noon
//! on the row's date and the stamp is marked as defaulted; an unreadable date
//! makes the whole row unusable and yields `None`.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

/// Date layouts accepted for `DEPT_DATE`, tried in order.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%d/%m/%Y"];

fn clock_regex() -> &'static Regex {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    CLOCK.get_or_init(|| {
        Regex::new(r"^(?:(\d{1,2}):(\d{2})(?::(\d{2}))?|(\d{2})(\d{2}))$")
            .expect("clock pattern is valid")
    })
}

/// Parse a calendar date in any of the accepted layouts.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse a clock time (`H:MM`, `HH:MM`, `HH:MM:SS` or `HHMM`).
#[must_use]
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let caps = clock_regex().captures(value.trim())?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let (hour, minute, second) = match (field(1), field(2)) {
        (Some(h), Some(m)) => (h, m, field(3).unwrap_or(0)),
        _ => (field(4)?, field(5)?, 0),
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// One normalized clock stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    /// The instant in UTC.
    pub instant: DateTime<Utc>,
    /// True when the clock value was unreadable and noon was substituted.
    pub defaulted: bool,
}

/// The four block stamps of a flight, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTimes {
    /// Gate out.
    pub gate_out: Stamp,
    /// Wheels off.
    pub wheels_off: Stamp,
    /// Wheels on (touchdown).
    pub wheels_on: Stamp,
    /// Gate in.
    pub gate_in: Stamp,
}

impl BlockTimes {
    /// Elapsed time from gate out to gate in, in hours. May be zero or negative.
    #[must_use]
    pub fn duration_hours(&self) -> f64 {
        hours_between(self.gate_out.instant, self.gate_in.instant)
    }

    /// Names of the stamps whose clock value was defaulted.
    pub fn defaulted_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            ("OUT", self.gate_out),
            ("OFF", self.wheels_off),
            ("ON", self.wheels_on),
            ("IN", self.gate_in),
        ]
        .into_iter()
        .filter(|(_, stamp)| stamp.defaulted)
        .map(|(name, _)| name)
    }

    /// Touchdown instant: wheels on when it was read, gate in otherwise.
    #[must_use]
    pub fn touchdown(&self) -> DateTime<Utc> {
        if self.wheels_on.defaulted {
            self.gate_in.instant
        } else {
            self.wheels_on.instant
        }
    }

    /// Lift-off instant: wheels off when it was read, gate out otherwise.
    #[must_use]
    pub fn liftoff(&self) -> DateTime<Utc> {
        if self.wheels_off.defaulted {
            self.gate_out.instant
        } else {
            self.wheels_off.instant
        }
    }
}

/// Signed hours from `start` to `end`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

/// Parses row dates and clock values in a fixed record timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    zone: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimeNormalizer {
    /// Create a normalizer reading clock values in `zone`.
    #[must_use]
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// The record timezone.
    #[must_use]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Parse one date and clock pair.
    ///
    /// Returns `None` only when the date is unreadable.
    #[must_use]
    pub fn parse(&self, date: &str, time: &str) -> Option<Stamp> {
        let date = parse_date(date)?;
        Some(self.stamp_on(date, time))
    }

    /// Build a stamp for a clock value on an already parsed date.
    #[must_use]
    pub fn stamp_on(&self, date: NaiveDate, time: &str) -> Stamp {
        let (clock, defaulted) = match parse_clock(time) {
            Some(clock) => (clock, false),
            None => (noon(), true),
        };
        Stamp {
            instant: self.to_utc(date.and_time(clock)),
            defaulted,
        }
    }

    /// Parse the four block stamps of a row sharing one departure date.
    ///
    /// A read stamp earlier than the previous read stamp in the
    /// out, off, on, in chain is moved to the following day. Defaulted stamps
    /// take no part in the chain.
    #[must_use]
    pub fn block_times(&self, date: NaiveDate, clocks: [&str; 4]) -> BlockTimes {
        let mut stamps = clocks.map(|clock| self.stamp_on(date, clock));

        let mut previous: Option<DateTime<Utc>> = None;
        for stamp in &mut stamps {
            if stamp.defaulted {
                continue;
            }
            if let Some(prev) = previous {
                while stamp.instant < prev {
                    stamp.instant += Duration::days(1);
                }
            }
            previous = Some(stamp.instant);
        }

        let [gate_out, wheels_off, wheels_on, gate_in] = stamps;
        BlockTimes {
            gate_out,
            wheels_off,
            wheels_on,
            gate_in,
        }
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        // Times inside a DST gap are read one hour later.
        self.zone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.zone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map_or_else(|| Utc.from_utc_datetime(&local), |dt| dt.with_timezone(&Utc))
    }
}

fn noon() -> NaiveTime {
    NaiveTime::MIN + Duration::hours(12)
}
