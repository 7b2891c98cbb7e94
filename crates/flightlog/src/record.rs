//! Flight record data model.
//!
//! [`FlightRecord`] is one raw row of the airline activity export, kept as
//! strings so that every cell problem surfaces as a row diagnostic.
//! [`OutputRecord`] is one derived logbook entry at full precision; rounding
//! happens only when a row is written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::crew::CrewRole;
use crate::landing::LandingClass;
use crate::night::NightMethod;

/// Default template for purely numeric tail numbers.
pub const DEFAULT_TAIL_TEMPLATE: &str = "N{}FE";

/// One raw input row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Departure date.
    #[serde(rename = "DEPT_DATE", default)]
    pub dept_date: Option<String>,
    /// Origin airport code.
    #[serde(rename = "ORG", default)]
    pub origin: Option<String>,
    /// Destination airport code.
    #[serde(rename = "DEST", default)]
    pub destination: Option<String>,
    /// Equipment (aircraft type).
    #[serde(rename = "EQUIP", default)]
    pub equipment: Option<String>,
    /// Tail number.
    #[serde(rename = "TAIL", default)]
    pub tail: Option<String>,
    /// Gate out clock time.
    #[serde(rename = "OUT", default)]
    pub out: Option<String>,
    /// Wheels off clock time.
    #[serde(rename = "OFF", default)]
    pub off: Option<String>,
    /// Wheels on clock time.
    #[serde(rename = "ON", default)]
    pub on: Option<String>,
    /// Gate in clock time.
    #[serde(rename = "IN", default)]
    pub gate_in: Option<String>,
    /// Scheduled flight hours.
    #[serde(rename = "FLT_HRS", default)]
    pub flight_hours: Option<String>,
    /// Block hours.
    #[serde(rename = "BLK_HRS", default)]
    pub block_hours: Option<String>,
    /// Flight number.
    #[serde(rename = "FLIGHT", default)]
    pub flight: Option<String>,
    /// `1` when this crew member flew the landing.
    #[serde(rename = "LANDING", default)]
    pub landing: Option<String>,
}

fn cell(value: Option<&String>) -> &str {
    value.map_or("", |s| s.trim())
}

impl FlightRecord {
    /// Trimmed departure date, empty when absent.
    #[must_use]
    pub fn date_str(&self) -> &str {
        cell(self.dept_date.as_ref())
    }

    /// Trimmed origin code.
    #[must_use]
    pub fn origin_str(&self) -> &str {
        cell(self.origin.as_ref())
    }

    /// Trimmed destination code.
    #[must_use]
    pub fn destination_str(&self) -> &str {
        cell(self.destination.as_ref())
    }

    /// Trimmed flight number.
    #[must_use]
    pub fn flight_str(&self) -> &str {
        cell(self.flight.as_ref())
    }

    /// The four block clock values in chain order, with their column names.
    #[must_use]
    pub fn clocks(&self) -> [(&'static str, &str); 4] {
        [
            ("OUT", cell(self.out.as_ref())),
            ("OFF", cell(self.off.as_ref())),
            ("ON", cell(self.on.as_ref())),
            ("IN", cell(self.gate_in.as_ref())),
        ]
    }

    /// Scheduled flight hours, 0 when blank or unreadable.
    #[must_use]
    pub fn flight_hours(&self) -> f64 {
        parse_hours(self.flight_hours.as_deref())
    }

    /// Block hours, 0 when blank or unreadable.
    #[must_use]
    pub fn block_hours(&self) -> f64 {
        parse_hours(self.block_hours.as_deref())
    }

    /// Whether this crew member flew the landing.
    #[must_use]
    pub fn landing_performed(&self) -> bool {
        matches!(cell(self.landing.as_ref()), "1" | "1.0")
    }

    /// `ORG-DEST` as written.
    #[must_use]
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin_str(), self.destination_str())
    }
}

/// Read an hours cell. Blank, `.` and unreadable values are 0.
#[must_use]
pub fn parse_hours(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ".")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Render a tail number, expanding purely numeric tails through `template`.
#[must_use]
pub fn format_tail(tail: &str, template: &str) -> String {
    let tail = tail.trim();
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
        template.replacen("{}", tail, 1)
    } else {
        tail.to_string()
    }
}

/// One derived logbook entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Departure date.
    pub date: NaiveDate,
    /// Aircraft type.
    pub aircraft_type: String,
    /// Aircraft identification (formatted tail).
    pub aircraft_ident: String,
    /// Flight number.
    pub flight: String,
    /// Origin code.
    pub origin: String,
    /// Destination code.
    pub destination: String,
    /// Gate out.
    pub out: DateTime<Utc>,
    /// Wheels off.
    pub off: DateTime<Utc>,
    /// Wheels on.
    pub on: DateTime<Utc>,
    /// Gate in.
    pub gate_in: DateTime<Utc>,
    /// Scheduled flight hours.
    pub duration: f64,
    /// Total (block) time.
    pub total_time: f64,
    /// Pilot-in-command time.
    pub pic: f64,
    /// Second-in-command time.
    pub sic: f64,
    /// Cross-country time.
    pub cross_country: f64,
    /// Night time.
    pub night: f64,
    /// Actual instrument time.
    pub actual_instrument: f64,
    /// Multi-pilot time.
    pub multi_pilot: f64,
    /// Crew role credited.
    pub role: CrewRole,
    /// Name logged as pilot in command.
    pub pic_name: String,
    /// Name logged as second in command.
    pub sic_name: String,
    /// Takeoff classification.
    pub takeoff: LandingClass,
    /// Landing classification.
    pub landing: LandingClass,
    /// Instrument approaches credited.
    pub approaches: u32,
    /// Night method used, if any.
    pub night_method: Option<NightMethod>,
}

impl OutputRecord {
    /// `ORG-DEST`.
    #[must_use]
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    /// Day landings (0 or 1).
    #[must_use]
    pub fn day_landings(&self) -> u32 {
        self.landing.counts().0
    }

    /// Night landings (0 or 1).
    #[must_use]
    pub fn night_landings(&self) -> u32 {
        self.landing.counts().1
    }

    /// Day takeoffs (0 or 1).
    #[must_use]
    pub fn day_takeoffs(&self) -> u32 {
        self.takeoff.counts().0
    }

    /// Night takeoffs (0 or 1).
    #[must_use]
    pub fn night_takeoffs(&self) -> u32 {
        self.takeoff.counts().1
    }
}
