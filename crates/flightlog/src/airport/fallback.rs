//! Built-in fallback airports.
//!
//! Hand-curated entries for codes that public airport databases have dropped or
//! carry without usable timezone data.

use serde::{Deserialize, Serialize};

use super::{parse_timezone, AirportInfo, AirportSource};
use crate::error::Result;

/// A fallback entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackAirport {
    /// Airport code.
    pub code: String,
    /// Airport or city name.
    #[serde(default)]
    pub name: String,
    /// IANA timezone identifier.
    #[serde(alias = "tz")]
    pub timezone: String,
    /// Latitude in degrees.
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(alias = "lon")]
    pub longitude: f64,
}

impl FallbackAirport {
    /// Convert into a resolved fallback entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the timezone is unknown or coordinates are out of range.
    pub fn to_info(&self) -> Result<AirportInfo> {
        let tz = parse_timezone(&self.timezone)?;
        AirportInfo::new(
            &self.code,
            self.name.clone(),
            self.latitude,
            self.longitude,
            tz,
            AirportSource::Fallback,
        )
    }
}

// (code, name, timezone, latitude, longitude)
const BUILTIN: &[(&str, &str, chrono_tz::Tz, f64, f64)] = &[
    ("CAN", "Guangzhou", chrono_tz::Asia::Shanghai, 23.3924, 113.2988),
    ("BKK", "Bangkok", chrono_tz::Asia::Bangkok, 13.6900, 100.7501),
    ("PEN", "Penang", chrono_tz::Asia::Kuala_Lumpur, 5.2976, 100.2760),
    ("TPE", "Taipei", chrono_tz::Asia::Taipei, 25.0777, 121.2330),
    ("KIX", "Osaka", chrono_tz::Asia::Tokyo, 34.4347, 135.2440),
];

/// The built-in fallback table.
#[must_use]
pub fn builtin_fallback() -> Vec<AirportInfo> {
    BUILTIN
        .iter()
        .map(|&(code, name, timezone, latitude, longitude)| AirportInfo {
            code: code.to_string(),
            name: name.to_string(),
            latitude,
            longitude,
            timezone,
            source: AirportSource::Fallback,
        })
        .collect()
}
