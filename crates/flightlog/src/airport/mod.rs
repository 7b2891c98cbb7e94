//! Airport resolution.
//!
//! Maps an airport code to coordinates and an IANA timezone. Lookups go to the
//! primary [`AirportDatabase`] first, then to the fallback table of hand-curated
//! entries for codes the database lacks. A code found in neither resolves to an
//! [`AirportSource::Unknown`] entry on UTC instead of failing, so downstream
//! estimators can fall back to their daytime defaults.
//!
//! # Example
//!
//! ```
//! use flightlog::airport::{AirportDatabase, AirportResolver, AirportSource};
//!
//! let resolver = AirportResolver::with_builtin_fallback(AirportDatabase::default());
//!
//! let bkk = resolver.resolve("bkk");
//! assert_eq!(bkk.source, AirportSource::Fallback);
//! assert_eq!(bkk.timezone, chrono_tz::Asia::Bangkok);
//!
//! let unknown = resolver.resolve("ZZZ");
//! assert!(unknown.is_unknown());
//! ```

mod database;
mod fallback;

use std::collections::HashMap;

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use database::AirportDatabase;
pub use fallback::{builtin_fallback, FallbackAirport};

/// Where a resolved [`AirportInfo`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportSource {
    /// The primary airport database.
    Database,
    /// The fallback table of known problem codes.
    Fallback,
    /// Neither table knows the code.
    Unknown,
}

impl std::fmt::Display for AirportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Fallback => write!(f, "fallback"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Resolved reference data for one airport code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportInfo {
    /// The code as looked up (trimmed, uppercase).
    pub code: String,
    /// Human-readable airport name.
    pub name: String,
    /// Latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// IANA timezone of the airport.
    pub timezone: Tz,
    /// Which table produced this entry.
    pub source: AirportSource,
}

impl AirportInfo {
    /// Build an entry, validating coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if latitude or longitude is out of range or not finite.
    pub fn new(
        code: &str,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
        source: AirportSource,
    ) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::internal(format!(
                "latitude {latitude} out of range for {code}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::internal(format!(
                "longitude {longitude} out of range for {code}"
            )));
        }
        Ok(Self {
            code: normalize_code(code),
            name: name.into(),
            latitude,
            longitude,
            timezone,
            source,
        })
    }

    /// The placeholder returned for codes that neither table knows.
    #[must_use]
    pub fn unknown(code: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            timezone: Tz::UTC,
            source: AirportSource::Unknown,
        }
    }

    /// True when the entry carries no real coordinates.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.source == AirportSource::Unknown
    }

    /// True when the entry came from the fallback table.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == AirportSource::Fallback
    }

    /// UTC offset of the airport's timezone at `at`, in hours.
    #[must_use]
    pub fn utc_offset_hours(&self, at: DateTime<Utc>) -> f64 {
        let seconds = self
            .timezone
            .offset_from_utc_datetime(&at.naive_utc())
            .fix()
            .local_minus_utc();
        f64::from(seconds) / 3600.0
    }
}

/// Trim and uppercase an airport code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Parse an IANA timezone identifier.
///
/// # Errors
///
/// Returns [`Error::UnknownTimezone`] if the identifier is not in the tz database.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Error::UnknownTimezone(name.to_string()))
}

/// Immutable code-to-airport resolver shared by reference across a batch.
#[derive(Debug, Default)]
pub struct AirportResolver {
    database: AirportDatabase,
    fallback: HashMap<String, AirportInfo>,
}

impl AirportResolver {
    /// Create a resolver over a database and explicit fallback entries.
    #[must_use]
    pub fn new(database: AirportDatabase, fallback: Vec<AirportInfo>) -> Self {
        let fallback = fallback
            .into_iter()
            .map(|mut info| {
                info.source = AirportSource::Fallback;
                (info.code.clone(), info)
            })
            .collect();
        Self { database, fallback }
    }

    /// Create a resolver using only the built-in fallback table.
    #[must_use]
    pub fn with_builtin_fallback(database: AirportDatabase) -> Self {
        Self::new(database, builtin_fallback())
    }

    /// Create a resolver with the built-in fallback table extended by `extra`.
    ///
    /// Entries in `extra` replace built-in entries with the same code.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra entry has an unknown timezone or invalid coordinates.
    pub fn with_extra_fallback(
        database: AirportDatabase,
        extra: &[FallbackAirport],
    ) -> Result<Self> {
        let mut entries = builtin_fallback();
        for airport in extra {
            let info = airport.to_info()?;
            entries.retain(|existing| existing.code != info.code);
            entries.push(info);
        }
        Ok(Self::new(database, entries))
    }

    /// Resolve a code. Never fails; absence is reported through [`AirportInfo::source`].
    #[must_use]
    pub fn resolve(&self, code: &str) -> AirportInfo {
        let key = normalize_code(code);
        if let Some(info) = self.database.get(&key) {
            return info.clone();
        }
        if let Some(info) = self.fallback.get(&key) {
            return info.clone();
        }
        tracing::debug!(code = %key, "airport not found in database or fallback table");
        AirportInfo::unknown(&key)
    }

    /// Number of codes in the primary database.
    #[must_use]
    pub fn database_len(&self) -> usize {
        self.database.len()
    }

    /// Number of codes in the fallback table.
    #[must_use]
    pub fn fallback_len(&self) -> usize {
        self.fallback.len()
    }
}
