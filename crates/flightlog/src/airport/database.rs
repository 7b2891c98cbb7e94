//! Primary airport database loaded from CSV.
//!
//! The expected layout is the one published by the `airportsdata` project:
//! a header row with at least `iata`, `icao`, `name`, `lat`, `lon` and `tz`
//! columns. Each row is indexed under both its IATA and ICAO codes.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{normalize_code, AirportInfo, AirportSource};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct AirportRow {
    #[serde(default)]
    iata: Option<String>,
    #[serde(default)]
    icao: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    tz: Option<String>,
}

impl AirportRow {
    fn codes(&self) -> impl Iterator<Item = String> + '_ {
        [self.iata.as_deref(), self.icao.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize_code)
            .filter(|code| !code.is_empty())
    }

    fn into_info(self) -> Option<(Vec<String>, AirportInfo)> {
        let codes: Vec<String> = self.codes().collect();
        let primary = codes.first()?.clone();
        let tz = self.tz.as_deref().and_then(|tz| tz.trim().parse().ok())?;
        let info = AirportInfo::new(
            &primary,
            self.name.unwrap_or_default(),
            self.lat?,
            self.lon?,
            tz,
            AirportSource::Database,
        )
        .ok()?;
        Some((codes, info))
    }
}

/// Code-indexed airport table.
#[derive(Debug, Default, Clone)]
pub struct AirportDatabase {
    entries: HashMap<String, AirportInfo>,
}

impl AirportDatabase {
    /// Load the database from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid CSV.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        let reader = csv::Reader::from_path(path).map_err(|source| Error::AirportDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_csv(reader).map_err(|source| Error::AirportDatabase {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), airports = db.len(), "Loaded airport database");
        Ok(db)
    }

    /// Load the database from any CSV reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::from_csv(csv::Reader::from_reader(reader))?)
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> std::result::Result<Self, csv::Error> {
        let mut entries = HashMap::new();
        let mut skipped = 0usize;

        reader.headers()?;
        for row in reader.deserialize::<AirportRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed airport row");
                    skipped += 1;
                    continue;
                }
            };
            match row.into_info() {
                Some((codes, info)) => {
                    for code in codes {
                        let mut aliased = info.clone();
                        aliased.code.clone_from(&code);
                        entries.insert(code, aliased);
                    }
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "Skipped malformed airport rows or rows without code, coordinates or timezone");
        }
        Ok(Self { entries })
    }

    /// Build a database from already-resolved entries, keyed by their codes.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = AirportInfo>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|mut info| {
                    info.code = normalize_code(&info.code);
                    info.source = AirportSource::Database;
                    (info.code.clone(), info)
                })
                .collect(),
        }
    }

    /// Look up a normalized code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&AirportInfo> {
        self.entries.get(code)
    }

    /// Number of indexed codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the database holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
