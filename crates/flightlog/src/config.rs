//! Configuration management for flightlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::airport::{parse_timezone, AirportDatabase, AirportResolver, FallbackAirport};
use crate::crew::CrewPosition;
use crate::error::{Error, Result};
use crate::io::OutputFormat;
use crate::night::{DEFAULT_METHOD_THRESHOLD_HOURS, DEFAULT_SAMPLE_INTERVAL_MINUTES};
use crate::record::DEFAULT_TAIL_TEMPLATE;
use crate::sun::DEFAULT_TWILIGHT_MINUTES;
use crate::transform::{TransformSettings, DEFAULT_PILOT_NAME};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightlog";

/// Default airport database file name.
const AIRPORTS_FILE_NAME: &str = "airports.csv";

/// Longest accepted twilight offset.
const MAX_TWILIGHT_MINUTES: u32 = 180;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLOG_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Airport reference data.
    pub airports: AirportsConfig,
    /// Derivation settings.
    pub processing: ProcessingConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// Airport reference data configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportsConfig {
    /// Path to the airport CSV.
    /// Defaults to `~/.local/share/flightlog/airports.csv`
    pub database: Option<PathBuf>,
    /// Extra fallback entries, replacing built-in entries with the same code.
    pub fallback: Vec<FallbackAirport>,
}

/// Derivation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Default crew position.
    pub position: CrewPosition,
    /// Name written to the PIC or SIC name column.
    pub pilot_name: String,
    /// IANA timezone the input clock times are written in.
    pub record_timezone: String,
    /// Route sample spacing in minutes.
    pub sample_interval_minutes: u32,
    /// Offset difference in hours up to which the boundary method is used.
    pub method_threshold_hours: f64,
    /// Minutes from sunset to the end of civil twilight.
    pub twilight_minutes: u32,
    /// Transform rows on the rayon thread pool.
    pub parallel: bool,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output layout.
    pub format: OutputFormat,
    /// Template for purely numeric tail numbers; `{}` is the tail.
    pub numeric_tail_template: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            position: CrewPosition::Captain,
            pilot_name: DEFAULT_PILOT_NAME.to_string(),
            record_timezone: "UTC".to_string(),
            sample_interval_minutes: DEFAULT_SAMPLE_INTERVAL_MINUTES,
            method_threshold_hours: DEFAULT_METHOD_THRESHOLD_HOURS,
            twilight_minutes: DEFAULT_TWILIGHT_MINUTES,
            parallel: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Faa,
            numeric_tail_template: DEFAULT_TAIL_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLIGHTLOG_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTLOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration file at `path`.
    ///
    /// Unlike [`Config::load_from`], a missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be parsed, or holds
    /// invalid values.
    pub fn validate_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::InputNotFound { path });
        }
        Self::load_from(Some(path))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let processing = &self.processing;

        if processing.sample_interval_minutes == 0 {
            return Err(Error::config_validation(
                "sample_interval_minutes must be greater than 0",
            ));
        }

        if !processing.method_threshold_hours.is_finite()
            || processing.method_threshold_hours < 0.0
        {
            return Err(Error::config_validation(format!(
                "method_threshold_hours must be a non-negative number, got {}",
                processing.method_threshold_hours
            )));
        }

        if processing.twilight_minutes > MAX_TWILIGHT_MINUTES {
            return Err(Error::config_validation(format!(
                "twilight_minutes ({}) cannot exceed {MAX_TWILIGHT_MINUTES}",
                processing.twilight_minutes
            )));
        }

        if parse_timezone(&processing.record_timezone).is_err() {
            return Err(Error::config_validation(format!(
                "record_timezone '{}' is not a known IANA timezone",
                processing.record_timezone
            )));
        }

        if !self.output.numeric_tail_template.contains("{}") {
            return Err(Error::config_validation(format!(
                "numeric_tail_template '{}' must contain {{}}",
                self.output.numeric_tail_template
            )));
        }

        for airport in &self.airports.fallback {
            if let Err(e) = airport.to_info() {
                return Err(Error::config_validation(format!(
                    "invalid fallback airport {}: {e}",
                    airport.code
                )));
            }
        }

        Ok(())
    }

    /// Get the airport database path, resolving defaults if not set.
    #[must_use]
    pub fn airport_database_path(&self) -> PathBuf {
        self.airports
            .database
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(AIRPORTS_FILE_NAME))
    }

    /// Get the record timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is unknown.
    pub fn record_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.processing.record_timezone)
    }

    /// Build the per-batch transform settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the record timezone is unknown.
    pub fn transform_settings(&self) -> Result<TransformSettings> {
        Ok(TransformSettings {
            position: self.processing.position,
            pilot_name: self.processing.pilot_name.clone(),
            record_timezone: self.record_timezone()?,
            sample_interval_minutes: self.processing.sample_interval_minutes,
            method_threshold_hours: self.processing.method_threshold_hours,
            twilight_minutes: self.processing.twilight_minutes,
            tail_template: self.output.numeric_tail_template.clone(),
        })
    }

    /// Load the airport database and build a resolver over it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingReferenceData`] if the database file does not
    /// exist, or a load error if it cannot be read.
    pub fn airport_resolver(&self) -> Result<AirportResolver> {
        let path = self.airport_database_path();
        if !path.exists() {
            return Err(Error::missing_reference_data(format!(
                "airport database not found at {} (set [airports] database or pass --airports)",
                path.display()
            )));
        }
        let database = AirportDatabase::from_path(&path)?;
        AirportResolver::with_extra_fallback(database, &self.airports.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.airports.database.is_none());
        assert!(config.airports.fallback.is_empty());
        assert_eq!(config.processing.position, CrewPosition::Captain);
        assert!(config.processing.parallel);
        assert_eq!(config.output.format, OutputFormat::Faa);
    }

    #[test]
    fn test_default_processing_config() {
        let processing = ProcessingConfig::default();

        assert_eq!(processing.pilot_name, "SELF");
        assert_eq!(processing.record_timezone, "UTC");
        assert_eq!(processing.sample_interval_minutes, 10);
        assert!((processing.method_threshold_hours - 4.0).abs() < f64::EPSILON);
        assert_eq!(processing.twilight_minutes, 30);
    }

    #[test]
    fn test_default_output_config() {
        let output = OutputConfig::default();

        assert_eq!(output.format, OutputFormat::Faa);
        assert_eq!(output.numeric_tail_template, "N{}FE");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_sample_interval() {
        let mut config = Config::default();
        config.processing.sample_interval_minutes = 0;

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("sample_interval_minutes"));
    }

    #[test]
    fn test_validate_negative_threshold() {
        let mut config = Config::default();
        config.processing.method_threshold_hours = -1.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("method_threshold_hours"));
    }

    #[test]
    fn test_validate_twilight_range() {
        let mut config = Config::default();
        config.processing.twilight_minutes = 180;
        assert!(config.validate().is_ok());

        config.processing.twilight_minutes = 181;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("twilight_minutes"));
    }

    #[test]
    fn test_validate_unknown_record_timezone() {
        let mut config = Config::default();
        config.processing.record_timezone = "Mars/Olympus".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("record_timezone"));
    }

    #[test]
    fn test_validate_tail_template() {
        let mut config = Config::default();
        config.output.numeric_tail_template = "N-FE".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("numeric_tail_template"));
    }

    #[test]
    fn test_validate_invalid_fallback() {
        let mut config = Config::default();
        config.airports.fallback = vec![FallbackAirport {
            code: "XXX".to_string(),
            name: String::new(),
            timezone: "Asia/Bangkok".to_string(),
            latitude: 95.0,
            longitude: 100.0,
        }];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("XXX"));
    }

    #[test]
    fn test_transform_settings() {
        let mut config = Config::default();
        config.processing.record_timezone = "America/Chicago".to_string();
        config.processing.position = CrewPosition::ReliefCaptain;

        let settings = config.transform_settings().unwrap();
        assert_eq!(settings.record_timezone, chrono_tz::America::Chicago);
        assert_eq!(settings.position, CrewPosition::ReliefCaptain);
        assert_eq!(settings.tail_template, "N{}FE");
    }

    #[test]
    fn test_airport_database_path_default() {
        let config = Config::default();
        let path = config.airport_database_path();
        assert!(path.ends_with("flightlog/airports.csv"));

        let mut config = Config::default();
        config.airports.database = Some(PathBuf::from("/tmp/airports.csv"));
        assert_eq!(config.airport_database_path(), PathBuf::from("/tmp/airports.csv"));
    }

    #[test]
    fn test_airport_resolver_missing_database() {
        let mut config = Config::default();
        config.airports.database = Some(PathBuf::from("/nonexistent/airports.csv"));

        let err = config.airport_resolver().unwrap_err();
        assert!(err.is_missing_reference_data());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.ends_with("flightlog/config.toml"));
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "flightlog.toml",
                r#"
                [processing]
                position = "first_officer"
                pilot_name = "J. DOE"
                sample_interval_minutes = 5

                [output]
                format = "logbook_aero"

                [[airports.fallback]]
                code = "XYZ"
                tz = "Asia/Tokyo"
                lat = 35.0
                lon = 139.0
                "#,
            )?;
            jail.set_env("FLIGHTLOG_PROCESSING__TWILIGHT_MINUTES", "20");

            let config = Config::load_from(Some(PathBuf::from("flightlog.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.processing.position, CrewPosition::FirstOfficer);
            assert_eq!(config.processing.pilot_name, "J. DOE");
            assert_eq!(config.processing.sample_interval_minutes, 5);
            assert_eq!(config.processing.twilight_minutes, 20);
            assert_eq!(config.output.format, OutputFormat::LogbookAero);
            assert_eq!(config.airports.fallback.len(), 1);
            assert_eq!(config.airports.fallback[0].timezone, "Asia/Tokyo");
            Ok(())
        });
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "flightlog.toml",
                "[processing]\nsample_interval_minutes = 0\n",
            )?;
            let result = Config::load_from(Some(PathBuf::from("flightlog.toml")));
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_load_from_reads_top_level_tables_as_sections() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "flightlog.toml",
                "[processing]\nrecord_timezone = \"America/Chicago\"\nparallel = false\n",
            )?;
            let config = Config::load_from(Some(PathBuf::from("flightlog.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.processing.record_timezone, "America/Chicago");
            assert!(!config.processing.parallel);
            assert_eq!(config.processing.position, CrewPosition::Captain);
            Ok(())
        });
    }

    #[test]
    fn test_validate_file_accepts_valid_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("flightlog.toml", "[output]\nformat = \"faa\"\n")?;
            let config =
                Config::validate_file("flightlog.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.output.format, OutputFormat::Faa);
            Ok(())
        });
    }

    #[test]
    fn test_validate_file_rejects_invalid_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("flightlog.toml", "[processing]\ntwilight_minutes = 500\n")?;
            let result = Config::validate_file("flightlog.toml");
            assert!(matches!(result, Err(Error::ConfigValidation { .. })));

            jail.create_file("broken.toml", "[processing\nposition = \"captain\"\n")?;
            assert!(matches!(
                Config::validate_file("broken.toml"),
                Err(Error::ConfigLoad(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn test_validate_file_missing_file() {
        let result = Config::validate_file("/nonexistent/flightlog/config.toml");
        assert!(matches!(result, Err(Error::InputNotFound { .. })));
    }
}
