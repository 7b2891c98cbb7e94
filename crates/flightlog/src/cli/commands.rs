//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::crew::CrewPosition;
use crate::io::OutputFormat;

/// Convert command arguments.
#[derive(Debug, Args)]
pub struct ConvertCommand {
    /// Flight activity CSV to convert
    #[arg(value_name = "FLIGHTS")]
    pub input: PathBuf,

    /// Output file (defaults to <FORMAT>_<input>_<date>.csv next to the input)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Crew position to credit
    #[arg(short, long, value_enum)]
    pub position: Option<PositionArg>,

    /// OE data CSV, required for --position auto
    #[arg(long, value_name = "FILE")]
    pub oe_data: Option<PathBuf>,

    /// Name written to the PIC/SIC name columns
    #[arg(long, value_name = "NAME")]
    pub pilot_name: Option<String>,

    /// Airport database CSV
    #[arg(long, value_name = "FILE")]
    pub airports: Option<PathBuf>,

    /// Output layout
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Also write diagnostics as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub diagnostics: Option<PathBuf>,

    /// Transform rows on a single thread
    #[arg(long)]
    pub sequential: bool,
}

/// Airport lookup arguments.
#[derive(Debug, Args)]
pub struct AirportCommand {
    /// IATA or ICAO codes to resolve
    #[arg(required = true, value_name = "CODE")]
    pub codes: Vec<String>,

    /// Airport database CSV
    #[arg(long, value_name = "FILE")]
    pub airports: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Sun window arguments.
#[derive(Debug, Args)]
pub struct SunCommand {
    /// Airport code
    pub code: String,

    /// Local date (MM/DD/YYYY or YYYY-MM-DD)
    pub date: String,

    /// Airport database CSV
    #[arg(long, value_name = "FILE")]
    pub airports: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Crew position argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    /// Captain: all time is PIC
    Captain,
    /// First officer: all time is SIC
    FirstOfficer,
    /// Relief captain: half the time is PIC
    ReliefCaptain,
    /// Relief first officer: half the time is SIC
    ReliefFirstOfficer,
    /// Per flight, from OE data
    Auto,
}

impl From<PositionArg> for CrewPosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Captain => Self::Captain,
            PositionArg::FirstOfficer => Self::FirstOfficer,
            PositionArg::ReliefCaptain => Self::ReliefCaptain,
            PositionArg::ReliefFirstOfficer => Self::ReliefFirstOfficer,
            PositionArg::Auto => Self::Auto,
        }
    }
}

/// Output layout argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// FAA logbook columns
    Faa,
    /// logbook.aero import columns
    #[value(name = "logbook_aero", alias = "logbook-aero")]
    LogbookAero,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Faa => Self::Faa,
            FormatArg::LogbookAero => Self::LogbookAero,
        }
    }
}
