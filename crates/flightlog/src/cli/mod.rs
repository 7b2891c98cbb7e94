//! Command-line interface for flightlog.
//!
//! This module provides the CLI structure for the `fltlog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AirportCommand, ConfigCommand, ConvertCommand, FormatArg, PositionArg, SunCommand,
};

/// fltlog - Turn airline flight activity into logbook entries
///
/// Derives night time, day/night landings and PIC/SIC time for each flight
/// in an airline activity export and writes an FAA or logbook.aero CSV.
#[derive(Debug, Parser)]
#[command(name = "fltlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert a flight activity CSV into a logbook CSV
    Convert(ConvertCommand),

    /// Resolve airport codes
    Airport(AirportCommand),

    /// Show sunrise, sunset and twilight for an airport
    Sun(SunCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fltlog");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["fltlog", "-q", "config", "path"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["fltlog", "config", "path"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fltlog", "-v", "config", "path"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["fltlog", "-vv", "config", "path"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_convert_minimal() {
        let cli = parse(&["fltlog", "convert", "flights.csv"]);
        let Command::Convert(cmd) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(cmd.input, PathBuf::from("flights.csv"));
        assert!(cmd.output.is_none());
        assert!(cmd.position.is_none());
        assert!(cmd.format.is_none());
        assert!(!cmd.sequential);
    }

    #[test]
    fn test_parse_convert_full() {
        let cli = parse(&[
            "fltlog",
            "convert",
            "flights.csv",
            "-o",
            "out.csv",
            "-p",
            "auto",
            "--oe-data",
            "oe.csv",
            "--pilot-name",
            "J. DOE",
            "--airports",
            "airports.csv",
            "-f",
            "logbook_aero",
            "--diagnostics",
            "diag.json",
            "--sequential",
        ]);
        let Command::Convert(cmd) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(cmd.output, Some(PathBuf::from("out.csv")));
        assert_eq!(cmd.position, Some(PositionArg::Auto));
        assert_eq!(cmd.oe_data, Some(PathBuf::from("oe.csv")));
        assert_eq!(cmd.pilot_name.as_deref(), Some("J. DOE"));
        assert_eq!(cmd.airports, Some(PathBuf::from("airports.csv")));
        assert_eq!(cmd.format, Some(FormatArg::LogbookAero));
        assert_eq!(cmd.diagnostics, Some(PathBuf::from("diag.json")));
        assert!(cmd.sequential);
    }

    #[test]
    fn test_parse_convert_rejects_unknown_position() {
        let result = Cli::try_parse_from(["fltlog", "convert", "f.csv", "-p", "purser"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_airport_codes() {
        let cli = parse(&["fltlog", "airport", "MEM", "KANC", "--json"]);
        let Command::Airport(cmd) = cli.command else {
            panic!("expected airport");
        };
        assert_eq!(cmd.codes, vec!["MEM".to_string(), "KANC".to_string()]);
        assert!(cmd.json);
    }

    #[test]
    fn test_parse_airport_requires_code() {
        assert!(Cli::try_parse_from(["fltlog", "airport"]).is_err());
    }

    #[test]
    fn test_parse_sun() {
        let cli = parse(&["fltlog", "sun", "MEM", "06/21/2024"]);
        let Command::Sun(cmd) = cli.command else {
            panic!("expected sun");
        };
        assert_eq!(cmd.code, "MEM");
        assert_eq!(cmd.date, "06/21/2024");
        assert!(!cmd.json);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fltlog", "-c", "/custom/config.toml", "config", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: false })
        ));
    }

    #[test]
    fn test_parse_config_validate_file() {
        let cli = parse(&["fltlog", "config", "validate", "-f", "other.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
