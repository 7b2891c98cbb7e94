//! `fltlog` - CLI for flightlog
//!
//! This binary converts airline flight activity exports into logbook CSVs and
//! exposes the airport and sun lookups behind the conversion.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;

use flightlog::cli::{AirportCommand, Cli, Command, ConfigCommand, ConvertCommand, SunCommand};
use flightlog::io::{self, LogbookWriter};
use flightlog::sun::SunCalculator;
use flightlog::transform::{check_reference_data, BatchReport, RowTransformer};
use flightlog::{init_logging, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config subcommands load (or skip) the configuration themselves
    let config_path = cli.config;
    let load = || Config::load_from(config_path.clone());

    // Execute the command
    match cli.command {
        Command::Convert(cmd) => handle_convert(load()?, cmd),
        Command::Airport(cmd) => handle_airport(load()?, &cmd),
        Command::Sun(cmd) => handle_sun(load()?, &cmd),
        Command::Config(cmd) => handle_config(config_path.clone(), cmd),
    }
}

fn handle_convert(mut config: Config, cmd: ConvertCommand) -> anyhow::Result<()> {
    if let Some(path) = cmd.airports {
        config.airports.database = Some(path);
    }
    if let Some(position) = cmd.position {
        config.processing.position = position.into();
    }
    if let Some(name) = cmd.pilot_name {
        config.processing.pilot_name = name;
    }
    if let Some(format) = cmd.format {
        config.output.format = format.into();
    }
    if cmd.sequential {
        config.processing.parallel = false;
    }

    let settings = config.transform_settings()?;
    let oe = cmd.oe_data.as_ref().map(io::read_oe).transpose()?;
    check_reference_data(settings.position, oe.as_ref())?;
    let airports = config.airport_resolver()?;

    let flights = io::read_flights(&cmd.input)
        .with_context(|| format!("reading {}", cmd.input.display()))?;

    let transformer = RowTransformer::new(&airports, oe.as_ref(), &settings);
    let report = transformer.run(&flights, config.processing.parallel);

    let format = config.output.format;
    let output = cmd.output.unwrap_or_else(|| {
        io::default_output_path(&cmd.input, format, Local::now().date_naive())
    });
    LogbookWriter::new(format, settings.record_timezone).write_path(&output, &report.records)?;

    if let Some(path) = &cmd.diagnostics {
        io::write_diagnostics_path(path, &report.stats, &report.diagnostics)?;
    }

    print_summary(&report, &output);
    Ok(())
}

fn print_summary(report: &BatchReport, output: &std::path::Path) {
    let stats = &report.stats;
    println!("Converted {} of {} flights", stats.converted, stats.rows);
    println!("  Total time:      {:.1}", stats.total_hours);
    println!("  Night time:      {:.1}", stats.night_hours);
    println!("  Night landings:  {}", stats.night_landings);
    println!("  Output:          {}", output.display());

    if stats.skipped > 0 {
        println!();
        println!("Skipped rows ({}):", stats.skipped);
        for diagnostic in report.skipped() {
            println!("  {}: {}", diagnostic.row, diagnostic.issue);
        }
    }
    if stats.warnings > 0 {
        println!();
        println!("Warnings ({}):", stats.warnings);
        for diagnostic in report.warnings() {
            println!("  {}: {}", diagnostic.row, diagnostic.issue);
        }
    }
}

fn handle_airport(mut config: Config, cmd: &AirportCommand) -> anyhow::Result<()> {
    if let Some(path) = &cmd.airports {
        config.airports.database = Some(path.clone());
    }
    let resolver = config.airport_resolver()?;
    let airports: Vec<_> = cmd.codes.iter().map(|code| resolver.resolve(code)).collect();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&airports)?);
        return Ok(());
    }

    for airport in &airports {
        if airport.is_unknown() {
            println!("{:<5} unknown", airport.code);
            continue;
        }
        println!(
            "{:<5} {:>9.4} {:>10.4}  {:<24} {:<9} {}",
            airport.code,
            airport.latitude,
            airport.longitude,
            airport.timezone.name(),
            airport.source,
            airport.name
        );
    }
    Ok(())
}

fn handle_sun(mut config: Config, cmd: &SunCommand) -> anyhow::Result<()> {
    if let Some(path) = &cmd.airports {
        config.airports.database = Some(path.clone());
    }
    let Some(date) = flightlog::time::parse_date(&cmd.date) else {
        bail!("unparseable date '{}'", cmd.date);
    };
    let resolver = config.airport_resolver()?;
    let airport = resolver.resolve(&cmd.code);
    if airport.is_unknown() {
        bail!("unknown airport '{}'", airport.code);
    }

    let sun = SunCalculator::new(config.processing.twilight_minutes);
    let window = sun.window(airport.latitude, airport.longitude, date, &airport.timezone);

    if cmd.json {
        let value = serde_json::json!({
            "airport": airport,
            "window": window,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} {} ({})", airport.code, date, airport.timezone.name());
    match window.events {
        Some(events) => {
            println!("  Sunrise:       {}", events.sunrise.format("%H:%M %:z"));
            println!("  Sunset:        {}", events.sunset.format("%H:%M %:z"));
            println!("  Twilight end:  {}", events.twilight_end.format("%H:%M %:z"));
        }
        None => println!("  No sunrise or sunset: {}", window.status),
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = &Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Airports]");
                println!(
                    "  Database:           {}",
                    config.airport_database_path().display()
                );
                println!("  Extra fallbacks:    {}", config.airports.fallback.len());
                println!();
                println!("[Processing]");
                println!("  Position:           {}", config.processing.position);
                println!("  Pilot name:         {}", config.processing.pilot_name);
                println!(
                    "  Record timezone:    {}",
                    config.processing.record_timezone
                );
                println!(
                    "  Sample interval:    {} min",
                    config.processing.sample_interval_minutes
                );
                println!(
                    "  Method threshold:   {} h",
                    config.processing.method_threshold_hours
                );
                println!(
                    "  Twilight:           {} min",
                    config.processing.twilight_minutes
                );
                println!("  Parallel:           {}", config.processing.parallel);
                println!();
                println!("[Output]");
                println!("  Format:             {}", config.output.format);
                println!(
                    "  Tail template:      {}",
                    config.output.numeric_tail_template
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if let Err(e) = Config::validate_file(&path) {
                bail!("configuration error in {}: {e}", path.display());
            }
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
