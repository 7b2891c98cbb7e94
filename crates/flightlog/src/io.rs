//! CSV input and logbook output.
//!
//! Flight and OE tables are read through serde into string-typed records so
//! that cell problems become row diagnostics. Logbook rows are written in one
//! of two layouts; hour quantities are rounded to one decimal here and nowhere
//! else.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crew::{OeRecord, OeTable};
use crate::error::{Error, Result};
use crate::record::{FlightRecord, OutputRecord};
use crate::transform::{BatchStats, Diagnostic};

/// Logbook output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// FAA logbook columns.
    #[default]
    Faa,
    /// logbook.aero import columns.
    LogbookAero,
}

impl OutputFormat {
    /// File name prefix for generated output names.
    #[must_use]
    pub fn file_prefix(self) -> &'static str {
        match self {
            Self::Faa => "FAA",
            Self::LogbookAero => "Logbook_Aero",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Faa => write!(f, "faa"),
            Self::LogbookAero => write!(f, "logbook_aero"),
        }
    }
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(Error::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(File::open(path)?)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

/// Read the flight activity table from a file.
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid CSV.
pub fn read_flights(path: impl AsRef<Path>) -> Result<Vec<FlightRecord>> {
    let path = path.as_ref();
    let flights = read_flights_from(open(path)?)?;
    info!(path = %path.display(), rows = flights.len(), "Read flight records");
    Ok(flights)
}

/// Read the flight activity table from any reader.
///
/// # Errors
///
/// Returns an error if the input is not valid CSV.
pub fn read_flights_from<R: Read>(reader: R) -> Result<Vec<FlightRecord>> {
    let mut reader = csv_reader(reader);
    let mut flights = Vec::new();
    for record in reader.deserialize() {
        flights.push(record?);
    }
    Ok(flights)
}

/// Read the OE table from a file.
///
/// # Errors
///
/// Returns an error if the file is missing or is not valid CSV.
pub fn read_oe(path: impl AsRef<Path>) -> Result<OeTable> {
    let path = path.as_ref();
    let table = read_oe_from(open(path)?)?;
    info!(path = %path.display(), rows = table.len(), "Read OE records");
    Ok(table)
}

/// Read the OE table from any reader. Rows without a flight number are dropped.
///
/// # Errors
///
/// Returns an error if the input is not valid CSV.
pub fn read_oe_from<R: Read>(reader: R) -> Result<OeTable> {
    let mut reader = csv_reader(reader);
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for record in reader.deserialize::<OeRecord>() {
        let record = record?;
        if record.flight.trim().is_empty() {
            dropped += 1;
            continue;
        }
        records.push(record);
    }
    if dropped > 0 {
        debug!("Dropped {} OE rows without a flight number", dropped);
    }
    Ok(OeTable::new(records))
}

/// Round an hour quantity to one decimal.
#[must_use]
pub fn round_tenths(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

#[derive(Debug, Serialize)]
struct FaaRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Aircraft Type")]
    aircraft_type: String,
    #[serde(rename = "Aircraft Ident.")]
    aircraft_ident: String,
    #[serde(rename = "Route")]
    route: String,
    #[serde(rename = "Route From")]
    route_from: String,
    #[serde(rename = "Route To")]
    route_to: String,
    #[serde(rename = "Out")]
    out: String,
    #[serde(rename = "Off")]
    off: String,
    #[serde(rename = "On")]
    on: String,
    #[serde(rename = "In")]
    gate_in: String,
    #[serde(rename = "Duration")]
    duration: f64,
    #[serde(rename = "Total Time")]
    total_time: f64,
    #[serde(rename = "PIC")]
    pic: f64,
    #[serde(rename = "SIC")]
    sic: f64,
    #[serde(rename = "Cross Country")]
    cross_country: f64,
    #[serde(rename = "Night")]
    night: f64,
    #[serde(rename = "Actual Instrument")]
    actual_instrument: f64,
    #[serde(rename = "Day Landings")]
    day_landings: u32,
    #[serde(rename = "Night Landings")]
    night_landings: u32,
    #[serde(rename = "Approaches")]
    approaches: String,
}

#[derive(Debug, Serialize)]
struct LogbookAeroRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Departure_Airfield")]
    departure_airfield: String,
    #[serde(rename = "Arrival_Airfield")]
    arrival_airfield: String,
    #[serde(rename = "Route")]
    route: String,
    #[serde(rename = "Departure_Time")]
    departure_time: String,
    #[serde(rename = "Arrival_Time")]
    arrival_time: String,
    #[serde(rename = "Aircraft_Type")]
    aircraft_type: String,
    #[serde(rename = "Aircraft_Registration")]
    aircraft_registration: String,
    #[serde(rename = "Total_Time")]
    total_time: f64,
    #[serde(rename = "MultiPilot_Time")]
    multi_pilot_time: f64,
    #[serde(rename = "PIC_Name")]
    pic_name: String,
    #[serde(rename = "SIC_Name")]
    sic_name: String,
    #[serde(rename = "Takeoff_Day")]
    takeoff_day: u32,
    #[serde(rename = "Takeoff_Night")]
    takeoff_night: u32,
    #[serde(rename = "Landing_Day")]
    landing_day: u32,
    #[serde(rename = "Landing_Night")]
    landing_night: u32,
    #[serde(rename = "Night_Time")]
    night_time: f64,
    #[serde(rename = "IFR_Time")]
    ifr_time: f64,
    #[serde(rename = "PIC_Time")]
    pic_time: f64,
    #[serde(rename = "CoPilot_Time")]
    copilot_time: f64,
    #[serde(rename = "XC_Time")]
    xc_time: f64,
    #[serde(rename = "Instrument_Approach")]
    instrument_approach: u32,
}

/// Writes logbook rows in a chosen layout.
///
/// Clock columns are rendered as `HH:MM` in `zone`, the timezone the input
/// clock values were written in.
#[derive(Debug, Clone, Copy)]
pub struct LogbookWriter {
    format: OutputFormat,
    zone: Tz,
}

impl LogbookWriter {
    /// Create a writer.
    #[must_use]
    pub fn new(format: OutputFormat, zone: Tz) -> Self {
        Self { format, zone }
    }

    /// The output layout.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn clock(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.zone).format("%H:%M").to_string()
    }

    fn faa_row(&self, record: &OutputRecord) -> FaaRow {
        FaaRow {
            date: record.date.format("%m/%d/%Y").to_string(),
            aircraft_type: record.aircraft_type.clone(),
            aircraft_ident: record.aircraft_ident.clone(),
            route: record.route(),
            route_from: record.origin.clone(),
            route_to: record.destination.clone(),
            out: self.clock(record.out),
            off: self.clock(record.off),
            on: self.clock(record.on),
            gate_in: self.clock(record.gate_in),
            duration: round_tenths(record.duration),
            total_time: round_tenths(record.total_time),
            pic: round_tenths(record.pic),
            sic: round_tenths(record.sic),
            cross_country: round_tenths(record.cross_country),
            night: round_tenths(record.night),
            actual_instrument: round_tenths(record.actual_instrument),
            day_landings: record.day_landings(),
            night_landings: record.night_landings(),
            approaches: if record.approaches > 0 {
                format!("{};{}", record.approaches, record.destination)
            } else {
                String::new()
            },
        }
    }

    fn logbook_aero_row(&self, record: &OutputRecord) -> LogbookAeroRow {
        LogbookAeroRow {
            date: record.date.format("%Y-%m-%d").to_string(),
            departure_airfield: record.origin.clone(),
            arrival_airfield: record.destination.clone(),
            route: record.route(),
            departure_time: self.clock(record.out),
            arrival_time: self.clock(record.gate_in),
            aircraft_type: record.aircraft_type.clone(),
            aircraft_registration: record.aircraft_ident.clone(),
            total_time: round_tenths(record.total_time),
            multi_pilot_time: round_tenths(record.multi_pilot),
            pic_name: record.pic_name.clone(),
            sic_name: record.sic_name.clone(),
            takeoff_day: record.day_takeoffs(),
            takeoff_night: record.night_takeoffs(),
            landing_day: record.day_landings(),
            landing_night: record.night_landings(),
            night_time: round_tenths(record.night),
            ifr_time: round_tenths(record.actual_instrument),
            pic_time: round_tenths(record.pic),
            copilot_time: round_tenths(record.sic),
            xc_time: round_tenths(record.cross_country),
            instrument_approach: record.approaches,
        }
    }

    /// Write `records` with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying writer fails.
    pub fn write<W: Write>(&self, writer: W, records: &[OutputRecord]) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        match self.format {
            OutputFormat::Faa => {
                if records.is_empty() {
                    out.write_record(FAA_HEADERS)?;
                }
                for record in records {
                    out.serialize(self.faa_row(record))?;
                }
            }
            OutputFormat::LogbookAero => {
                if records.is_empty() {
                    out.write_record(LOGBOOK_AERO_HEADERS)?;
                }
                for record in records {
                    out.serialize(self.logbook_aero_row(record))?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Write `records` to a file, replacing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_path(&self, path: impl AsRef<Path>, records: &[OutputRecord]) -> Result<()> {
        let path = path.as_ref();
        self.write(File::create(path)?, records)?;
        info!(
            path = %path.display(),
            rows = records.len(),
            format = %self.format,
            "Wrote logbook"
        );
        Ok(())
    }
}

const FAA_HEADERS: [&str; 20] = [
    "Date",
    "Aircraft Type",
    "Aircraft Ident.",
    "Route",
    "Route From",
    "Route To",
    "Out",
    "Off",
    "On",
    "In",
    "Duration",
    "Total Time",
    "PIC",
    "SIC",
    "Cross Country",
    "Night",
    "Actual Instrument",
    "Day Landings",
    "Night Landings",
    "Approaches",
];

const LOGBOOK_AERO_HEADERS: [&str; 22] = [
    "Date",
    "Departure_Airfield",
    "Arrival_Airfield",
    "Route",
    "Departure_Time",
    "Arrival_Time",
    "Aircraft_Type",
    "Aircraft_Registration",
    "Total_Time",
    "MultiPilot_Time",
    "PIC_Name",
    "SIC_Name",
    "Takeoff_Day",
    "Takeoff_Night",
    "Landing_Day",
    "Landing_Night",
    "Night_Time",
    "IFR_Time",
    "PIC_Time",
    "CoPilot_Time",
    "XC_Time",
    "Instrument_Approach",
];

/// Output file name derived from the input name and the run date.
///
/// The file lands next to the input: `FAA_<stem>_<YYYY-MM-DD>.csv` or
/// `Logbook_Aero_<stem>_<YYYY-MM-DD>.csv`.
#[must_use]
pub fn default_output_path(input: &Path, format: OutputFormat, today: NaiveDate) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "flights".into(), |s| s.to_string_lossy());
    let name = format!(
        "{}_{}_{}.csv",
        format.file_prefix(),
        stem,
        today.format("%Y-%m-%d")
    );
    input.with_file_name(name)
}

#[derive(Debug, Serialize)]
struct DiagnosticsReport<'a> {
    stats: &'a BatchStats,
    diagnostics: &'a [Diagnostic],
}

/// Write the batch diagnostics as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_diagnostics<W: Write>(
    writer: W,
    stats: &BatchStats,
    diagnostics: &[Diagnostic],
) -> Result<()> {
    serde_json::to_writer_pretty(writer, &DiagnosticsReport { stats, diagnostics })?;
    Ok(())
}

/// Write the batch diagnostics to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_diagnostics_path(
    path: impl AsRef<Path>,
    stats: &BatchStats,
    diagnostics: &[Diagnostic],
) -> Result<()> {
    let path = path.as_ref();
    write_diagnostics(File::create(path)?, stats, diagnostics)?;
    debug!(path = %path.display(), count = diagnostics.len(), "Wrote diagnostics");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::CrewRole;
    use crate::landing::LandingClass;
    use crate::night::NightMethod;
    use crate::transform::{Issue, RowId};
    use chrono::TimeZone;

    fn output() -> OutputRecord {
        OutputRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            aircraft_type: "B763".to_string(),
            aircraft_ident: "N115FE".to_string(),
            flight: "57".to_string(),
            origin: "ACC".to_string(),
            destination: "ABJ".to_string(),
            out: Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap(),
            off: Utc.with_ymd_and_hms(2024, 3, 15, 20, 12, 0).unwrap(),
            on: Utc.with_ymd_and_hms(2024, 3, 15, 21, 50, 0).unwrap(),
            gate_in: Utc.with_ymd_and_hms(2024, 3, 15, 22, 0, 0).unwrap(),
            duration: 1.633,
            total_time: 2.0,
            pic: 2.0,
            sic: 0.0,
            cross_country: 2.0,
            night: 1.96,
            actual_instrument: 0.98,
            multi_pilot: 2.0,
            role: CrewRole::Captain,
            pic_name: "SELF".to_string(),
            sic_name: String::new(),
            takeoff: LandingClass::Night,
            landing: LandingClass::Night,
            approaches: 1,
            night_method: Some(NightMethod::Boundary),
        }
    }

    fn written(format: OutputFormat, zone: Tz, records: &[OutputRecord]) -> String {
        let mut buf = Vec::new();
        LogbookWriter::new(format, zone).write(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_read_flights_with_missing_columns() {
        let data = "\
DEPT_DATE,ORG,DEST,OUT,IN,BLK_HRS,LANDING
06/01/2024,MEM,ANC,20:00,.,5.5,1
06/02/2024,ANC,,08:00,14:00,,0
";
        let flights = read_flights_from(data.as_bytes()).unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].origin_str(), "MEM");
        assert!((flights[0].block_hours() - 5.5).abs() < f64::EPSILON);
        assert!(flights[0].equipment.is_none());
        assert_eq!(flights[1].destination_str(), "");
        assert!(flights[1].block_hours().abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_flights_tolerates_padded_headers() {
        let data = "DEPT_DATE , ORG,DEST\n06/01/2024,MEM,ANC\n";
        let flights = read_flights_from(data.as_bytes()).unwrap();
        assert_eq!(flights[0].date_str(), "06/01/2024");
        assert_eq!(flights[0].origin_str(), "MEM");
    }

    #[test]
    fn test_read_flights_missing_file() {
        let err = read_flights("/nonexistent/flights.csv").unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }

    #[test]
    fn test_read_oe_drops_rows_without_flight() {
        let data = "\
FLIGHT,ORG,DEST,FLT_DT,SEAT,PIC_OE
57,ACC,ABJ,15MAR2024,CAPT,1.5
,ACC,ABJ,15MAR2024,FO,
";
        let table = read_oe_from(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(table.lookup("57", "ACC", "ABJ", date).is_some());
        assert!(table.lookup("0057", "XXX", "YYY", date).is_some());
    }

    #[test]
    fn test_round_tenths() {
        assert!((round_tenths(1.96) - 2.0).abs() < 1e-12);
        assert!((round_tenths(0.98) - 1.0).abs() < 1e-12);
        assert!((round_tenths(1.633) - 1.6).abs() < 1e-12);
        assert!(round_tenths(0.04).abs() < 1e-12);
    }

    #[test]
    fn test_write_faa_layout() {
        let text = written(OutputFormat::Faa, Tz::UTC, &[output()]);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), FAA_HEADERS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "03/15/2024,B763,N115FE,ACC-ABJ,ACC,ABJ,20:00,20:12,21:50,22:00,1.6,2.0,2.0,0.0,2.0,2.0,1.0,0,1,1;ABJ"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_logbook_aero_layout() {
        let text = written(OutputFormat::LogbookAero, Tz::UTC, &[output()]);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), LOGBOOK_AERO_HEADERS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-15,ACC,ABJ,ACC-ABJ,20:00,22:00,B763,N115FE,2.0,2.0,SELF,,0,1,0,1,2.0,1.0,2.0,0.0,2.0,1"
        );
    }

    #[test]
    fn test_write_renders_clocks_in_record_zone() {
        let text = written(
            OutputFormat::Faa,
            chrono_tz::America::New_York,
            &[output()],
        );
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains(",16:00,16:12,17:50,18:00,"));
    }

    #[test]
    fn test_write_empty_batch_has_header() {
        let text = written(OutputFormat::LogbookAero, Tz::UTC, &[]);
        assert_eq!(text.trim_end(), LOGBOOK_AERO_HEADERS.join(","));
    }

    #[test]
    fn test_no_approach_renders_empty() {
        let mut record = output();
        record.approaches = 0;
        record.landing = LandingClass::None;
        let text = written(OutputFormat::Faa, Tz::UTC, &[record]);
        assert!(text.lines().nth(1).unwrap().ends_with(",0,0,"));
    }

    #[test]
    fn test_default_output_path() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 2).unwrap();
        assert_eq!(
            default_output_path(Path::new("data/dec.csv"), OutputFormat::Faa, today),
            PathBuf::from("data/FAA_dec_2025-12-02.csv")
        );
        assert_eq!(
            default_output_path(Path::new("dec.csv"), OutputFormat::LogbookAero, today),
            PathBuf::from("Logbook_Aero_dec_2025-12-02.csv")
        );
    }

    #[test]
    fn test_output_format_serde_names() {
        assert_eq!(
            serde_json::to_string(&OutputFormat::LogbookAero).unwrap(),
            "\"logbook_aero\""
        );
        assert_eq!(OutputFormat::Faa.to_string(), "faa");
        assert_eq!(OutputFormat::default(), OutputFormat::Faa);
    }

    #[test]
    fn test_write_diagnostics_json() {
        let diagnostics = vec![Diagnostic::new(
            RowId {
                row: 2,
                flight: "57".to_string(),
                date: "garbage".to_string(),
                route: "ACC-ABJ".to_string(),
            },
            Issue::UnparseableDate {
                value: "garbage".to_string(),
            },
        )];
        let stats = BatchStats {
            rows: 2,
            converted: 1,
            skipped: 1,
            ..BatchStats::default()
        };
        let mut buf = Vec::new();
        write_diagnostics(&mut buf, &stats, &diagnostics).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["stats"]["skipped"], 1);
        assert_eq!(json["diagnostics"][0]["severity"], "skipped");
        assert_eq!(json["diagnostics"][0]["issue"]["kind"], "unparseable_date");
        assert_eq!(json["diagnostics"][0]["row"]["row"], 2);
    }
}
