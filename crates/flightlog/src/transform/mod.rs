//! Row transformer and batch runner.
//!
//! [`RowTransformer::transform`] turns one [`FlightRecord`] into at most one
//! [`OutputRecord`] plus its diagnostics. Each row depends only on its own
//! fields and the shared read-only reference data, so
//! [`RowTransformer::run`] maps rows in parallel with rayon and collects the
//! results in input order.
//!
//! # Example
//!
//! ```
//! use flightlog::airport::{AirportDatabase, AirportResolver};
//! use flightlog::record::FlightRecord;
//! use flightlog::transform::{RowTransformer, TransformSettings};
//!
//! let airports = AirportResolver::with_builtin_fallback(AirportDatabase::default());
//! let settings = TransformSettings::default();
//! let transformer = RowTransformer::new(&airports, None, &settings);
//!
//! let row = FlightRecord {
//!     dept_date: Some("03/15/2024".into()),
//!     origin: Some("BKK".into()),
//!     destination: Some("PEN".into()),
//!     out: Some("02:00".into()),
//!     gate_in: Some("04:00".into()),
//!     block_hours: Some("2.0".into()),
//!     ..FlightRecord::default()
//! };
//! let report = transformer.run(&[row], true);
//! assert_eq!(report.records.len(), 1);
//! ```

mod diagnostics;

use chrono_tz::Tz;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::airport::{AirportInfo, AirportResolver, AirportSource};
use crate::crew::{CrewAllocator, CrewPosition, OeTable};
use crate::error::{Error, Result};
use crate::landing::LandingClassifier;
use crate::night::{
    NightEstimator, DEFAULT_METHOD_THRESHOLD_HOURS, DEFAULT_SAMPLE_INTERVAL_MINUTES,
};
use crate::record::{format_tail, FlightRecord, OutputRecord, DEFAULT_TAIL_TEMPLATE};
use crate::sun::{SunCalculator, DEFAULT_TWILIGHT_MINUTES};
use crate::time::{parse_date, TimeNormalizer};

pub use diagnostics::{Diagnostic, Issue, RowId, Severity};

/// Default pilot name written to the PIC/SIC name columns.
pub const DEFAULT_PILOT_NAME: &str = "SELF";

/// Knobs for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSettings {
    /// Requested crew position.
    pub position: CrewPosition,
    /// Name logged in the PIC or SIC name column.
    pub pilot_name: String,
    /// Timezone the input clock values are written in.
    pub record_timezone: Tz,
    /// Route sample spacing for the sampling method.
    pub sample_interval_minutes: u32,
    /// Offset difference up to which the boundary method is used.
    pub method_threshold_hours: f64,
    /// Minutes from sunset to the end of civil twilight.
    pub twilight_minutes: u32,
    /// Template for purely numeric tail numbers.
    pub tail_template: String,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            position: CrewPosition::Captain,
            pilot_name: DEFAULT_PILOT_NAME.to_string(),
            record_timezone: Tz::UTC,
            sample_interval_minutes: DEFAULT_SAMPLE_INTERVAL_MINUTES,
            method_threshold_hours: DEFAULT_METHOD_THRESHOLD_HOURS,
            twilight_minutes: DEFAULT_TWILIGHT_MINUTES,
            tail_template: DEFAULT_TAIL_TEMPLATE.to_string(),
        }
    }
}

/// Check that the reference data a batch needs is present.
///
/// # Errors
///
/// Returns [`Error::MissingReferenceData`] when auto crew mode has no OE table.
pub fn check_reference_data(position: CrewPosition, oe: Option<&OeTable>) -> Result<()> {
    if position == CrewPosition::Auto && oe.map_or(true, OeTable::is_empty) {
        return Err(Error::missing_reference_data(
            "crew position 'auto' requires a non-empty OE data file",
        ));
    }
    Ok(())
}

/// Result of transforming one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    /// The derived entry, absent when the row was skipped.
    pub record: Option<OutputRecord>,
    /// Everything noted about the row.
    pub diagnostics: Vec<Diagnostic>,
}

/// Counters for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatchStats {
    /// Input rows seen.
    pub rows: usize,
    /// Rows written as logbook entries.
    pub converted: usize,
    /// Rows excluded.
    pub skipped: usize,
    /// Non-fatal warnings.
    pub warnings: usize,
    /// Sum of total time over converted rows.
    pub total_hours: f64,
    /// Sum of night time over converted rows.
    pub night_hours: f64,
    /// Night landings over converted rows.
    pub night_landings: u32,
}

/// Output of a batch: entries and diagnostics in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Converted entries.
    pub records: Vec<OutputRecord>,
    /// All diagnostics.
    pub diagnostics: Vec<Diagnostic>,
    /// Counters.
    pub stats: BatchStats,
}

impl BatchReport {
    /// Diagnostics of skipped rows.
    pub fn skipped(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Skipped)
    }

    /// Non-fatal diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// Per-row derivation engine over shared reference data.
#[derive(Debug, Clone)]
pub struct RowTransformer<'a> {
    airports: &'a AirportResolver,
    crew: CrewAllocator<'a>,
    normalizer: TimeNormalizer,
    night: NightEstimator,
    landings: LandingClassifier,
    pilot_name: String,
    tail_template: String,
}

struct RowContext {
    id: RowId,
    diagnostics: Vec<Diagnostic>,
}

impl RowContext {
    fn note(&mut self, issue: Issue) {
        self.diagnostics.push(Diagnostic::new(self.id.clone(), issue));
    }

    fn skip(mut self, issue: Issue) -> RowResult {
        self.note(issue);
        RowResult {
            record: None,
            diagnostics: self.diagnostics,
        }
    }
}

impl<'a> RowTransformer<'a> {
    /// Build a transformer. `oe` is only consulted in auto crew mode.
    #[must_use]
    pub fn new(
        airports: &'a AirportResolver,
        oe: Option<&'a OeTable>,
        settings: &TransformSettings,
    ) -> Self {
        let sun = SunCalculator::new(settings.twilight_minutes);
        Self {
            airports,
            crew: CrewAllocator::new(settings.position, oe),
            normalizer: TimeNormalizer::new(settings.record_timezone),
            night: NightEstimator::new(
                sun,
                settings.method_threshold_hours,
                settings.sample_interval_minutes,
            ),
            landings: LandingClassifier::new(sun),
            pilot_name: settings.pilot_name.clone(),
            tail_template: settings.tail_template.clone(),
        }
    }

    fn resolve(&self, code: &str, ctx: &mut RowContext) -> AirportInfo {
        let info = self.airports.resolve(code);
        match info.source {
            AirportSource::Database => {}
            AirportSource::Fallback => ctx.note(Issue::AirportFallback {
                code: info.code.clone(),
            }),
            AirportSource::Unknown => ctx.note(Issue::AirportUnknown {
                code: info.code.clone(),
            }),
        }
        info
    }

    /// Transform one row. `row` is the one-based input position.
    #[must_use]
    pub fn transform(&self, row: usize, record: &FlightRecord) -> RowResult {
        let mut ctx = RowContext {
            id: RowId {
                row,
                flight: record.flight_str().to_string(),
                date: record.date_str().to_string(),
                route: record.route(),
            },
            diagnostics: Vec::new(),
        };

        let required = [
            ("DEPT_DATE", record.date_str()),
            ("ORG", record.origin_str()),
            ("DEST", record.destination_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return ctx.skip(Issue::MissingField {
                field: (*field).to_string(),
            });
        }

        let Some(date) = parse_date(record.date_str()) else {
            return ctx.skip(Issue::UnparseableDate {
                value: record.date_str().to_string(),
            });
        };

        let clocks = record.clocks();
        let times = self.normalizer.block_times(date, clocks.map(|(_, value)| value));
        for field in times.defaulted_fields() {
            let value = clocks
                .iter()
                .find(|(name, _)| *name == field)
                .map_or("", |(_, value)| *value);
            ctx.note(Issue::MalformedTime {
                field: field.to_string(),
                value: value.to_string(),
            });
        }

        let origin = self.resolve(record.origin_str(), &mut ctx);
        let destination = self.resolve(record.destination_str(), &mut ctx);

        let duration = times.duration_hours();
        let block = record.block_hours();
        let total_time = if block > 0.0 { block } else { duration.max(0.0) };

        let crew = match self.crew.allocate(
            record.flight_str(),
            &origin.code,
            &destination.code,
            date,
            total_time,
        ) {
            Ok(crew) => crew,
            Err(issue) => return ctx.skip(issue),
        };

        let (night_method, night) = if duration <= 0.0 {
            ctx.note(Issue::NonPositiveDuration { hours: duration });
            (None, 0.0)
        } else {
            let estimate = self.night.estimate(
                &origin,
                &destination,
                times.gate_out.instant,
                times.gate_in.instant,
            );
            for issue in estimate.issues {
                ctx.note(issue);
            }
            let mut night = estimate.fraction * duration;
            if total_time > 0.0 {
                night = night.min(total_time);
            }
            (estimate.method, night)
        };

        let performed = record.landing_performed();
        let (takeoff, takeoff_issue) =
            self.landings
                .classify_takeoff(performed, &origin, times.liftoff());
        let (landing, landing_issue) =
            self.landings
                .classify_landing(performed, &destination, times.touchdown());
        for issue in [takeoff_issue, landing_issue].into_iter().flatten() {
            ctx.note(issue);
        }

        let (pic_name, sic_name) = if crew.role.is_pic() {
            (self.pilot_name.clone(), String::new())
        } else {
            (String::new(), self.pilot_name.clone())
        };

        let output = OutputRecord {
            date,
            aircraft_type: record.equipment.as_deref().unwrap_or_default().trim().to_string(),
            aircraft_ident: format_tail(
                record.tail.as_deref().unwrap_or_default(),
                &self.tail_template,
            ),
            flight: record.flight_str().to_string(),
            origin: origin.code.clone(),
            destination: destination.code.clone(),
            out: times.gate_out.instant,
            off: times.wheels_off.instant,
            on: times.wheels_on.instant,
            gate_in: times.gate_in.instant,
            duration: record.flight_hours(),
            total_time,
            pic: crew.pic,
            sic: crew.sic,
            cross_country: total_time,
            night,
            actual_instrument: 0.5 * night,
            multi_pilot: total_time,
            role: crew.role,
            pic_name,
            sic_name,
            takeoff,
            landing,
            approaches: u32::from(performed),
            night_method,
        };

        debug!(
            row,
            route = %output.route(),
            role = %crew.role,
            night = output.night,
            landing = %landing,
            "converted row"
        );

        RowResult {
            record: Some(output),
            diagnostics: ctx.diagnostics,
        }
    }

    /// Transform a batch, preserving input order.
    ///
    /// With `parallel` the rows are spread over the rayon thread pool; the
    /// result is identical to the sequential run.
    #[must_use]
    pub fn run(&self, records: &[FlightRecord], parallel: bool) -> BatchReport {
        let results: Vec<RowResult> = if parallel {
            records
                .par_iter()
                .enumerate()
                .map(|(index, record)| self.transform(index + 1, record))
                .collect()
        } else {
            records
                .iter()
                .enumerate()
                .map(|(index, record)| self.transform(index + 1, record))
                .collect()
        };

        let mut report = BatchReport {
            stats: BatchStats {
                rows: records.len(),
                ..BatchStats::default()
            },
            ..BatchReport::default()
        };

        for result in results {
            for diagnostic in &result.diagnostics {
                match diagnostic.severity {
                    Severity::Skipped => {
                        warn!("Skipping {}: {}", diagnostic.row, diagnostic.issue);
                        report.stats.skipped += 1;
                    }
                    Severity::Warning => report.stats.warnings += 1,
                }
            }
            report.diagnostics.extend(result.diagnostics);

            if let Some(record) = result.record {
                report.stats.converted += 1;
                report.stats.total_hours += record.total_time;
                report.stats.night_hours += record.night;
                report.stats.night_landings += record.night_landings();
                report.records.push(record);
            }
        }

        info!(
            rows = report.stats.rows,
            converted = report.stats.converted,
            skipped = report.stats.skipped,
            warnings = report.stats.warnings,
            "Batch complete"
        );
        report
    }
}
