//! Per-row diagnostics.
//!
//! Every non-fatal warning and every skipped row is recorded as a
//! [`Diagnostic`]: the row's identifying fields, a [`Severity`] and the
//! [`Issue`] itself. Diagnostics serialize to JSON for the `--diagnostics`
//! report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sun::SunStatus;

/// Something noteworthy about one input row.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// The departure date could not be read in any accepted layout.
    #[error("unparseable departure date '{value}'")]
    UnparseableDate {
        /// Raw cell value.
        value: String,
    },

    /// A required column is absent or empty.
    #[error("missing required field {field}")]
    MissingField {
        /// Column name.
        field: String,
    },

    /// Auto crew mode found no usable OE record for the flight.
    #[error("no OE record resolves a crew position for flight {flight}")]
    UnresolvedCrewPosition {
        /// Normalized flight number.
        flight: String,
    },

    /// A clock value was unreadable and local noon was used.
    #[error("malformed {field} time '{value}', defaulted to 12:00")]
    MalformedTime {
        /// Column name.
        field: String,
        /// Raw cell value.
        value: String,
    },

    /// The airport came from the fallback table.
    #[error("airport {code} resolved from fallback table")]
    AirportFallback {
        /// Airport code.
        code: String,
    },

    /// The airport is in neither table.
    #[error("airport {code} is unknown, night time and landings default to day")]
    AirportUnknown {
        /// Airport code.
        code: String,
    },

    /// Sun events could not be computed where a decision needed them.
    #[error("sun events unavailable at {location} on {date} ({status}), {context} defaults to day")]
    SunCalculation {
        /// Airport code or route position.
        location: String,
        /// Local date of the failed window.
        date: NaiveDate,
        /// Why the window is invalid.
        status: SunStatus,
        /// Which decision was affected.
        context: String,
    },

    /// Route samples were dropped from the night ratio.
    #[error("excluded {excluded} of {total} route samples from night estimate")]
    SamplesExcluded {
        /// Samples without a valid sun window.
        excluded: usize,
        /// Samples taken.
        total: usize,
    },

    /// Gate in is not after gate out.
    #[error("non-positive flight duration ({hours:.2} h), night time set to 0")]
    NonPositiveDuration {
        /// Gate out to gate in, in hours.
        hours: f64,
    },

    /// Auto crew mode matched an OE record whose seat or role maps to no position.
    #[error("unrecognized OE seat/role '{value}' for flight {flight}")]
    UnrecognizedOeRole {
        /// Normalized flight number.
        flight: String,
        /// Seat or role text.
        value: String,
    },
}

impl Issue {
    /// Whether this issue excludes the row from output.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnparseableDate { .. }
                | Self::MissingField { .. }
                | Self::UnresolvedCrewPosition { .. }
                | Self::UnrecognizedOeRole { .. }
        )
    }

    /// Severity implied by the issue kind.
    #[must_use]
    pub fn severity(&self) -> Severity {
        if self.is_fatal() {
            Severity::Skipped
        } else {
            Severity::Warning
        }
    }
}

/// How an issue affected its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The row was processed with a default.
    Warning,
    /// The row was excluded from output.
    Skipped,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Identifying fields of an input row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowId {
    /// One-based position of the row in the input.
    pub row: usize,
    /// Flight number as written.
    pub flight: String,
    /// Departure date as written.
    pub date: String,
    /// `ORG-DEST`.
    pub route: String,
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}", self.row)?;
        let details: Vec<&str> = [self.flight.as_str(), self.date.as_str(), self.route.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty() && *s != "-")
            .collect();
        if !details.is_empty() {
            write!(f, " ({})", details.join(" "))?;
        }
        Ok(())
    }
}

/// One recorded issue for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Which row.
    pub row: RowId,
    /// Warning or skipped.
    pub severity: Severity,
    /// What happened.
    pub issue: Issue,
}

impl Diagnostic {
    /// Attach an issue to a row, deriving severity from the issue kind.
    #[must_use]
    pub fn new(row: RowId, issue: Issue) -> Self {
        Self {
            severity: issue.severity(),
            row,
            issue,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.row, self.severity, self.issue)
    }
}
