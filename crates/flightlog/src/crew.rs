//! Crew position allocation.
//!
//! A fixed crew position splits block time by a static table. In `auto` mode
//! the position comes from the Operating Experience (OE) table, whose seat or
//! role columns pick the position and whose hour columns may override the
//! split. A flight with no OE record is never silently credited as captain.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::parse_hours;
use crate::transform::Issue;

/// Crew role flown on a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewRole {
    /// Pilot in command for the whole block.
    Captain,
    /// Second in command for the whole block.
    FirstOfficer,
    /// Relief pilot in command for half the block.
    ReliefCaptain,
    /// Relief second in command for half the block.
    ReliefFirstOfficer,
}

impl CrewRole {
    /// `(pic, sic)` shares of block time.
    #[must_use]
    pub fn shares(self) -> (f64, f64) {
        match self {
            Self::Captain => (1.0, 0.0),
            Self::FirstOfficer => (0.0, 1.0),
            Self::ReliefCaptain => (0.5, 0.0),
            Self::ReliefFirstOfficer => (0.0, 0.5),
        }
    }

    /// Whether the role logs pilot-in-command time.
    #[must_use]
    pub fn is_pic(self) -> bool {
        matches!(self, Self::Captain | Self::ReliefCaptain)
    }

    /// Split `block_hours` by the static table.
    #[must_use]
    pub fn allocate(self, block_hours: f64) -> CrewTime {
        let (pic, sic) = self.shares();
        CrewTime {
            role: self,
            pic: pic * block_hours,
            sic: sic * block_hours,
        }
    }
}

impl std::fmt::Display for CrewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Captain => write!(f, "captain"),
            Self::FirstOfficer => write!(f, "first_officer"),
            Self::ReliefCaptain => write!(f, "relief_captain"),
            Self::ReliefFirstOfficer => write!(f, "relief_first_officer"),
        }
    }
}

/// Requested crew position for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewPosition {
    /// Always captain.
    #[default]
    Captain,
    /// Always first officer.
    FirstOfficer,
    /// Always relief captain.
    ReliefCaptain,
    /// Always relief first officer.
    ReliefFirstOfficer,
    /// Per flight, from the OE table.
    Auto,
}

impl CrewPosition {
    /// The fixed role, or `None` for auto.
    #[must_use]
    pub fn fixed_role(self) -> Option<CrewRole> {
        match self {
            Self::Captain => Some(CrewRole::Captain),
            Self::FirstOfficer => Some(CrewRole::FirstOfficer),
            Self::ReliefCaptain => Some(CrewRole::ReliefCaptain),
            Self::ReliefFirstOfficer => Some(CrewRole::ReliefFirstOfficer),
            Self::Auto => None,
        }
    }
}

impl std::fmt::Display for CrewPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fixed_role() {
            Some(role) => role.fmt(f),
            None => write!(f, "auto"),
        }
    }
}

impl FromStr for CrewPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "captain" => Ok(Self::Captain),
            "first_officer" => Ok(Self::FirstOfficer),
            "relief_captain" => Ok(Self::ReliefCaptain),
            "relief_first_officer" => Ok(Self::ReliefFirstOfficer),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown crew position '{other}'")),
        }
    }
}

/// PIC and SIC hours credited for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrewTime {
    /// The role flown.
    pub role: CrewRole,
    /// Pilot-in-command hours.
    pub pic: f64,
    /// Second-in-command hours.
    pub sic: f64,
}

/// Split block time for a role.
#[must_use]
pub fn allocate(role: CrewRole, block_hours: f64) -> CrewTime {
    role.allocate(block_hours)
}

/// Zero-pad a flight number to four characters, dropping a trailing `.0`.
#[must_use]
pub fn normalize_flight(flight: &str) -> String {
    let flight = flight.trim();
    let flight = flight.strip_suffix(".0").unwrap_or(flight);
    format!("{flight:0>4}")
}

/// One row of the OE table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OeRecord {
    /// Flight number.
    #[serde(rename = "FLIGHT")]
    pub flight: String,
    /// Origin code.
    #[serde(rename = "ORG", default)]
    pub origin: Option<String>,
    /// Destination code.
    #[serde(rename = "DEST", default)]
    pub destination: Option<String>,
    /// Flight date as `DDMMMYYYY`.
    #[serde(rename = "FLT_DT", default)]
    pub date: Option<String>,
    /// Seat designation.
    #[serde(rename = "SEAT", default)]
    pub seat: Option<String>,
    /// `PIC` or `SIC`, used when no seat is given.
    #[serde(rename = "ROLE", default)]
    pub role: Option<String>,
    /// PIC hours for the captain seat or PIC role.
    #[serde(rename = "PIC_OE", default)]
    pub pic_oe: Option<String>,
    /// SIC hours for the first officer seat or SIC role.
    #[serde(rename = "SIC_OE", default)]
    pub sic_oe: Option<String>,
    /// PIC hours for the relief captain seat.
    #[serde(rename = "PIC_RFO_OE", default)]
    pub pic_rfo_oe: Option<String>,
    /// SIC hours for the relief first officer seat.
    #[serde(rename = "SIC_RFO_OE", default)]
    pub sic_rfo_oe: Option<String>,
}

/// Position and optional hour overrides derived from an OE record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OeAssignment {
    /// The role flown.
    pub role: CrewRole,
    /// PIC hours replacing the table value.
    pub pic: Option<f64>,
    /// SIC hours replacing the table value.
    pub sic: Option<f64>,
}

impl OeAssignment {
    /// Apply to a leg's block time. Overrides are capped at `block_hours`.
    #[must_use]
    pub fn apply(&self, block_hours: f64) -> CrewTime {
        let table = self.role.allocate(block_hours);
        let cap = |hours: f64| hours.min(block_hours.max(0.0));
        CrewTime {
            role: self.role,
            pic: self.pic.map_or(table.pic, cap),
            sic: self.sic.map_or(table.sic, cap),
        }
    }
}

fn positive(value: Option<&str>) -> Option<f64> {
    let hours = parse_hours(value);
    (hours > 0.0).then_some(hours)
}

fn upper(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_ascii_uppercase()
}

impl OeRecord {
    /// Normalized flight number.
    #[must_use]
    pub fn flight_key(&self) -> String {
        normalize_flight(&self.flight)
    }

    /// Parsed `FLT_DT`.
    #[must_use]
    pub fn flight_date(&self) -> Option<NaiveDate> {
        parse_oe_date(self.date.as_deref()?)
    }

    /// Resolve the crew position. `None` when neither seat nor role is recognized.
    #[must_use]
    pub fn assignment(&self) -> Option<OeAssignment> {
        let seat = upper(self.seat.as_deref());
        let (role, pic, sic) = match seat.as_str() {
            "CAPT" | "CPT" | "CAPTAIN" => (
                CrewRole::Captain,
                positive(self.pic_oe.as_deref()),
                Some(0.0),
            ),
            "FO" | "F/O" | "FIRST OFFICER" => (
                CrewRole::FirstOfficer,
                Some(0.0),
                positive(self.sic_oe.as_deref()),
            ),
            "RFO" | "RF/O" | "R/FO" | "RELIEF FIRST OFFICER" => (
                CrewRole::ReliefFirstOfficer,
                Some(0.0),
                positive(self.sic_rfo_oe.as_deref()),
            ),
            "RF2" | "RC" | "RELIEF CAPTAIN" => (
                CrewRole::ReliefCaptain,
                positive(self.pic_rfo_oe.as_deref()),
                Some(0.0),
            ),
            "" => match upper(self.role.as_deref()).as_str() {
                "PIC" => (
                    CrewRole::Captain,
                    positive(self.pic_oe.as_deref()),
                    Some(0.0),
                ),
                "SIC" => (
                    CrewRole::FirstOfficer,
                    Some(0.0),
                    positive(self.sic_oe.as_deref()),
                ),
                _ => return None,
            },
            _ => return None,
        };
        Some(OeAssignment { role, pic, sic })
    }

    /// The seat or role text, for diagnostics.
    #[must_use]
    pub fn designation(&self) -> String {
        let seat = upper(self.seat.as_deref());
        if seat.is_empty() {
            upper(self.role.as_deref())
        } else {
            seat
        }
    }
}

/// Parse an OE date such as `02DEC2025`.
#[must_use]
pub fn parse_oe_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d%b%Y").ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LegKey {
    flight: String,
    origin: String,
    destination: String,
    date: NaiveDate,
}

/// Indexed OE records.
///
/// Records carrying origin, destination and date are matched on all four
/// fields; every record also answers a lookup by flight number alone, later
/// rows replacing earlier ones.
#[derive(Debug, Clone, Default)]
pub struct OeTable {
    by_leg: HashMap<LegKey, OeRecord>,
    by_flight: HashMap<String, OeRecord>,
    rows: usize,
}

impl OeTable {
    /// Index records.
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = OeRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            let flight = record.flight_key();
            if let (Some(origin), Some(destination), Some(date)) = (
                record.origin.as_deref().filter(|s| !s.trim().is_empty()),
                record.destination.as_deref().filter(|s| !s.trim().is_empty()),
                record.flight_date(),
            ) {
                table.by_leg.insert(
                    LegKey {
                        flight: flight.clone(),
                        origin: origin.trim().to_ascii_uppercase(),
                        destination: destination.trim().to_ascii_uppercase(),
                        date,
                    },
                    record.clone(),
                );
            }
            table.by_flight.insert(flight, record);
            table.rows += 1;
        }
        table
    }

    /// Find the record for a leg, preferring an exact leg match.
    #[must_use]
    pub fn lookup(
        &self,
        flight: &str,
        origin: &str,
        destination: &str,
        date: NaiveDate,
    ) -> Option<&OeRecord> {
        let flight = normalize_flight(flight);
        let key = LegKey {
            flight: flight.clone(),
            origin: origin.trim().to_ascii_uppercase(),
            destination: destination.trim().to_ascii_uppercase(),
            date,
        };
        self.by_leg.get(&key).or_else(|| self.by_flight.get(&flight))
    }

    /// Number of rows indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// True when no rows were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Allocates crew time for the requested position.
#[derive(Debug, Clone, Copy)]
pub struct CrewAllocator<'a> {
    position: CrewPosition,
    oe: Option<&'a OeTable>,
}

impl<'a> CrewAllocator<'a> {
    /// Create an allocator. `oe` is consulted only in auto mode.
    #[must_use]
    pub fn new(position: CrewPosition, oe: Option<&'a OeTable>) -> Self {
        Self { position, oe }
    }

    /// The requested position.
    #[must_use]
    pub fn position(&self) -> CrewPosition {
        self.position
    }

    /// Allocate PIC and SIC hours for one leg.
    ///
    /// # Errors
    ///
    /// In auto mode, returns [`Issue::UnresolvedCrewPosition`] when no OE record
    /// matches and [`Issue::UnrecognizedOeRole`] when the matching record names
    /// no known seat or role.
    pub fn allocate(
        &self,
        flight: &str,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        block_hours: f64,
    ) -> Result<CrewTime, Issue> {
        if let Some(role) = self.position.fixed_role() {
            return Ok(role.allocate(block_hours));
        }

        let record = self
            .oe
            .and_then(|oe| oe.lookup(flight, origin, destination, date))
            .ok_or_else(|| Issue::UnresolvedCrewPosition {
                flight: normalize_flight(flight),
            })?;

        let assignment = record
            .assignment()
            .ok_or_else(|| Issue::UnrecognizedOeRole {
                flight: normalize_flight(flight),
                value: record.designation(),
            })?;

        Ok(assignment.apply(block_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn oe(flight: &str, seat: &str) -> OeRecord {
        OeRecord {
            flight: flight.to_string(),
            seat: Some(seat.to_string()),
            ..OeRecord::default()
        }
    }

    #[test]
    fn test_allocation_table() {
        let captain = allocate(CrewRole::Captain, 2.0);
        assert!((captain.pic - 2.0).abs() < f64::EPSILON);
        assert!(captain.sic.abs() < f64::EPSILON);

        let fo = allocate(CrewRole::FirstOfficer, 2.0);
        assert!(fo.pic.abs() < f64::EPSILON);
        assert!((fo.sic - 2.0).abs() < f64::EPSILON);

        let rc = allocate(CrewRole::ReliefCaptain, 9.0);
        assert!((rc.pic - 4.5).abs() < f64::EPSILON);
        assert!(rc.sic.abs() < f64::EPSILON);

        let rfo = allocate(CrewRole::ReliefFirstOfficer, 9.0);
        assert!(rfo.pic.abs() < f64::EPSILON);
        assert!((rfo.sic - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_position_parse_and_display() {
        assert_eq!("auto".parse::<CrewPosition>().unwrap(), CrewPosition::Auto);
        assert_eq!(
            "Relief-First-Officer".parse::<CrewPosition>().unwrap(),
            CrewPosition::ReliefFirstOfficer
        );
        assert!("navigator".parse::<CrewPosition>().is_err());
        assert_eq!(CrewPosition::FirstOfficer.to_string(), "first_officer");
        assert_eq!(CrewPosition::Auto.to_string(), "auto");
        assert_eq!(CrewPosition::default(), CrewPosition::Captain);
    }

    #[test]
    fn test_normalize_flight() {
        assert_eq!(normalize_flight("12"), "0012");
        assert_eq!(normalize_flight(" 1234 "), "1234");
        assert_eq!(normalize_flight("57.0"), "0057");
    }

    #[test]
    fn test_parse_oe_date() {
        assert_eq!(parse_oe_date("02DEC2025"), Some(date(2025, 12, 2)));
        assert_eq!(parse_oe_date("15jan2024"), Some(date(2024, 1, 15)));
        assert_eq!(parse_oe_date("2025-12-02"), None);
    }

    #[test]
    fn test_seat_assignments() {
        let captain = oe("1", "CAPT").assignment().unwrap();
        assert_eq!(captain.role, CrewRole::Captain);
        assert_eq!(captain.pic, None);

        let mut fo = oe("1", "f/o");
        fo.sic_oe = Some("3.2".to_string());
        let fo = fo.assignment().unwrap();
        assert_eq!(fo.role, CrewRole::FirstOfficer);
        assert_eq!(fo.sic, Some(3.2));
        assert_eq!(fo.pic, Some(0.0));

        assert_eq!(oe("1", "R/FO").assignment().unwrap().role, CrewRole::ReliefFirstOfficer);
        assert_eq!(oe("1", "RF2").assignment().unwrap().role, CrewRole::ReliefCaptain);
        assert!(oe("1", "JUMPSEAT").assignment().is_none());
    }

    #[test]
    fn test_role_column_without_seat() {
        let record = OeRecord {
            flight: "9".to_string(),
            role: Some("sic".to_string()),
            sic_oe: Some("1.5".to_string()),
            ..OeRecord::default()
        };
        let assignment = record.assignment().unwrap();
        assert_eq!(assignment.role, CrewRole::FirstOfficer);
        assert_eq!(assignment.sic, Some(1.5));
    }

    #[test]
    fn test_override_capped_at_block() {
        let assignment = OeAssignment {
            role: CrewRole::Captain,
            pic: Some(5.0),
            sic: Some(0.0),
        };
        let time = assignment.apply(3.0);
        assert!((time.pic - 3.0).abs() < f64::EPSILON);
        assert!(time.sic.abs() < f64::EPSILON);
    }

    #[test]
    fn test_override_on_zero_block_is_zero() {
        let mut record = oe("12", "CAPT");
        record.pic_oe = Some("5.0".to_string());
        let time = record.assignment().unwrap().apply(0.0);
        assert!(time.pic.abs() < f64::EPSILON);
        assert!(time.sic.abs() < f64::EPSILON);
    }

    #[test]
    fn test_relief_override_replaces_half() {
        let mut record = oe("77", "RC");
        record.pic_rfo_oe = Some("2.0".to_string());
        let time = record.assignment().unwrap().apply(10.0);
        assert_eq!(time.role, CrewRole::ReliefCaptain);
        assert!((time.pic - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lookup_prefers_leg_match() {
        let generic = oe("100", "FO");
        let leg = OeRecord {
            origin: Some("MEM".to_string()),
            destination: Some("ANC".to_string()),
            date: Some("02DEC2025".to_string()),
            ..oe("100", "CAPT")
        };
        let table = OeTable::new(vec![leg, generic]);
        assert_eq!(table.len(), 2);

        let exact = table.lookup("100", "mem", "anc", date(2025, 12, 2)).unwrap();
        assert_eq!(exact.seat.as_deref(), Some("CAPT"));

        let other_day = table.lookup("0100", "MEM", "ANC", date(2025, 12, 3)).unwrap();
        assert_eq!(other_day.seat.as_deref(), Some("FO"));

        assert!(table.lookup("200", "MEM", "ANC", date(2025, 12, 2)).is_none());
    }

    #[test]
    fn test_allocator_fixed_position_ignores_oe() {
        let table = OeTable::new(vec![oe("1", "FO")]);
        let allocator = CrewAllocator::new(CrewPosition::Captain, Some(&table));
        let time = allocator.allocate("1", "MEM", "ANC", date(2024, 1, 1), 2.0).unwrap();
        assert_eq!(time.role, CrewRole::Captain);
        assert!((time.pic - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_allocator_auto_uses_oe() {
        let table = OeTable::new(vec![oe("1", "FO")]);
        let allocator = CrewAllocator::new(CrewPosition::Auto, Some(&table));
        let time = allocator.allocate("0001", "MEM", "ANC", date(2024, 1, 1), 2.0).unwrap();
        assert_eq!(time.role, CrewRole::FirstOfficer);
        assert!((time.sic - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_allocator_auto_without_match_is_unresolved() {
        let table = OeTable::new(vec![oe("1", "FO")]);
        let allocator = CrewAllocator::new(CrewPosition::Auto, Some(&table));
        let err = allocator.allocate("2", "MEM", "ANC", date(2024, 1, 1), 2.0).unwrap_err();
        assert_eq!(
            err,
            Issue::UnresolvedCrewPosition {
                flight: "0002".to_string()
            }
        );

        let no_table = CrewAllocator::new(CrewPosition::Auto, None);
        assert!(no_table.allocate("1", "MEM", "ANC", date(2024, 1, 1), 2.0).is_err());
    }

    #[test]
    fn test_allocator_auto_unrecognized_seat() {
        let table = OeTable::new(vec![oe("1", "JUMPSEAT")]);
        let allocator = CrewAllocator::new(CrewPosition::Auto, Some(&table));
        let err = allocator.allocate("1", "MEM", "ANC", date(2024, 1, 1), 2.0).unwrap_err();
        assert!(matches!(err, Issue::UnrecognizedOeRole { ref value, .. } if value == "JUMPSEAT"));
        assert!(err.is_fatal());
    }
}
