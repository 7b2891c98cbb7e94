//! `flightlog` - Airline flight activity to pilot logbook conversion
//!
//! This library derives the logbook values an airline activity export does not
//! carry: night time from sun positions along the route, day and night landings
//! against local civil twilight, and PIC/SIC time from the crew position flown.
//! Each flight row is transformed independently against read-only airport and
//! OE reference data, so batches run in parallel while keeping input order.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airport;
pub mod cli;
pub mod config;
pub mod crew;
pub mod error;
pub mod io;
pub mod landing;
pub mod logging;
pub mod night;
pub mod record;
pub mod sun;
pub mod time;
pub mod transform;

pub use airport::{AirportInfo, AirportResolver};
pub use config::Config;
pub use crew::{CrewPosition, CrewRole, OeTable};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{FlightRecord, OutputRecord};
pub use transform::{BatchReport, Diagnostic, RowTransformer, TransformSettings};
