//! Mobile radio: serving cell, signal statistics, SIM, service and airplane
//! mode state.

/// Unit and identity conversions of radio reports.
pub mod cell;
mod processor;

pub use cell::{asu_to_dbm, parse_operator, rxqual_to_ber};
pub use processor::TelephonyProcessor;
