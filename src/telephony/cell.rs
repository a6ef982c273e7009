//! Radio report conversions: operator codes, neighbor lists, signal units.

use crate::observation::{CellIdentity, GsmCell, NeighborCell};
use crate::reading::{RawCell, RawNeighbor};

/// ASU value meaning "signal unknown".
pub const UNKNOWN_ASU: i32 = 99;

/// Cell id or area code meaning "unknown".
pub const UNKNOWN_CELL_ID: i32 = -1;

/// RXQUAL index to bit error rate in percent (3GPP TS 45.008, 8.2.4).
const RXQUAL_BER_PERCENT: [f64; 8] = [0.14, 0.28, 0.57, 1.13, 2.26, 4.53, 9.05, 18.10];

/// Highest ASU a GSM radio reports (-51 dBm or stronger).
pub const MAX_ASU: i32 = 31;

/// Converts a GSM ASU reading to dBm, `None` when unknown or out of range.
#[must_use]
pub const fn asu_to_dbm(asu: i32) -> Option<i32> {
    match asu {
        0..=MAX_ASU => Some(2 * asu - 113),
        _ => None,
    }
}

/// Converts an RXQUAL index to a bit error rate fraction.
///
/// Devices report values outside `0..=7`; those yield `None`.
#[must_use]
pub fn rxqual_to_ber(index: i32) -> Option<f64> {
    usize::try_from(index)
        .ok()
        .and_then(|i| RXQUAL_BER_PERCENT.get(i))
        .map(|percent| percent / 100.0)
}

/// Splits an operator code into MCC (first three digits) and MNC (the rest).
///
/// Each part parses independently; a short or non-numeric code leaves the
/// affected part empty.
#[must_use]
pub fn parse_operator(operator: &str) -> (Option<u16>, Option<u16>) {
    let operator = operator.trim();
    let mcc = operator.get(..3).and_then(|s| s.parse().ok());
    let mnc = operator.get(3..).filter(|s| !s.is_empty()).and_then(|s| s.parse().ok());
    (mcc, mnc)
}

fn neighbor(raw: &RawNeighbor) -> Option<NeighborCell> {
    if raw.cid == UNKNOWN_CELL_ID || raw.lac == UNKNOWN_CELL_ID {
        return None;
    }
    Some(NeighborCell {
        cid: raw.cid,
        lac: raw.lac,
        psc: (raw.psc != UNKNOWN_CELL_ID).then_some(raw.psc),
        signal_strength_dbm: asu_to_dbm(raw.rssi),
    })
}

/// Builds the serving cell identity, discarding neighbors without a cell id
/// or area code.
#[must_use]
pub fn cell_identity(raw: &RawCell) -> CellIdentity {
    match raw {
        RawCell::Gsm {
            cid,
            lac,
            psc,
            neighbors,
        } => CellIdentity::Gsm(GsmCell {
            cid: *cid,
            lac: *lac,
            psc: (*psc != UNKNOWN_CELL_ID).then_some(*psc),
            neighbors: neighbors.iter().filter_map(neighbor).collect(),
        }),
        RawCell::Cdma(cdma) => CellIdentity::Cdma(cdma.clone()),
    }
}
