//! Active network status and the transitions between networks.

use tracing::debug;

use crate::error::ReadingError;
use crate::monitor::processor::unexpected;
use crate::monitor::{Emission, SignalProcessor};
use crate::observation::{
    ConnectionType, ConnectivityChanges, ConnectivityObservation, EventKind, Payload,
};
use crate::reading::{ConnectivityReading, RawReading};

const KINDS: &[EventKind] = &[EventKind::Connectivity];

/// Publishes every connectivity reading, annotated with the transitions it
/// completes.
///
/// A switch to wifi or mobile is reported on the first reading where the new
/// network is both connected and available, which may come several readings
/// after the switch itself. A roaming start is reported on the first non-wifi
/// reading after roaming went from false to true.
#[derive(Debug, Default)]
pub struct ConnectivityProcessor {
    previous: Option<ConnectivityReading>,
    switch_pending: bool,
    roaming_pending: bool,
}

impl ConnectivityProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn on_reading(&mut self, reading: ConnectivityReading) -> ConnectivityObservation {
        let current = reading.connection_type;
        match self.previous {
            Some(previous) => {
                let old = previous.connection_type;
                if (old != ConnectionType::Wifi && current == ConnectionType::Wifi)
                    || (!old.is_mobile() && current.is_mobile())
                {
                    debug!(from = ?old, to = ?current, "Network switch");
                    self.switch_pending = true;
                }
                if !previous.roaming && reading.roaming {
                    self.roaming_pending = true;
                }
            }
            None => {
                self.switch_pending = current == ConnectionType::Wifi || current.is_mobile();
                self.roaming_pending = reading.roaming;
            }
        }

        let mut changes = ConnectivityChanges::default();
        let usable = reading.connected && reading.available;
        if self.switch_pending && usable {
            changes.connected_to_mobile = current.is_mobile();
            changes.connected_to_wifi = current == ConnectionType::Wifi;
            self.switch_pending = false;
        }
        if self.roaming_pending && current != ConnectionType::Wifi {
            changes.started_roaming = true;
            changes.data_roaming_enabled = usable;
            self.roaming_pending = false;
        }

        self.previous = Some(reading);
        ConnectivityObservation {
            connected: reading.connected,
            available: reading.available,
            roaming: reading.roaming,
            connection_type: current,
            detailed_state: reading.detailed_state,
            changes,
        }
    }
}

impl SignalProcessor for ConnectivityProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        KINDS
    }

    fn reset(&mut self, _kind: EventKind) {
        *self = Self::default();
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        match reading {
            RawReading::Connectivity(reading) => Ok(vec![Emission::new(
                EventKind::Connectivity,
                Payload::Connectivity(self.on_reading(reading)),
            )]),
            other => Err(unexpected(kind, &other)),
        }
    }
}
