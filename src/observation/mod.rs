//! Observation model: event kinds and the typed values delivered to listeners.

mod constants;
mod records;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use constants::{
    AirplaneModeState, ConnectionType, DeviceBootState, LocationState, NetworkState, NetworkType,
    ScreenState, SensorDelay, ServiceState, SimState, StateType, TelephonyStandard,
};
pub use records::{
    AccelerometerObservation, CdmaCell, CellIdentity, ConnectivityChanges, ConnectivityObservation,
    GsmCell, LocationObservation, NeighborCell, Provider, SignalSamples, StateChange,
    TelephonyObservation, TrafficObservation,
};

/// A signal kind a monitor can activate independently.
///
/// Each kind has a distinct bit so several kinds can be addressed with one mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connectivity,
    TrafficMobile,
    TrafficWifi,
    TrafficApplication,
    Telephony,
    Screen,
    LocationGps,
    LocationNetwork,
    Device,
    Accelerometer,
}

impl EventKind {
    /// Every kind, in bit order.
    pub const ALL_KINDS: [Self; 10] = [
        Self::Connectivity,
        Self::TrafficMobile,
        Self::TrafficWifi,
        Self::TrafficApplication,
        Self::Telephony,
        Self::Screen,
        Self::LocationGps,
        Self::LocationNetwork,
        Self::Device,
        Self::Accelerometer,
    ];

    /// Mask of the three traffic kinds.
    pub const TRAFFIC: u32 = Self::TrafficMobile.bit() | Self::TrafficWifi.bit() | Self::TrafficApplication.bit();

    /// Mask of both location channels.
    pub const LOCATION: u32 = Self::LocationGps.bit() | Self::LocationNetwork.bit();

    /// Mask of every kind.
    pub const ALL: u32 = Self::Connectivity.bit()
        | Self::TRAFFIC
        | Self::Telephony.bit()
        | Self::Screen.bit()
        | Self::LOCATION
        | Self::Device.bit()
        | Self::Accelerometer.bit();

    /// The kind's bit.
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Connectivity => 1,
            Self::TrafficMobile => 2,
            Self::TrafficWifi => 4,
            Self::TrafficApplication => 8,
            Self::Telephony => 16,
            Self::Screen => 32,
            Self::LocationGps => 64,
            Self::LocationNetwork => 128,
            Self::Device => 256,
            Self::Accelerometer => 512,
        }
    }

    /// Kinds whose bits are set in `mask`. Unknown bits are ignored.
    #[must_use]
    pub fn from_mask(mask: u32) -> Vec<Self> {
        Self::ALL_KINDS.iter().copied().filter(|kind| mask & kind.bit() != 0).collect()
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::TrafficMobile => "traffic_mobile",
            Self::TrafficWifi => "traffic_wifi",
            Self::TrafficApplication => "traffic_application",
            Self::Telephony => "telephony",
            Self::Screen => "screen",
            Self::LocationGps => "location_gps",
            Self::LocationNetwork => "location_network",
            Self::Device => "device",
            Self::Accelerometer => "accelerometer",
        }
    }

    #[must_use]
    pub const fn is_traffic(self) -> bool {
        Self::TRAFFIC & self.bit() != 0
    }

    #[must_use]
    pub const fn is_location(self) -> bool {
        Self::LOCATION & self.bit() != 0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The typed value of an observation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Location(LocationObservation),
    Traffic(TrafficObservation),
    Telephony(TelephonyObservation),
    StateChange(StateChange),
    Accelerometer(AccelerometerObservation),
    Connectivity(ConnectivityObservation),
}

impl Payload {
    /// Variant name, used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Location(_) => "location",
            Self::Traffic(_) => "traffic",
            Self::Telephony(_) => "telephony",
            Self::StateChange(_) => "state_change",
            Self::Accelerometer(_) => "accelerometer",
            Self::Connectivity(_) => "connectivity",
        }
    }
}

/// An immutable, timestamped observation of one event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Kind the observation was published on.
    pub kind: EventKind,
    /// Milliseconds since the Unix epoch, from the monitor's clock.
    pub timestamp_ms: i64,
    /// Typed value.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Observation {
    #[must_use]
    pub const fn new(kind: EventKind, timestamp_ms: i64, payload: Payload) -> Self {
        Self {
            kind,
            timestamp_ms,
            payload,
        }
    }

    #[must_use]
    pub const fn as_location(&self) -> Option<&LocationObservation> {
        match &self.payload {
            Payload::Location(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_traffic(&self) -> Option<&TrafficObservation> {
        match &self.payload {
            Payload::Traffic(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_telephony(&self) -> Option<&TelephonyObservation> {
        match &self.payload {
            Payload::Telephony(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_state_change(&self) -> Option<&StateChange> {
        match &self.payload {
            Payload::StateChange(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_accelerometer(&self) -> Option<&AccelerometerObservation> {
        match &self.payload {
            Payload::Accelerometer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_connectivity(&self) -> Option<&ConnectivityObservation> {
        match &self.payload {
            Payload::Connectivity(v) => Some(v),
            _ => None,
        }
    }
}
