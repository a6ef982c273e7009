//! Typed payloads carried by observations.

use serde::{Deserialize, Serialize};

use crate::sample::Sample;

use super::constants::{
    AirplaneModeState, ConnectionType, DeviceBootState, LocationState, NetworkState, NetworkType,
    ScreenState, ServiceState, SimState, StateType, TelephonyStandard,
};

/// Location provider that produced a fix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Gps,
    Network,
    Passive,
    Other(String),
}

impl Provider {
    /// Maps a platform provider name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "gps" => Self::Gps,
            "network" => Self::Network,
            "passive" => Self::Passive,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Gps => "gps",
            Self::Network => "network",
            Self::Passive => "passive",
            Self::Other(name) => name,
        }
    }
}

/// Best known position at the time of the observation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationObservation {
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: f32,
    pub speed: f32,
    pub altitude: f64,
    pub provider: Provider,
    /// Radius of 68% confidence, in meters.
    pub accuracy: f32,
}

/// Per-interval traffic of one interface or one application.
///
/// Optional fields are absent when the platform does not support the
/// underlying counter.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficObservation {
    pub network: ConnectionType,
    pub rx_bytes: i64,
    pub tx_bytes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_packets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_packets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_rx_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_tx_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_rx_segments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_tx_segments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_uid: Option<u32>,
}

impl TrafficObservation {
    /// Record with byte counts only.
    #[must_use]
    pub const fn bytes(network: ConnectionType, rx_bytes: i64, tx_bytes: i64) -> Self {
        Self {
            network,
            rx_bytes,
            tx_bytes,
            rx_packets: None,
            tx_packets: None,
            tcp_rx_bytes: None,
            tcp_tx_bytes: None,
            tcp_rx_segments: None,
            tcp_tx_segments: None,
            app_uid: None,
        }
    }
}

/// A neighboring GSM cell.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborCell {
    pub cid: i32,
    pub lac: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength_dbm: Option<i32>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsmCell {
    pub cid: i32,
    pub lac: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psc: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighbors: Vec<NeighborCell>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdmaCell {
    pub base_station_id: i32,
    pub base_latitude: i32,
    pub base_longitude: i32,
    pub network_id: i32,
    pub system_id: i32,
}

/// Serving cell identity.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum CellIdentity {
    Gsm(GsmCell),
    Cdma(CdmaCell),
}

/// Running signal statistics of the serving cell, in dBm unless noted.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum SignalSamples {
    Gsm {
        strength: Sample,
        /// Bit error rate as a fraction.
        ber: Sample,
    },
    Cdma {
        strength: Sample,
        ecio: Sample,
        evdo_dbm: Sample,
        evdo_ecio: Sample,
        evdo_snr: Sample,
    },
}

impl SignalSamples {
    /// Empty samples for a standard.
    #[must_use]
    pub const fn empty(standard: TelephonyStandard) -> Self {
        match standard {
            TelephonyStandard::Gsm => Self::Gsm {
                strength: Sample::new(),
                ber: Sample::new(),
            },
            TelephonyStandard::Cdma => Self::Cdma {
                strength: Sample::new(),
                ecio: Sample::new(),
                evdo_dbm: Sample::new(),
                evdo_ecio: Sample::new(),
                evdo_snr: Sample::new(),
            },
        }
    }

    #[must_use]
    pub const fn strength(&self) -> &Sample {
        match self {
            Self::Gsm { strength, .. } | Self::Cdma { strength, .. } => strength,
        }
    }
}

/// Serving cell and signal of the mobile radio.
///
/// The signal samples are a snapshot taken when the observation was built;
/// later signal readings produce new observations.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelephonyObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcc: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnc: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<NetworkType>,
    pub cell: CellIdentity,
    pub signal: SignalSamples,
}

impl TelephonyObservation {
    #[must_use]
    pub const fn standard(&self) -> TelephonyStandard {
        match self.cell {
            CellIdentity::Gsm(_) => TelephonyStandard::Gsm,
            CellIdentity::Cdma(_) => TelephonyStandard::Cdma,
        }
    }

    #[must_use]
    pub const fn signal_strength(&self) -> &Sample {
        self.signal.strength()
    }

    /// Neighboring cells; always empty on CDMA.
    #[must_use]
    pub fn neighbors(&self) -> &[NeighborCell] {
        match &self.cell {
            CellIdentity::Gsm(gsm) => &gsm.neighbors,
            CellIdentity::Cdma(_) => &[],
        }
    }
}

/// A discrete state transition of the device.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateChange {
    pub state_type: StateType,
    /// Code of the state-type specific enum.
    pub state: i32,
}

impl StateChange {
    #[must_use]
    pub const fn sim(state: SimState) -> Self {
        Self {
            state_type: StateType::Sim,
            state: state.value(),
        }
    }

    #[must_use]
    pub const fn service(state: ServiceState) -> Self {
        Self {
            state_type: StateType::Service,
            state: state.value(),
        }
    }

    #[must_use]
    pub const fn airplane_mode(state: AirplaneModeState) -> Self {
        Self {
            state_type: StateType::AirplaneMode,
            state: state.value(),
        }
    }

    #[must_use]
    pub const fn location(state: LocationState) -> Self {
        Self {
            state_type: StateType::Location,
            state: state.value(),
        }
    }

    #[must_use]
    pub const fn screen(state: ScreenState) -> Self {
        Self {
            state_type: StateType::Screen,
            state: state.value(),
        }
    }

    #[must_use]
    pub const fn device_boot(state: DeviceBootState) -> Self {
        Self {
            state_type: StateType::DeviceBoot,
            state: state.value(),
        }
    }
}

/// Acceleration in the device coordinate system, in m/s².
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerObservation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub accuracy: i32,
}

/// Transitions detected since the previous connectivity reading.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityChanges {
    pub connected_to_wifi: bool,
    pub connected_to_mobile: bool,
    pub started_roaming: bool,
    /// Whether data is usable while roaming; meaningful when `started_roaming` is set.
    pub data_roaming_enabled: bool,
}

impl ConnectivityChanges {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.connected_to_wifi || self.connected_to_mobile || self.started_roaming
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityObservation {
    pub connected: bool,
    pub available: bool,
    pub roaming: bool,
    pub connection_type: ConnectionType,
    pub detailed_state: NetworkState,
    #[serde(default)]
    pub changes: ConnectivityChanges,
}
