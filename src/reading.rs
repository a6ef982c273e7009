//! Raw readings pushed into a monitor by signal sources.
//!
//! Readings mirror what the platform reports, sentinels included: counters
//! use `-1` for unsupported, ASU values use `99` for unknown, cell ids use
//! `-1` for unknown. Conversion into observations happens in the processors.

use serde::{Deserialize, Serialize};

use crate::delta::UNSUPPORTED;
use crate::location::Fix;
use crate::observation::{
    CdmaCell, ConnectionType, NetworkState, NetworkType, Provider, ServiceState, SimState,
};

/// A raw reading for one event kind.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawReading {
    Accelerometer(AccelerometerReading),
    Location(LocationReading),
    ProviderEvent(ProviderEvent),
    Counters(CounterSnapshot),
    CellLocation(CellLocationReading),
    SignalStrength(SignalReading),
    DataConnection(DataConnectionReading),
    ServiceState(ServiceStateReading),
    AirplaneMode(AirplaneModeReading),
    Connectivity(ConnectivityReading),
    Broadcast(BroadcastReading),
}

impl RawReading {
    /// Variant name, used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Accelerometer(_) => "accelerometer",
            Self::Location(_) => "location",
            Self::ProviderEvent(_) => "provider_event",
            Self::Counters(_) => "counters",
            Self::CellLocation(_) => "cell_location",
            Self::SignalStrength(_) => "signal_strength",
            Self::DataConnection(_) => "data_connection",
            Self::ServiceState(_) => "service_state",
            Self::AirplaneMode(_) => "airplane_mode",
            Self::Connectivity(_) => "connectivity",
            Self::Broadcast(_) => "broadcast",
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub accuracy: i32,
}

/// A new fix, plus the platform's last known fix of each provider when available.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub fix: Fix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_gps: Option<Fix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_network: Option<Fix>,
}

impl LocationReading {
    #[must_use]
    pub const fn new(fix: Fix) -> Self {
        Self {
            fix,
            last_known_gps: None,
            last_known_network: None,
        }
    }
}

/// Provider status notifications.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    Enabled { provider: Provider },
    Disabled { provider: Provider },
    Available { provider: Provider },
    GpsStarted,
    GpsStopped,
}

/// Counters of one network interface. `-1` marks an unsupported counter.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    #[serde(default = "unsupported")]
    pub rx_bytes: i64,
    #[serde(default = "unsupported")]
    pub tx_bytes: i64,
    #[serde(default = "unsupported")]
    pub rx_packets: i64,
    #[serde(default = "unsupported")]
    pub tx_packets: i64,
}

impl InterfaceCounters {
    /// Counters with bytes only; packet counters unsupported.
    #[must_use]
    pub const fn bytes(rx_bytes: i64, tx_bytes: i64) -> Self {
        Self {
            rx_bytes,
            tx_bytes,
            rx_packets: UNSUPPORTED,
            tx_packets: UNSUPPORTED,
        }
    }

    /// Field-wise difference; unsupported if either side is.
    #[must_use]
    pub const fn minus(&self, other: &Self) -> Self {
        Self {
            rx_bytes: sub_counter(self.rx_bytes, other.rx_bytes),
            tx_bytes: sub_counter(self.tx_bytes, other.tx_bytes),
            rx_packets: sub_counter(self.rx_packets, other.rx_packets),
            tx_packets: sub_counter(self.tx_packets, other.tx_packets),
        }
    }
}

impl Default for InterfaceCounters {
    fn default() -> Self {
        Self {
            rx_bytes: UNSUPPORTED,
            tx_bytes: UNSUPPORTED,
            rx_packets: UNSUPPORTED,
            tx_packets: UNSUPPORTED,
        }
    }
}

/// Device-wide TCP counters. `-1` marks an unsupported counter.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpCounters {
    #[serde(default = "unsupported")]
    pub rx_bytes: i64,
    #[serde(default = "unsupported")]
    pub tx_bytes: i64,
    #[serde(default = "unsupported")]
    pub rx_segments: i64,
    #[serde(default = "unsupported")]
    pub tx_segments: i64,
}

impl Default for TcpCounters {
    fn default() -> Self {
        Self {
            rx_bytes: UNSUPPORTED,
            tx_bytes: UNSUPPORTED,
            rx_segments: UNSUPPORTED,
            tx_segments: UNSUPPORTED,
        }
    }
}

/// Counters attributed to one application uid.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCounters {
    pub uid: u32,
    #[serde(default = "unsupported")]
    pub rx_bytes: i64,
    #[serde(default = "unsupported")]
    pub tx_bytes: i64,
    #[serde(default = "unsupported")]
    pub rx_packets: i64,
    #[serde(default = "unsupported")]
    pub tx_packets: i64,
}

/// One sampling of every traffic counter the platform exposes.
///
/// `total` covers all interfaces; wifi traffic is `total - mobile`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    #[serde(default)]
    pub mobile: InterfaceCounters,
    #[serde(default)]
    pub total: InterfaceCounters,
    #[serde(default)]
    pub tcp: TcpCounters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<AppCounters>,
}

impl CounterSnapshot {
    /// Wifi interface counters derived from total and mobile.
    #[must_use]
    pub const fn wifi(&self) -> InterfaceCounters {
        self.total.minus(&self.mobile)
    }
}

/// A neighboring cell as reported by the radio.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNeighbor {
    pub cid: i32,
    pub lac: i32,
    #[serde(default = "unknown_i32")]
    pub psc: i32,
    /// Signal in ASU; `99` when unknown.
    pub rssi: i32,
}

/// Serving cell as reported by the radio.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum RawCell {
    Gsm {
        cid: i32,
        lac: i32,
        #[serde(default = "unknown_i32")]
        psc: i32,
        #[serde(default)]
        neighbors: Vec<RawNeighbor>,
    },
    Cdma(CdmaCell),
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLocationReading {
    pub cell: RawCell,
    /// Operator code, MCC followed by MNC (e.g. `"73001"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

/// Signal strength report of the serving cell.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum SignalReading {
    /// Strength already expressed in dBm.
    Dbm { dbm: i32 },
    /// GSM strength in ASU (`99` unknown) and RXQUAL bit error index (`0..=7`).
    Gsm { asu: i32, ber: i32 },
    Cdma {
        cdma_dbm: i32,
        cdma_ecio: i32,
        evdo_dbm: i32,
        evdo_ecio: i32,
        evdo_snr: i32,
    },
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConnectionReading {
    pub network_type: NetworkType,
    pub sim_state: SimState,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStateReading {
    pub service_state: ServiceState,
    pub sim_state: SimState,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirplaneModeReading {
    pub enabled: bool,
}

/// Active network status. With no active network the platform reports
/// `connected = false, available = false` and the roaming flag alone.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReading {
    pub connected: bool,
    pub available: bool,
    pub roaming: bool,
    #[serde(default = "other_connection")]
    pub connection_type: ConnectionType,
    #[serde(default = "unknown_network_state")]
    pub detailed_state: NetworkState,
}

/// A system broadcast relevant to the screen and device kinds.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BroadcastReading {
    pub action: BroadcastAction,
}

impl BroadcastReading {
    #[must_use]
    pub const fn new(action: BroadcastAction) -> Self {
        Self { action }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastAction {
    ScreenOn,
    ScreenOff,
    /// Screen turned off with the keyguard engaged.
    ScreenLocked,
    UserPresent,
    BootCompleted,
    Shutdown,
}

const fn unsupported() -> i64 {
    UNSUPPORTED
}

const fn unknown_i32() -> i32 {
    -1
}

const fn other_connection() -> ConnectionType {
    ConnectionType::Other
}

const fn unknown_network_state() -> NetworkState {
    NetworkState::Unknown
}

const fn sub_counter(a: i64, b: i64) -> i64 {
    if a < 0 || b < 0 {
        UNSUPPORTED
    } else {
        a - b
    }
}
