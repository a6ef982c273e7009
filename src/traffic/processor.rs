use std::collections::HashSet;

use tracing::trace;

use crate::delta::{supported, DeltaCounter};
use crate::error::ReadingError;
use crate::monitor::processor::unexpected;
use crate::monitor::{Emission, SignalProcessor};
use crate::observation::{ConnectionType, EventKind, Payload, TrafficObservation};
use crate::reading::{AppCounters, CounterSnapshot, InterfaceCounters, RawReading, TcpCounters};

const KINDS: &[EventKind] = &[EventKind::TrafficMobile, EventKind::TrafficWifi, EventKind::TrafficApplication];

/// Which counter stream a baseline belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope {
    Mobile,
    Wifi,
    App(u32),
    /// Wifi rx bytes as seen by the application kind.
    WifiProbe,
}

impl Scope {
    const fn kind(self) -> EventKind {
        match self {
            Self::Mobile => EventKind::TrafficMobile,
            Self::Wifi => EventKind::TrafficWifi,
            Self::App(_) | Self::WifiProbe => EventKind::TrafficApplication,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Stat {
    RxBytes,
    TxBytes,
    RxPackets,
    TxPackets,
    TcpRxBytes,
    TcpTxBytes,
    TcpRxSegments,
    TcpTxSegments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CounterKey {
    scope: Scope,
    stat: Stat,
}

/// Converts counter snapshots into per-interval traffic.
///
/// Every interface kind and every application uid keeps its own baselines,
/// so kinds sampled at different rates never disturb each other.
#[derive(Debug, Default)]
pub struct TrafficProcessor {
    deltas: DeltaCounter<CounterKey>,
}

impl TrafficProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn delta(&mut self, scope: Scope, stat: Stat, value: i64) -> i64 {
        self.deltas.delta(CounterKey { scope, stat }, value)
    }

    fn optional_delta(&mut self, scope: Scope, stat: Stat, value: i64) -> Option<i64> {
        supported(value).map(|v| self.delta(scope, stat, v))
    }

    fn interface(
        &mut self,
        scope: Scope,
        network: ConnectionType,
        counters: InterfaceCounters,
        tcp: TcpCounters,
    ) -> Result<TrafficObservation, ReadingError> {
        let (rx_name, tx_name) = match scope {
            Scope::Mobile => ("mobile_rx_bytes", "mobile_tx_bytes"),
            _ => ("wifi_rx_bytes", "wifi_tx_bytes"),
        };
        let rx = supported(counters.rx_bytes).ok_or(ReadingError::Unsupported { counter: rx_name })?;
        let tx = supported(counters.tx_bytes).ok_or(ReadingError::Unsupported { counter: tx_name })?;

        let rx_bytes = self.delta(scope, Stat::RxBytes, rx);
        let tx_bytes = self.delta(scope, Stat::TxBytes, tx);
        let rx_packets = self.optional_delta(scope, Stat::RxPackets, counters.rx_packets);
        let tx_packets = self.optional_delta(scope, Stat::TxPackets, counters.tx_packets);

        // TCP counters are device-wide; wifi and mobile traffic are exclusive,
        // so the growth belongs to this interface only when it received data.
        let owned = |d: i64| if rx_bytes > 0 { d } else { 0 };
        let (tcp_rx_bytes, tcp_tx_bytes) = if supported(tcp.rx_bytes).is_some() {
            (
                self.optional_delta(scope, Stat::TcpRxBytes, tcp.rx_bytes).map(owned),
                self.optional_delta(scope, Stat::TcpTxBytes, tcp.tx_bytes).map(owned),
            )
        } else {
            (None, None)
        };
        let (tcp_rx_segments, tcp_tx_segments) = if supported(tcp.rx_segments).is_some() {
            (
                self.optional_delta(scope, Stat::TcpRxSegments, tcp.rx_segments).map(owned),
                self.optional_delta(scope, Stat::TcpTxSegments, tcp.tx_segments).map(owned),
            )
        } else {
            (None, None)
        };

        Ok(TrafficObservation {
            network,
            rx_bytes,
            tx_bytes,
            rx_packets,
            tx_packets,
            tcp_rx_bytes,
            tcp_tx_bytes,
            tcp_rx_segments,
            tcp_tx_segments,
            app_uid: None,
        })
    }

    fn application(&mut self, snapshot: &CounterSnapshot) -> Vec<Emission> {
        let wifi_grew = supported(snapshot.wifi().rx_bytes)
            .is_some_and(|rx| self.delta(Scope::WifiProbe, Stat::RxBytes, rx) > 0);
        let network = if wifi_grew {
            ConnectionType::Wifi
        } else {
            ConnectionType::Mobile
        };

        let present: HashSet<u32> = snapshot.apps.iter().map(|app| app.uid).collect();
        self.deltas.retain(|key| match key.scope {
            Scope::App(uid) => present.contains(&uid),
            _ => true,
        });

        snapshot
            .apps
            .iter()
            .filter_map(|app| self.app(network, app))
            .map(|record| Emission::new(EventKind::TrafficApplication, Payload::Traffic(record)))
            .collect()
    }

    fn app(&mut self, network: ConnectionType, app: &AppCounters) -> Option<TrafficObservation> {
        let scope = Scope::App(app.uid);
        let (Some(rx), Some(tx)) = (supported(app.rx_bytes), supported(app.tx_bytes)) else {
            trace!(uid = app.uid, "Application byte counters unsupported");
            return None;
        };
        let rx_bytes = self.delta(scope, Stat::RxBytes, rx);
        let tx_bytes = self.delta(scope, Stat::TxBytes, tx);
        let rx_packets = self.optional_delta(scope, Stat::RxPackets, app.rx_packets);
        let tx_packets = self.optional_delta(scope, Stat::TxPackets, app.tx_packets);
        if rx_bytes <= 0 && tx_bytes <= 0 {
            return None;
        }

        Some(TrafficObservation {
            rx_packets,
            tx_packets,
            app_uid: Some(app.uid),
            ..TrafficObservation::bytes(network, rx_bytes, tx_bytes)
        })
    }
}

impl SignalProcessor for TrafficProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        KINDS
    }

    fn reset(&mut self, kind: EventKind) {
        self.deltas.retain(|key| key.scope.kind() != kind);
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        let snapshot = match reading {
            RawReading::Counters(snapshot) => snapshot,
            other => return Err(unexpected(kind, &other)),
        };
        let record = match kind {
            EventKind::TrafficMobile => {
                self.interface(Scope::Mobile, ConnectionType::Mobile, snapshot.mobile, snapshot.tcp)?
            }
            EventKind::TrafficWifi => {
                self.interface(Scope::Wifi, ConnectionType::Wifi, snapshot.wifi(), snapshot.tcp)?
            }
            EventKind::TrafficApplication => return Ok(self.application(&snapshot)),
            _ => return Err(unexpected(kind, &RawReading::Counters(snapshot))),
        };
        Ok(vec![Emission::new(kind, Payload::Traffic(record))])
    }
}
