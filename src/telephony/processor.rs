use tracing::trace;

use crate::error::ReadingError;
use crate::monitor::processor::unexpected;
use crate::monitor::{Emission, SignalProcessor};
use crate::observation::{
    AirplaneModeState, CellIdentity, EventKind, NetworkType, Payload, SignalSamples, SimState,
    StateChange, TelephonyObservation, TelephonyStandard,
};
use crate::reading::{CellLocationReading, RawReading, SignalReading};

use super::cell::{asu_to_dbm, cell_identity, parse_operator, rxqual_to_ber};

const KINDS: &[EventKind] = &[EventKind::Telephony];

/// Serving cell with its live signal samples.
#[derive(Debug, Clone)]
struct ServingCell {
    mcc: Option<u16>,
    mnc: Option<u16>,
    cell: CellIdentity,
    signal: SignalSamples,
}

impl ServingCell {
    const fn standard(&self) -> TelephonyStandard {
        standard_of(&self.cell)
    }
}

const fn standard_of(cell: &CellIdentity) -> TelephonyStandard {
    match cell {
        CellIdentity::Gsm(_) => TelephonyStandard::Gsm,
        CellIdentity::Cdma(_) => TelephonyStandard::Cdma,
    }
}

const fn standard_name(standard: TelephonyStandard) -> &'static str {
    match standard {
        TelephonyStandard::Gsm => "gsm",
        TelephonyStandard::Cdma => "cdma",
    }
}

/// Tracks the serving cell, its signal statistics and the SIM and service
/// state of the mobile radio.
///
/// Samples live here only. Every telephony observation carries a copy taken
/// when it was built, so a published observation never changes afterwards.
#[derive(Debug, Default)]
pub struct TelephonyProcessor {
    serving: Option<ServingCell>,
    network_type: Option<NetworkType>,
    sim: Option<SimState>,
}

impl TelephonyProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last SIM state seen, if any since the last reset.
    #[must_use]
    pub const fn sim_state(&self) -> Option<SimState> {
        self.sim
    }

    #[must_use]
    pub const fn network_type(&self) -> Option<NetworkType> {
        self.network_type
    }

    fn snapshot(&self) -> Option<Emission> {
        self.serving.as_ref().map(|serving| {
            Emission::new(
                EventKind::Telephony,
                Payload::Telephony(TelephonyObservation {
                    mcc: serving.mcc,
                    mnc: serving.mnc,
                    network_type: self.network_type,
                    cell: serving.cell.clone(),
                    signal: serving.signal,
                }),
            )
        })
    }

    fn check_sim(&mut self, sim: SimState, out: &mut Vec<Emission>) {
        if self.sim != Some(sim) {
            self.sim = Some(sim);
            out.push(Emission::new(EventKind::Telephony, Payload::StateChange(StateChange::sim(sim))));
        }
    }

    fn on_cell(&mut self, reading: &CellLocationReading) -> Vec<Emission> {
        let cell = cell_identity(&reading.cell);
        let (mcc, mnc) = reading.operator.as_deref().map_or((None, None), parse_operator);
        let standard = standard_of(&cell);
        self.serving = Some(ServingCell {
            mcc,
            mnc,
            cell,
            signal: SignalSamples::empty(standard),
        });
        self.snapshot().into_iter().collect()
    }

    fn on_signal(&mut self, reading: SignalReading) -> Result<Vec<Emission>, ReadingError> {
        let Some(serving) = self.serving.as_mut() else {
            trace!("Signal strength before any cell location; ignored");
            return Ok(Vec::new());
        };
        let standard = serving.standard();

        let changed = match (reading, &mut serving.signal) {
            (SignalReading::Dbm { dbm }, signal) => {
                match signal {
                    SignalSamples::Gsm { strength, .. } | SignalSamples::Cdma { strength, .. } => {
                        strength.update(f64::from(dbm));
                    }
                }
                true
            }
            (SignalReading::Gsm { asu, ber: index }, SignalSamples::Gsm { strength, ber }) => {
                let dbm = asu_to_dbm(asu);
                let rate = rxqual_to_ber(index);
                if let Some(dbm) = dbm {
                    strength.update(f64::from(dbm));
                }
                if let Some(rate) = rate {
                    ber.update(rate);
                }
                dbm.is_some() || rate.is_some()
            }
            (
                SignalReading::Cdma {
                    cdma_dbm,
                    cdma_ecio,
                    evdo_dbm,
                    evdo_ecio,
                    evdo_snr,
                },
                SignalSamples::Cdma {
                    strength,
                    ecio,
                    evdo_dbm: evdo_dbm_sample,
                    evdo_ecio: evdo_ecio_sample,
                    evdo_snr: evdo_snr_sample,
                },
            ) => {
                strength.update(f64::from(cdma_dbm));
                ecio.update(f64::from(cdma_ecio));
                evdo_dbm_sample.update(f64::from(evdo_dbm));
                evdo_ecio_sample.update(f64::from(evdo_ecio));
                evdo_snr_sample.update(f64::from(evdo_snr));
                true
            }
            (SignalReading::Gsm { .. }, SignalSamples::Cdma { .. }) => {
                return Err(ReadingError::Mismatch {
                    expected: standard_name(standard),
                    actual: "gsm",
                })
            }
            (SignalReading::Cdma { .. }, SignalSamples::Gsm { .. }) => {
                return Err(ReadingError::Mismatch {
                    expected: standard_name(standard),
                    actual: "cdma",
                })
            }
        };

        Ok(if changed {
            self.snapshot().into_iter().collect()
        } else {
            Vec::new()
        })
    }
}

impl SignalProcessor for TelephonyProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        KINDS
    }

    fn reset(&mut self, _kind: EventKind) {
        *self = Self::default();
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        match reading {
            RawReading::CellLocation(reading) => Ok(self.on_cell(&reading)),
            RawReading::SignalStrength(reading) => self.on_signal(reading),
            RawReading::DataConnection(reading) => {
                self.network_type = Some(reading.network_type);
                let mut out = Vec::with_capacity(2);
                if let Some(serving) = self.serving.as_mut() {
                    serving.signal = SignalSamples::empty(serving.standard());
                    out.extend(self.snapshot());
                }
                self.check_sim(reading.sim_state, &mut out);
                Ok(out)
            }
            RawReading::ServiceState(reading) => {
                let mut out = vec![Emission::new(
                    EventKind::Telephony,
                    Payload::StateChange(StateChange::service(reading.service_state)),
                )];
                self.check_sim(reading.sim_state, &mut out);
                Ok(out)
            }
            RawReading::AirplaneMode(reading) => {
                let state = if reading.enabled {
                    AirplaneModeState::On
                } else {
                    AirplaneModeState::Off
                };
                Ok(vec![Emission::new(
                    EventKind::Telephony,
                    Payload::StateChange(StateChange::airplane_mode(state)),
                )])
            }
            other => Err(unexpected(kind, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{CdmaCell, ServiceState, StateType};
    use crate::reading::{
        AirplaneModeReading, DataConnectionReading, RawCell, RawNeighbor, ServiceStateReading,
    };
    use approx::assert_relative_eq;

    const K: EventKind = EventKind::Telephony;

    fn gsm_cell(cid: i32) -> RawReading {
        RawReading::CellLocation(CellLocationReading {
            cell: RawCell::Gsm {
                cid,
                lac: 12,
                psc: -1,
                neighbors: vec![RawNeighbor {
                    cid: 7,
                    lac: 12,
                    psc: -1,
                    rssi: 15,
                }],
            },
            operator: Some("73001".into()),
        })
    }

    fn cdma_cell() -> RawReading {
        RawReading::CellLocation(CellLocationReading {
            cell: RawCell::Cdma(CdmaCell {
                base_station_id: 5,
                base_latitude: 1000,
                base_longitude: -2000,
                network_id: 3,
                system_id: 9,
            }),
            operator: None,
        })
    }

    fn gsm_signal(asu: i32, ber: i32) -> RawReading {
        RawReading::SignalStrength(SignalReading::Gsm { asu, ber })
    }

    fn telephony(emission: &Emission) -> &TelephonyObservation {
        match &emission.payload {
            Payload::Telephony(t) => t,
            other => panic!("expected telephony, got {other:?}"),
        }
    }

    #[test]
    fn cell_location_publishes_fresh_observation() {
        let mut p = TelephonyProcessor::new();
        let out = p.process(K, gsm_cell(4242), 0).unwrap();
        assert_eq!(out.len(), 1);
        let t = telephony(&out[0]);
        assert_eq!(t.mcc, Some(730));
        assert_eq!(t.mnc, Some(1));
        assert_eq!(t.standard(), TelephonyStandard::Gsm);
        assert_eq!(t.neighbors().len(), 1);
        assert_eq!(t.neighbors()[0].signal_strength_dbm, Some(-83));
        assert!(t.signal_strength().is_empty());
    }

    #[test]
    fn signal_before_cell_is_ignored() {
        let mut p = TelephonyProcessor::new();
        assert!(p.process(K, gsm_signal(20, 0), 0).unwrap().is_empty());
    }

    #[test]
    fn published_snapshots_do_not_change() {
        let mut p = TelephonyProcessor::new();
        p.process(K, gsm_cell(1), 0).unwrap();

        let first = p.process(K, gsm_signal(20, 2), 0).unwrap();
        let second = p.process(K, gsm_signal(10, 2), 0).unwrap();

        let a = telephony(&first[0]);
        let b = telephony(&second[0]);
        assert_eq!(a.signal_strength().size(), 1);
        assert_relative_eq!(a.signal_strength().mean(), -73.0);
        assert_eq!(b.signal_strength().size(), 2);
        assert_relative_eq!(b.signal_strength().mean(), -83.0);

        let SignalSamples::Gsm { ber, .. } = b.signal else {
            panic!("expected gsm samples");
        };
        assert_eq!(ber.size(), 2);
        assert_relative_eq!(ber.mean(), 0.0057, epsilon = 1e-12);
    }

    #[test]
    fn unknown_gsm_values_publish_nothing() {
        let mut p = TelephonyProcessor::new();
        p.process(K, gsm_cell(1), 0).unwrap();
        assert!(p.process(K, gsm_signal(99, 99), 0).unwrap().is_empty());

        let out = p.process(K, gsm_signal(99, 0), 0).unwrap();
        let t = telephony(&out[0]);
        assert!(t.signal_strength().is_empty());
    }

    #[test]
    fn direct_dbm_updates_either_standard() {
        let mut p = TelephonyProcessor::new();
        p.process(K, cdma_cell(), 0).unwrap();
        let out = p.process(K, RawReading::SignalStrength(SignalReading::Dbm { dbm: -90 }), 0).unwrap();
        assert_relative_eq!(telephony(&out[0]).signal_strength().mean(), -90.0);
    }

    #[test]
    fn cdma_signal_updates_all_samples() {
        let mut p = TelephonyProcessor::new();
        p.process(K, cdma_cell(), 0).unwrap();
        let reading = RawReading::SignalStrength(SignalReading::Cdma {
            cdma_dbm: -80,
            cdma_ecio: -90,
            evdo_dbm: -70,
            evdo_ecio: -60,
            evdo_snr: 5,
        });
        let out = p.process(K, reading, 0).unwrap();
        let SignalSamples::Cdma {
            strength,
            ecio,
            evdo_snr,
            ..
        } = telephony(&out[0]).signal
        else {
            panic!("expected cdma samples");
        };
        assert_relative_eq!(strength.mean(), -80.0);
        assert_relative_eq!(ecio.mean(), -90.0);
        assert_relative_eq!(evdo_snr.mean(), 5.0);
    }

    #[test]
    fn mismatched_standard_is_rejected_without_side_effects() {
        let mut p = TelephonyProcessor::new();
        p.process(K, cdma_cell(), 0).unwrap();
        let err = p.process(K, gsm_signal(20, 0), 0).unwrap_err();
        assert_eq!(
            err,
            ReadingError::Mismatch {
                expected: "cdma",
                actual: "gsm"
            }
        );

        let out = p.process(K, RawReading::SignalStrength(SignalReading::Dbm { dbm: -95 }), 0).unwrap();
        assert_eq!(telephony(&out[0]).signal_strength().size(), 1);
    }

    #[test]
    fn cell_change_starts_fresh_samples() {
        let mut p = TelephonyProcessor::new();
        p.process(K, gsm_cell(1), 0).unwrap();
        p.process(K, gsm_signal(20, 0), 0).unwrap();
        let out = p.process(K, gsm_cell(2), 0).unwrap();
        assert!(telephony(&out[0]).signal_strength().is_empty());
    }

    #[test]
    fn data_connection_republishes_with_new_network_type() {
        let mut p = TelephonyProcessor::new();
        p.process(K, gsm_cell(1), 0).unwrap();
        p.process(K, gsm_signal(20, 0), 0).unwrap();

        let reading = RawReading::DataConnection(DataConnectionReading {
            network_type: NetworkType::Lte,
            sim_state: SimState::Ready,
        });
        let out = p.process(K, reading, 0).unwrap();
        assert_eq!(out.len(), 2);
        let t = telephony(&out[0]);
        assert_eq!(t.network_type, Some(NetworkType::Lte));
        assert!(t.signal_strength().is_empty());
        assert_eq!(out[1].payload, Payload::StateChange(StateChange::sim(SimState::Ready)));
        assert_eq!(p.network_type(), Some(NetworkType::Lte));
    }

    #[test]
    fn sim_state_is_emitted_only_on_change() {
        let mut p = TelephonyProcessor::new();
        let service = |sim| {
            RawReading::ServiceState(ServiceStateReading {
                service_state: ServiceState::InService,
                sim_state: sim,
            })
        };

        let out = p.process(K, service(SimState::Ready), 0).unwrap();
        assert_eq!(out.len(), 2);
        let Payload::StateChange(change) = out[0].payload else {
            panic!("expected state change");
        };
        assert_eq!(change.state_type, StateType::Service);
        assert_eq!(change.state, ServiceState::InService.value());

        let out = p.process(K, service(SimState::Ready), 0).unwrap();
        assert_eq!(out.len(), 1);

        let out = p.process(K, service(SimState::Absent), 0).unwrap();
        assert_eq!(out[1].payload, Payload::StateChange(StateChange::sim(SimState::Absent)));
        assert_eq!(p.sim_state(), Some(SimState::Absent));
    }

    #[test]
    fn airplane_mode_maps_to_state_change() {
        let mut p = TelephonyProcessor::new();
        let out = p
            .process(K, RawReading::AirplaneMode(AirplaneModeReading { enabled: true }), 0)
            .unwrap();
        assert_eq!(
            out[0].payload,
            Payload::StateChange(StateChange::airplane_mode(AirplaneModeState::On))
        );
    }

    #[test]
    fn reset_forgets_cell_and_sim() {
        let mut p = TelephonyProcessor::new();
        p.process(K, gsm_cell(1), 0).unwrap();
        p.process(
            K,
            RawReading::DataConnection(DataConnectionReading {
                network_type: NetworkType::Umts,
                sim_state: SimState::Ready,
            }),
            0,
        )
        .unwrap();

        p.reset(K);
        assert!(p.sim_state().is_none());
        assert!(p.network_type().is_none());
        assert!(p.process(K, gsm_signal(20, 0), 0).unwrap().is_empty());
    }
}
