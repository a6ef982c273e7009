use std::time::Duration;

use tracing::trace;

use crate::error::ReadingError;
use crate::monitor::processor::unexpected;
use crate::monitor::{Emission, SignalProcessor};
use crate::observation::{EventKind, LocationState, Payload, Provider, StateChange};
use crate::options::{self, Options};
use crate::reading::{LocationReading, ProviderEvent, RawReading};

use super::fuser::{
    best_of, is_better, Fix, FuserConfig, DEFAULT_ACCURACY_THRESHOLD_METERS,
    DEFAULT_EXPIRATION_SECONDS,
};

const KINDS: &[EventKind] = &[EventKind::LocationGps, EventKind::LocationNetwork];

/// Platform request parameters of a location channel.
///
/// Sources read these from the activation options; the processor does not
/// use them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    /// Minimum time between platform updates.
    pub interval: Duration,
    /// Minimum displacement between platform updates, in meters.
    pub min_distance_m: f64,
}

impl LocationRequest {
    /// GPS defaults: 10 s, 150 m.
    pub const GPS: Self = Self {
        interval: Duration::from_secs(10),
        min_distance_m: 150.0,
    };

    /// Network defaults: 300 s, 1500 m.
    pub const NETWORK: Self = Self {
        interval: Duration::from_secs(300),
        min_distance_m: 1500.0,
    };

    /// Reads `update_interval_seconds` and `update_distance_meters`, falling
    /// back to the channel defaults.
    #[must_use]
    pub fn from_options(kind: EventKind, options: &Options) -> Self {
        let defaults = if kind == EventKind::LocationGps {
            Self::GPS
        } else {
            Self::NETWORK
        };
        let min_distance_m = options.float_or(options::UPDATE_DISTANCE_METERS, defaults.min_distance_m);
        Self {
            interval: options.duration_seconds(options::UPDATE_INTERVAL_SECONDS, defaults.interval),
            min_distance_m: if min_distance_m >= 0.0 {
                min_distance_m
            } else {
                defaults.min_distance_m
            },
        }
    }
}

/// Fuses fixes from the GPS and network providers and routes the best one.
///
/// Remembers the last fix of each provider (replaced by platform last-known
/// fixes when a reading carries them), picks the better of the two as the
/// incumbent and publishes whichever of incumbent and new fix wins, on the
/// channel of the winner's provider.
#[derive(Debug, Default)]
pub struct LocationProcessor {
    config: FuserConfig,
    last_gps: Option<Fix>,
    last_network: Option<Fix>,
    best: Option<Fix>,
}

impl LocationProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn config(&self) -> &FuserConfig {
        &self.config
    }

    /// The fix most recently published.
    #[must_use]
    pub const fn best(&self) -> Option<&Fix> {
        self.best.as_ref()
    }

    fn channel(provider: &Provider) -> EventKind {
        match provider {
            Provider::Gps => EventKind::LocationGps,
            _ => EventKind::LocationNetwork,
        }
    }

    fn provider_channel(provider: &Provider) -> Option<EventKind> {
        match provider {
            Provider::Gps => Some(EventKind::LocationGps),
            Provider::Network => Some(EventKind::LocationNetwork),
            Provider::Passive | Provider::Other(_) => None,
        }
    }

    fn on_fix(&mut self, reading: LocationReading) -> Vec<Emission> {
        let LocationReading {
            fix,
            last_known_gps,
            last_known_network,
        } = reading;
        if last_known_gps.is_some() {
            self.last_gps = last_known_gps;
        }
        if last_known_network.is_some() {
            self.last_network = last_known_network;
        }

        let incumbent = if is_better(self.last_network.as_ref(), self.last_gps.as_ref(), &self.config) {
            self.last_network.as_ref()
        } else {
            self.last_gps.as_ref()
        };
        let best = best_of(Some(&fix), incumbent, &self.config).cloned().unwrap_or_else(|| fix.clone());
        trace!(provider = best.provider.name(), accuracy = best.accuracy, "Best location");

        match fix.provider {
            Provider::Gps => self.last_gps = Some(fix),
            Provider::Network => self.last_network = Some(fix),
            Provider::Passive | Provider::Other(_) => {}
        }

        let emission = Emission::new(Self::channel(&best.provider), Payload::Location(best.to_observation()));
        self.best = Some(best);
        vec![emission]
    }

    fn state(kind: EventKind, state: LocationState) -> Emission {
        Emission::new(kind, Payload::StateChange(StateChange::location(state)))
    }

    fn on_provider_event(&self, event: ProviderEvent) -> Vec<Emission> {
        match event {
            ProviderEvent::Enabled { provider } => Self::provider_channel(&provider)
                .map(|kind| Self::state(kind, LocationState::Enabled))
                .into_iter()
                .collect(),
            ProviderEvent::Disabled { provider } => Self::provider_channel(&provider)
                .map(|kind| Self::state(kind, LocationState::Disabled))
                .into_iter()
                .collect(),
            ProviderEvent::GpsStarted => vec![Self::state(EventKind::LocationGps, LocationState::Enabled)],
            ProviderEvent::GpsStopped => {
                let mut out = Vec::with_capacity(2);
                if let Some(best) = &self.best {
                    out.push(Emission::new(EventKind::LocationGps, Payload::Location(best.to_observation())));
                }
                out.push(Self::state(EventKind::LocationGps, LocationState::Disabled));
                out
            }
            ProviderEvent::Available { provider } => self
                .best
                .as_ref()
                .map(|best| Emission::new(Self::channel(&provider), Payload::Location(best.to_observation())))
                .into_iter()
                .collect(),
        }
    }
}

impl SignalProcessor for LocationProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        KINDS
    }

    fn configure(&mut self, _kind: EventKind, options: &Options) {
        let expiration = options.duration_seconds(
            options::EXPIRATION_TIME_SECONDS,
            Duration::from_secs(DEFAULT_EXPIRATION_SECONDS.unsigned_abs()),
        );
        #[allow(clippy::cast_possible_truncation)]
        let threshold = options.float_or(
            options::ACCURACY_THRESHOLD_METERS,
            f64::from(DEFAULT_ACCURACY_THRESHOLD_METERS),
        ) as f32;
        self.config = FuserConfig {
            expiration_window_ms: i64::try_from(expiration.as_millis()).unwrap_or(i64::MAX),
            significantly_less_accurate_m: threshold,
        };
    }

    fn reset(&mut self, kind: EventKind) {
        match kind {
            EventKind::LocationGps => self.last_gps = None,
            _ => self.last_network = None,
        }
        if self.best.as_ref().is_some_and(|b| Self::channel(&b.provider) == kind) {
            self.best = None;
        }
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        match reading {
            RawReading::Location(reading) => Ok(self.on_fix(reading)),
            RawReading::ProviderEvent(event) => Ok(self.on_provider_event(event)),
            other => Err(unexpected(kind, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::StateType;

    const T0: i64 = 1_700_000_000_000;

    fn fix(provider: Provider, accuracy: f32, time_ms: i64) -> Fix {
        Fix {
            latitude: -33.4489,
            longitude: -70.6693,
            bearing: 0.0,
            speed: 0.0,
            altitude: 570.0,
            provider,
            accuracy,
            time_ms,
        }
    }

    fn feed(p: &mut LocationProcessor, kind: EventKind, f: Fix) -> Vec<Emission> {
        p.process(kind, RawReading::Location(LocationReading::new(f)), 0).unwrap()
    }

    #[test]
    fn first_fix_is_routed_by_provider() {
        let mut p = LocationProcessor::new();
        let out = feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 900.0, T0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, EventKind::LocationNetwork);

        let mut p = LocationProcessor::new();
        let out = feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        assert_eq!(out[0].kind, EventKind::LocationGps);
    }

    #[test]
    fn worse_network_fix_keeps_gps_best() {
        let mut p = LocationProcessor::new();
        feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        let out = feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 1200.0, T0 + 5_000));

        assert_eq!(out[0].kind, EventKind::LocationGps);
        let Payload::Location(loc) = &out[0].payload else {
            panic!("expected location");
        };
        assert_eq!(loc.provider, Provider::Gps);
        assert!((loc.accuracy - 8.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stale_gps_loses_to_fresh_network() {
        let mut p = LocationProcessor::new();
        feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        let out = feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 1200.0, T0 + 400_000));
        assert_eq!(out[0].kind, EventKind::LocationNetwork);
        assert_eq!(p.best().map(|b| &b.provider), Some(&Provider::Network));
    }

    #[test]
    fn platform_last_known_fixes_are_used() {
        let mut p = LocationProcessor::new();
        let reading = LocationReading {
            fix: fix(Provider::Network, 1500.0, T0 + 1_000),
            last_known_gps: Some(fix(Provider::Gps, 5.0, T0)),
            last_known_network: None,
        };
        let out = p.process(EventKind::LocationNetwork, RawReading::Location(reading), 0).unwrap();
        assert_eq!(out[0].kind, EventKind::LocationGps);
    }

    #[test]
    fn expiration_option_changes_selection() {
        let mut p = LocationProcessor::new();
        p.configure(
            EventKind::LocationGps,
            &Options::new().with(options::EXPIRATION_TIME_SECONDS, 2),
        );
        assert_eq!(p.config().expiration_window_ms, 2_000);

        feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        let out = feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 1200.0, T0 + 5_000));
        assert_eq!(out[0].kind, EventKind::LocationNetwork);
    }

    #[test]
    fn provider_events_map_to_state_changes() {
        let mut p = LocationProcessor::new();
        let out = p
            .process(
                EventKind::LocationNetwork,
                RawReading::ProviderEvent(ProviderEvent::Disabled {
                    provider: Provider::Network,
                }),
                0,
            )
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, EventKind::LocationNetwork);
        assert_eq!(
            out[0].payload,
            Payload::StateChange(StateChange {
                state_type: StateType::Location,
                state: LocationState::Disabled.value(),
            })
        );

        let out = p
            .process(
                EventKind::LocationGps,
                RawReading::ProviderEvent(ProviderEvent::Enabled {
                    provider: Provider::Other("fused".into()),
                }),
                0,
            )
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn gps_stop_republishes_best_then_disables() {
        let mut p = LocationProcessor::new();
        let stop = RawReading::ProviderEvent(ProviderEvent::GpsStopped);
        let out = p.process(EventKind::LocationGps, stop.clone(), 0).unwrap();
        assert_eq!(out.len(), 1);

        feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 700.0, T0));
        let out = p.process(EventKind::LocationGps, stop, 0).unwrap();
        assert_eq!(out.len(), 2);
        assert!(matches!(out[0].payload, Payload::Location(_)));
        assert_eq!(out[0].kind, EventKind::LocationGps);
        assert!(matches!(out[1].payload, Payload::StateChange(_)));
    }

    #[test]
    fn available_republishes_on_provider_channel() {
        let mut p = LocationProcessor::new();
        let available = RawReading::ProviderEvent(ProviderEvent::Available {
            provider: Provider::Network,
        });
        assert!(p.process(EventKind::LocationNetwork, available.clone(), 0).unwrap().is_empty());

        feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        let out = p.process(EventKind::LocationNetwork, available, 0).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, EventKind::LocationNetwork);
    }

    #[test]
    fn reset_forgets_channel_state() {
        let mut p = LocationProcessor::new();
        feed(&mut p, EventKind::LocationGps, fix(Provider::Gps, 8.0, T0));
        p.reset(EventKind::LocationGps);
        assert!(p.best().is_none());
        let out = feed(&mut p, EventKind::LocationNetwork, fix(Provider::Network, 1200.0, T0 + 1_000));
        assert_eq!(out[0].kind, EventKind::LocationNetwork);
    }

    #[test]
    fn other_readings_are_rejected() {
        let mut p = LocationProcessor::new();
        let err = p
            .process(
                EventKind::LocationGps,
                RawReading::Counters(crate::reading::CounterSnapshot::default()),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, ReadingError::Unexpected { reading: "counters", .. }));
    }

    #[test]
    fn request_parameters_from_options() {
        let gps = LocationRequest::from_options(EventKind::LocationGps, &Options::new());
        assert_eq!(gps, LocationRequest::GPS);

        let options = Options::new()
            .with(options::UPDATE_INTERVAL_SECONDS, 30)
            .with(options::UPDATE_DISTANCE_METERS, 50);
        let network = LocationRequest::from_options(EventKind::LocationNetwork, &options);
        assert_eq!(network.interval, Duration::from_secs(30));
        assert!((network.min_distance_m - 50.0).abs() < f64::EPSILON);
    }
}
