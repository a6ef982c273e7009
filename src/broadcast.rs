//! Direct mappings: screen and device broadcasts, accelerometer vectors.

use crate::error::ReadingError;
use crate::monitor::processor::unexpected;
use crate::monitor::{Emission, SignalProcessor};
use crate::observation::{
    AccelerometerObservation, DeviceBootState, EventKind, Payload, ScreenState, SensorDelay,
    StateChange,
};
use crate::options::Options;
use crate::reading::{BroadcastAction, RawReading};

/// Maps screen and boot broadcasts to state changes.
///
/// Screen actions publish on [`EventKind::Screen`], boot and shutdown on
/// [`EventKind::Device`], whichever kind the broadcast arrived on.
#[derive(Debug, Default)]
pub struct BroadcastProcessor;

impl BroadcastProcessor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[must_use]
    pub const fn emission(action: BroadcastAction) -> Emission {
        let (kind, change) = match action {
            BroadcastAction::ScreenOn => (EventKind::Screen, StateChange::screen(ScreenState::On)),
            BroadcastAction::ScreenOff => (EventKind::Screen, StateChange::screen(ScreenState::Off)),
            BroadcastAction::ScreenLocked => (EventKind::Screen, StateChange::screen(ScreenState::Locked)),
            BroadcastAction::UserPresent => (EventKind::Screen, StateChange::screen(ScreenState::Unlocked)),
            BroadcastAction::BootCompleted => (EventKind::Device, StateChange::device_boot(DeviceBootState::Boot)),
            BroadcastAction::Shutdown => (EventKind::Device, StateChange::device_boot(DeviceBootState::Shutdown)),
        };
        Emission::new(kind, Payload::StateChange(change))
    }
}

impl SignalProcessor for BroadcastProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Screen, EventKind::Device]
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        match reading {
            RawReading::Broadcast(broadcast) => Ok(vec![Self::emission(broadcast.action)]),
            other => Err(unexpected(kind, &other)),
        }
    }
}

/// Passes accelerometer vectors through.
///
/// Remembers the sampling rate requested at activation so the platform side
/// can be inspected; the rate itself is applied by the source.
#[derive(Debug, Default)]
pub struct AccelerometerProcessor {
    delay: SensorDelay,
}

impl AccelerometerProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn sensor_delay(&self) -> SensorDelay {
        self.delay
    }
}

impl SignalProcessor for AccelerometerProcessor {
    fn kinds(&self) -> &'static [EventKind] {
        &[EventKind::Accelerometer]
    }

    fn configure(&mut self, _kind: EventKind, options: &Options) {
        self.delay = options.sensor_delay();
    }

    fn process(&mut self, kind: EventKind, reading: RawReading, _now_ms: i64) -> Result<Vec<Emission>, ReadingError> {
        let v = match reading {
            RawReading::Accelerometer(v) => v,
            other => return Err(unexpected(kind, &other)),
        };
        if !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()) {
            return Err(ReadingError::malformed(format!(
                "non-finite acceleration ({}, {}, {})",
                v.x, v.y, v.z
            )));
        }
        Ok(vec![Emission::new(
            EventKind::Accelerometer,
            Payload::Accelerometer(AccelerometerObservation {
                x: v.x,
                y: v.y,
                z: v.z,
                accuracy: v.accuracy,
            }),
        )])
    }
}
