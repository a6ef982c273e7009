use crate::error::ReadingError;
use crate::observation::{EventKind, Payload};
use crate::options::Options;
use crate::reading::RawReading;

/// A payload to publish on a kind, produced from one raw reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// Kind to publish on. May differ from the kind the reading arrived on,
    /// but must be one of the processor's kinds.
    pub kind: EventKind,
    /// Value to publish; the monitor stamps it with its clock.
    pub payload: Payload,
}

impl Emission {
    #[must_use]
    pub const fn new(kind: EventKind, payload: Payload) -> Self {
        Self { kind, payload }
    }
}

/// Converts raw readings of a family of kinds into payloads.
///
/// One processor instance serves every kind returned by [`kinds`](Self::kinds)
/// and is called under a lock, one reading at a time, so it may keep mutable
/// state (baselines, last fixes, running samples) without synchronization.
pub trait SignalProcessor: Send {
    /// Kinds served by this processor.
    fn kinds(&self) -> &'static [EventKind];

    /// Applies activation options of `kind`. Runs before the next reading
    /// after every `activate` call.
    fn configure(&mut self, _kind: EventKind, _options: &Options) {}

    /// Forgets the state of `kind`. Runs before the next reading after `kind`
    /// goes from inactive to active.
    fn reset(&mut self, _kind: EventKind) {}

    /// Converts one reading delivered to `kind`.
    ///
    /// An error drops the reading: nothing is published and the processor
    /// state must be left as it was.
    fn process(&mut self, kind: EventKind, reading: RawReading, now_ms: i64) -> Result<Vec<Emission>, ReadingError>;
}

/// Error for a reading variant the processor does not handle on `kind`.
pub(crate) const fn unexpected(kind: EventKind, reading: &RawReading) -> ReadingError {
    ReadingError::Unexpected {
        kind,
        reading: reading.name(),
    }
}
