use std::fmt;
use std::sync::Weak;

use crate::error::ActivationError;
use crate::observation::EventKind;
use crate::options::Options;
use crate::reading::RawReading;

use super::engine::{IngestOutcome, Shared};

/// Platform side of a kind: registers callbacks or timers that produce raw
/// readings.
///
/// `start` runs as the setup of the kind's activation and `stop` as its
/// teardown; both are serialized per kind. Readings pushed through the sink
/// before `start` returns are refused.
pub trait SignalSource: Send + Sync {
    /// Begins producing readings for `kind`.
    ///
    /// Returns [`ActivationError::CapabilityAbsent`] when the device lacks the
    /// sensor or counter; the kind then stays inactive.
    fn start(&self, kind: EventKind, options: &Options, sink: ReadingSink) -> Result<(), ActivationError>;

    /// Stops producing readings for `kind`.
    fn stop(&self, kind: EventKind);
}

/// Handle a source uses to push readings for one kind.
///
/// Holds the monitor weakly: a sink never keeps a monitor alive, and pushes
/// after the monitor is gone return [`IngestOutcome::Closed`].
#[derive(Clone)]
pub struct ReadingSink {
    shared: Weak<Shared>,
    kind: EventKind,
}

impl ReadingSink {
    pub(crate) const fn new(shared: Weak<Shared>, kind: EventKind) -> Self {
        Self { shared, kind }
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Delivers a reading as if by `Monitor::on_raw_reading(self.kind(), reading)`.
    pub fn push(&self, reading: RawReading) -> IngestOutcome {
        match self.shared.upgrade() {
            Some(shared) => shared.ingest(self.kind, reading),
            None => IngestOutcome::Closed,
        }
    }

    /// True while the monitor exists.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl fmt::Debug for ReadingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadingSink")
            .field("kind", &self.kind)
            .field("connected", &self.is_connected())
            .finish()
    }
}
