//! Monitor subsystem: activation, conversion and fan-out of signal readings.
//!
//! Each event kind owns an [`EventState`], a [`Dispatcher`] and a cached last
//! observation. A [`SignalProcessor`] shared by a family of kinds converts raw
//! readings; a [`SignalSource`] produces them on the platform side.

/// Listener registry and fan-out.
pub mod dispatcher;
/// The monitor itself and its builder.
pub mod engine;
/// Reading conversion seam.
pub mod processor;
/// Platform reading producers.
pub mod source;
/// Activation state machine.
pub mod state;
/// Buffered subscriber stream.
pub mod stream;

pub use dispatcher::{listener_fn, Dispatcher, Listener, SubscriptionId};
pub use engine::{IngestOutcome, KindStats, Monitor, MonitorBuilder, MonitorStats};
pub use processor::{Emission, SignalProcessor};
pub use source::{ReadingSink, SignalSource};
pub use state::{Activation, EventState};
pub use stream::ObservationStream;
