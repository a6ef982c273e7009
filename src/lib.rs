//! # sigmon - Device signal monitoring engine
//!
//! sigmon turns raw, noisy and intermittently available device signals
//! (location fixes, network byte counters, accelerometer samples, radio cell
//! and signal reports, system broadcasts) into a clean stream of typed
//! observations, while tracking activation state per signal kind and caching
//! the last observed value.
//!
//! ## Core Concepts
//!
//! - **Monitor**: one activation state, listener registry and last-state cache per [`EventKind`]
//! - **Processor**: converts raw readings of a family of kinds into observations
//! - **Source**: the platform side that produces readings while a kind is active
//! - **Observation**: an immutable, timestamped, typed value
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sigmon::reading::{CounterSnapshot, InterfaceCounters, RawReading};
//! use sigmon::{listener_fn, EventKind, Monitor, Options};
//!
//! let monitor = Monitor::new();
//! monitor.activate(EventKind::TrafficMobile, &Options::new())?;
//!
//! let listener = listener_fn(|obs| {
//!     println!("{obs:?}");
//!     Ok(())
//! });
//! monitor.subscribe(EventKind::TrafficMobile, listener)?;
//!
//! let snapshot = CounterSnapshot {
//!     mobile: InterfaceCounters::bytes(4096, 1024),
//!     ..CounterSnapshot::default()
//! };
//! monitor.on_raw_reading(EventKind::TrafficMobile, RawReading::Counters(snapshot));
//! assert!(monitor.get_state(EventKind::TrafficMobile).is_some());
//! # Ok::<(), sigmon::ActivationError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Building blocks
pub mod clock;
pub mod delta;
pub mod error;
pub mod observation;
pub mod options;
pub mod reading;
pub mod sample;
pub mod scheduler;

// Dispatch engine
pub mod monitor;

// Signal processors
pub mod broadcast;
pub mod connectivity;
pub mod location;
pub mod telephony;
pub mod traffic;

// Re-export primary types at crate root for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use delta::DeltaCounter;
pub use error::{
    ActivationError, ConfigError, ListenerError, ReadingError, SigmonError, SigmonResult,
    StreamError,
};
pub use observation::{EventKind, Observation, Payload};
pub use options::{MonitorSettings, OptionValue, Options};
pub use reading::RawReading;
pub use sample::Sample;
pub use scheduler::{ScheduledTask, Scheduler};

pub use monitor::{
    listener_fn, Activation, IngestOutcome, Listener, Monitor, MonitorBuilder, MonitorStats,
    ObservationStream, ReadingSink, SignalProcessor, SignalSource, SubscriptionId,
};

pub use broadcast::{AccelerometerProcessor, BroadcastProcessor};
pub use connectivity::ConnectivityProcessor;
pub use location::{Fix, LocationProcessor, LocationRequest};
pub use telephony::TelephonyProcessor;
pub use traffic::{CounterSource, TrafficProcessor, TrafficSampler};
