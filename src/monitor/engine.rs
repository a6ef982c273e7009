use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::broadcast::{AccelerometerProcessor, BroadcastProcessor};
use crate::clock::{Clock, SystemClock};
use crate::connectivity::ConnectivityProcessor;
use crate::error::ActivationError;
use crate::location::LocationProcessor;
use crate::observation::{EventKind, Observation};
use crate::options::{MonitorSettings, Options};
use crate::reading::RawReading;
use crate::telephony::TelephonyProcessor;
use crate::traffic::TrafficProcessor;

use super::dispatcher::{Dispatcher, Listener, SubscriptionId};
use super::processor::SignalProcessor;
use super::source::{ReadingSink, SignalSource};
use super::state::{Activation, EventState};
use super::stream::ObservationStream;

type SharedProcessor = Arc<Mutex<Box<dyn SignalProcessor>>>;

/// What happened to a raw reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Converted; this many observations were published (possibly zero).
    Published(usize),
    /// The kind is not active; the reading was ignored.
    Refused,
    /// The reading could not be converted and was dropped.
    Dropped,
    /// The monitor has no slot for the kind.
    Unknown,
    /// The monitor no longer exists.
    Closed,
}

impl IngestOutcome {
    /// Number of observations published.
    #[must_use]
    pub const fn published(self) -> usize {
        match self {
            Self::Published(n) => n,
            _ => 0,
        }
    }
}

/// Counters of one kind.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub kind: EventKind,
    pub active: bool,
    pub subscribers: usize,
    pub published: u64,
    pub dropped_readings: u64,
    pub refused_readings: u64,
    pub listener_failures: u64,
}

/// Snapshot of every kind's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Per-kind counters, in bit order.
    pub kinds: Vec<KindStats>,
}

impl MonitorStats {
    #[must_use]
    pub fn kind(&self, kind: EventKind) -> Option<&KindStats> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    #[must_use]
    pub fn total_published(&self) -> u64 {
        self.kinds.iter().map(|k| k.published).sum()
    }

    #[must_use]
    pub fn total_dropped(&self) -> u64 {
        self.kinds.iter().map(|k| k.dropped_readings).sum()
    }
}

/// Work the processor must do before the next reading of a kind.
#[derive(Debug, Default)]
struct Pending {
    reset: bool,
    options: Option<Options>,
}

struct Slot {
    kind: EventKind,
    state: EventState,
    /// Gate checked by readings without taking the state lock.
    open: AtomicBool,
    pending: Mutex<Pending>,
    dispatcher: Arc<Dispatcher>,
    cache: RwLock<Option<Arc<Observation>>>,
    processor: SharedProcessor,
    source: Option<Arc<dyn SignalSource>>,
    published: AtomicU64,
    dropped: AtomicU64,
    refused: AtomicU64,
}

impl Slot {
    fn publish(&self, observation: Observation) {
        let observation = Arc::new(observation);
        *self.cache.write() = Some(Arc::clone(&observation));
        self.published.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.publish(&observation);
    }

    fn stats(&self) -> KindStats {
        KindStats {
            kind: self.kind,
            active: self.state.is_active(),
            subscribers: self.dispatcher.len(),
            published: self.published.load(Ordering::Relaxed),
            dropped_readings: self.dropped.load(Ordering::Relaxed),
            refused_readings: self.refused.load(Ordering::Relaxed),
            listener_failures: self.dispatcher.failures(),
        }
    }
}

pub(crate) struct Shared {
    slots: BTreeMap<EventKind, Slot>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
}

impl Shared {
    pub(crate) fn ingest(&self, kind: EventKind, reading: RawReading) -> IngestOutcome {
        let Some(slot) = self.slots.get(&kind) else {
            debug!(%kind, reading = reading.name(), "Reading for an unmonitored kind");
            return IngestOutcome::Unknown;
        };
        if !slot.open.load(Ordering::Acquire) {
            slot.refused.fetch_add(1, Ordering::Relaxed);
            trace!(%kind, reading = reading.name(), "Reading refused, kind inactive");
            return IngestOutcome::Refused;
        }

        // Held through publication so each listener sees a kind's
        // observations in reading order.
        let mut processor = slot.processor.lock();
        for (sibling_kind, sibling) in &self.slots {
            if !Arc::ptr_eq(&sibling.processor, &slot.processor) {
                continue;
            }
            let pending = std::mem::take(&mut *sibling.pending.lock());
            if pending.reset {
                processor.reset(*sibling_kind);
            }
            if let Some(options) = &pending.options {
                processor.configure(*sibling_kind, options);
            }
        }

        let now_ms = self.clock.now_millis();
        let reading_name = reading.name();
        match processor.process(kind, reading, now_ms) {
            Ok(emissions) => {
                let mut published = 0;
                for emission in emissions {
                    match self.slots.get(&emission.kind) {
                        Some(target) if target.open.load(Ordering::Acquire) => {
                            target.publish(Observation::new(emission.kind, now_ms, emission.payload));
                            published += 1;
                        }
                        Some(_) => {
                            trace!(kind = %emission.kind, "Skipping emission on inactive kind");
                        }
                        None => {
                            debug!(kind = %emission.kind, "Skipping emission on unmonitored kind");
                        }
                    }
                }
                IngestOutcome::Published(published)
            }
            Err(e) => {
                slot.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(%kind, reading = reading_name, reason = %e, "Dropping reading");
                IngestOutcome::Dropped
            }
        }
    }
}

/// Signal monitoring engine.
///
/// Holds, per event kind, an activation state, a listener registry and the
/// last published observation. Raw readings enter through
/// [`on_raw_reading`](Self::on_raw_reading) (or a [`ReadingSink`]), are
/// converted by the kind's processor and fanned out to listeners.
///
/// Listeners are called on the thread that delivered the reading, while the
/// kind's processor is locked: a listener must not feed readings of the same
/// processor synchronously.
///
/// Dropping the monitor deactivates every kind.
pub struct Monitor {
    shared: Arc<Shared>,
}

impl Monitor {
    /// A monitor with every standard processor, no signal sources and the
    /// system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().with_standard_processors().build()
    }

    #[must_use]
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    fn slot(&self, kind: EventKind) -> Result<&Slot, ActivationError> {
        self.shared.slots.get(&kind).ok_or(ActivationError::UnknownEvent { kind })
    }

    /// Kinds this monitor can activate, in bit order.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.shared.slots.keys().copied()
    }

    /// Activates `kind`, starting its source with `options`.
    ///
    /// Activating an active kind succeeds without restarting the source; its
    /// options still replace the processor's configuration. A kind going from
    /// inactive to active starts from fresh processor state.
    pub fn activate(&self, kind: EventKind, options: &Options) -> Result<Activation, ActivationError> {
        let slot = self.slot(kind)?;
        let outcome = slot.state.activate(|| {
            {
                let mut pending = slot.pending.lock();
                pending.reset = true;
                pending.options = Some(options.clone());
            }
            if let Some(source) = &slot.source {
                let sink = ReadingSink::new(Arc::downgrade(&self.shared), kind);
                source.start(kind, options, sink)?;
            }
            slot.open.store(true, Ordering::Release);
            Ok(())
        });

        match &outcome {
            Ok(Activation::Activated) => debug!(%kind, "Activated"),
            Ok(Activation::AlreadyActive) => {
                slot.pending.lock().options = Some(options.clone());
                trace!(%kind, "Already active, options updated");
            }
            Err(e) => info!(%kind, reason = %e, "Activation failed"),
        }
        outcome
    }

    /// Activates every kind in `mask`; stops at the first failure.
    ///
    /// Kinds activated before the failure stay active. Bits of kinds this
    /// monitor does not have are ignored.
    pub fn activate_mask(&self, mask: u32, options: &Options) -> Result<Vec<EventKind>, ActivationError> {
        let mut activated = Vec::new();
        for kind in EventKind::from_mask(mask) {
            if !self.shared.slots.contains_key(&kind) {
                continue;
            }
            if self.activate(kind, options)? == Activation::Activated {
                activated.push(kind);
            }
        }
        Ok(activated)
    }

    /// Deactivates `kind`, stopping its source. Returns false if it was not active.
    ///
    /// A publication already in progress completes; later readings are
    /// refused until the next activation.
    pub fn deactivate(&self, kind: EventKind) -> bool {
        let Ok(slot) = self.slot(kind) else {
            return false;
        };
        let changed = slot.state.deactivate(|| {
            slot.open.store(false, Ordering::Release);
            if let Some(source) = &slot.source {
                source.stop(kind);
            }
        });
        if changed {
            debug!(%kind, "Deactivated");
        }
        changed
    }

    /// Deactivates every kind in `mask`; returns the kinds that changed.
    pub fn deactivate_mask(&self, mask: u32) -> Vec<EventKind> {
        EventKind::from_mask(mask)
            .into_iter()
            .filter(|kind| self.deactivate(*kind))
            .collect()
    }

    #[must_use]
    pub fn is_active(&self, kind: EventKind) -> bool {
        self.shared.slots.get(&kind).is_some_and(|slot| slot.state.is_active())
    }

    /// Subscribes (`subscribe = true`) or unsubscribes `listener` on `kind`.
    ///
    /// Unsubscribing removes every subscription of that exact listener.
    pub fn listen(&self, kind: EventKind, listener: &Arc<dyn Listener>, subscribe: bool) -> Result<(), ActivationError> {
        let slot = self.slot(kind)?;
        if subscribe {
            slot.dispatcher.subscribe(Arc::clone(listener));
        } else {
            slot.dispatcher.unsubscribe_listener(listener);
        }
        Ok(())
    }

    /// Subscribes `listener` on `kind` and returns the subscription id.
    pub fn subscribe(&self, kind: EventKind, listener: Arc<dyn Listener>) -> Result<SubscriptionId, ActivationError> {
        Ok(self.slot(kind)?.dispatcher.subscribe(listener))
    }

    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.shared
            .slots
            .get(&kind)
            .is_some_and(|slot| slot.dispatcher.unsubscribe(id))
    }

    /// Opens a buffered stream on `kind` with the configured default capacity.
    pub fn stream(&self, kind: EventKind) -> Result<ObservationStream, ActivationError> {
        self.stream_with_capacity(kind, self.shared.settings.stream_capacity)
    }

    pub fn stream_with_capacity(&self, kind: EventKind, capacity: usize) -> Result<ObservationStream, ActivationError> {
        let slot = self.slot(kind)?;
        Ok(ObservationStream::open(kind, &slot.dispatcher, capacity))
    }

    /// Last observation published on `kind`, if any.
    #[must_use]
    pub fn get_state(&self, kind: EventKind) -> Option<Arc<Observation>> {
        self.shared.slots.get(&kind)?.cache.read().clone()
    }

    /// Feeds one raw reading of `kind`.
    pub fn on_raw_reading(&self, kind: EventKind, reading: RawReading) -> IngestOutcome {
        self.shared.ingest(kind, reading)
    }

    /// A sink bound to `kind`, for sources managed outside the monitor.
    #[must_use]
    pub fn sink(&self, kind: EventKind) -> ReadingSink {
        ReadingSink::new(Arc::downgrade(&self.shared), kind)
    }

    #[must_use]
    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            kinds: self.shared.slots.values().map(Slot::stats).collect(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &MonitorSettings {
        &self.shared.settings
    }

    /// Deactivates every kind.
    pub fn shutdown(&self) {
        let stopped: Vec<_> = self.shared.slots.keys().copied().filter(|k| self.deactivate(*k)).collect();
        if !stopped.is_empty() {
            debug!(count = stopped.len(), "Monitor shut down");
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active: Vec<_> = self.kinds().filter(|k| self.is_active(*k)).collect();
        f.debug_struct("Monitor")
            .field("kinds", &self.shared.slots.len())
            .field("active", &active)
            .field("clock", &self.shared.clock)
            .finish()
    }
}

/// Builder for [`Monitor`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sigmon::{EventKind, ManualClock, Monitor, Options};
///
/// let monitor = Monitor::builder()
///     .with_standard_processors()
///     .clock(Arc::new(ManualClock::new(0)))
///     .build();
/// monitor.activate(EventKind::Screen, &Options::new()).unwrap();
/// assert!(monitor.is_active(EventKind::Screen));
/// ```
pub struct MonitorBuilder {
    processors: BTreeMap<EventKind, SharedProcessor>,
    sources: BTreeMap<EventKind, Arc<dyn SignalSource>>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
}

impl MonitorBuilder {
    fn new() -> Self {
        Self {
            processors: BTreeMap::new(),
            sources: BTreeMap::new(),
            clock: Arc::new(SystemClock),
            settings: MonitorSettings::default(),
        }
    }

    /// Registers a processor for every kind it serves, replacing earlier
    /// registrations of those kinds.
    #[must_use]
    pub fn processor(mut self, processor: impl SignalProcessor + 'static) -> Self {
        let kinds = processor.kinds();
        let shared: SharedProcessor = Arc::new(Mutex::new(Box::new(processor)));
        for kind in kinds {
            self.processors.insert(*kind, Arc::clone(&shared));
        }
        self
    }

    /// Registers connectivity, traffic, telephony, screen/device, location
    /// and accelerometer processors.
    #[must_use]
    pub fn with_standard_processors(self) -> Self {
        self.processor(ConnectivityProcessor::new())
            .processor(TrafficProcessor::new())
            .processor(TelephonyProcessor::new())
            .processor(BroadcastProcessor::new())
            .processor(LocationProcessor::new())
            .processor(AccelerometerProcessor::new())
    }

    /// Attaches `source` to every kind in `mask`.
    #[must_use]
    pub fn source(mut self, mask: u32, source: Arc<dyn SignalSource>) -> Self {
        for kind in EventKind::from_mask(mask) {
            self.sources.insert(kind, Arc::clone(&source));
        }
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the monitor. Kinds without a processor are not monitored;
    /// sources attached to them are discarded.
    #[must_use]
    pub fn build(mut self) -> Monitor {
        let slots = self
            .processors
            .into_iter()
            .map(|(kind, processor)| {
                let slot = Slot {
                    kind,
                    state: EventState::new(),
                    open: AtomicBool::new(false),
                    pending: Mutex::new(Pending::default()),
                    dispatcher: Arc::new(Dispatcher::new()),
                    cache: RwLock::new(None),
                    processor,
                    source: self.sources.remove(&kind),
                    published: AtomicU64::new(0),
                    dropped: AtomicU64::new(0),
                    refused: AtomicU64::new(0),
                };
                (kind, slot)
            })
            .collect();

        for kind in self.sources.keys() {
            warn!(%kind, "Source attached to a kind without processor, ignoring");
        }

        Monitor {
            shared: Arc::new(Shared {
                slots,
                clock: self.clock,
                settings: self.settings,
            }),
        }
    }
}

impl fmt::Debug for MonitorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorBuilder")
            .field("kinds", &self.processors.keys().collect::<Vec<_>>())
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}
