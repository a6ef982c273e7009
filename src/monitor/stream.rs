use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::error::{ListenerError, StreamError};
use crate::observation::{EventKind, Observation};

use super::dispatcher::{Dispatcher, Listener, SubscriptionId};

/// Listener half of a stream: forwards into a bounded channel without blocking.
pub(crate) struct ChannelListener {
    tx: Sender<Observation>,
}

impl Listener for ChannelListener {
    fn on_observation(&self, observation: &Observation) -> Result<(), ListenerError> {
        match self.tx.try_send(observation.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ListenerError::Backpressure),
            Err(TrySendError::Disconnected(_)) => Err(ListenerError::Disconnected),
        }
    }
}

/// A pull-based subscription to one event kind.
///
/// Observations are buffered up to the stream's capacity; when the buffer is
/// full new observations are dropped for this stream only and counted as
/// listener failures. Dropping the stream unsubscribes it.
#[derive(Debug)]
pub struct ObservationStream {
    kind: EventKind,
    subscription_id: SubscriptionId,
    rx: Receiver<Observation>,
    dispatcher: Weak<Dispatcher>,
    unregistered: AtomicBool,
}

impl ObservationStream {
    pub(crate) fn open(kind: EventKind, dispatcher: &Arc<Dispatcher>, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        let subscription_id = dispatcher.subscribe(Arc::new(ChannelListener { tx }));
        Self {
            kind,
            subscription_id,
            rx,
            dispatcher: Arc::downgrade(dispatcher),
            unregistered: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Stops delivery. Already buffered observations can still be received.
    ///
    /// Idempotent.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unsubscribe(self.subscription_id);
        }
    }

    /// Receive the next observation (blocking).
    ///
    /// Fails with [`StreamError::Disconnected`] once the stream is
    /// unsubscribed (or its monitor dropped) and the buffer is drained.
    pub fn recv(&self) -> Result<Observation, StreamError> {
        self.rx.recv().map_err(|_| StreamError::Disconnected)
    }

    /// Receive the next observation with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Observation, StreamError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => StreamError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => StreamError::Disconnected,
        })
    }

    /// Receive a buffered observation, if any.
    pub fn try_recv(&self) -> Option<Observation> {
        match self.rx.try_recv() {
            Ok(obs) => Some(obs),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drains everything currently buffered.
    pub fn drain(&self) -> Vec<Observation> {
        self.rx.try_iter().collect()
    }

    /// Number of buffered observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Drop for ObservationStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
