use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::error::ListenerError;
use crate::observation::Observation;

/// Receives observations of the kinds it is subscribed to.
///
/// Called on whichever thread delivered the reading. Implementations should
/// return quickly; slow consumers belong behind an
/// [`ObservationStream`](super::ObservationStream).
pub trait Listener: Send + Sync {
    /// Handles one observation.
    fn on_observation(&self, observation: &Observation) -> Result<(), ListenerError>;
}

struct FnListener<F>(F);

impl<F> Listener for FnListener<F>
where
    F: Fn(&Observation) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_observation(&self, observation: &Observation) -> Result<(), ListenerError> {
        (self.0)(observation)
    }
}

/// Wraps a closure as a shared listener.
///
/// # Examples
///
/// ```
/// use sigmon::listener_fn;
///
/// let listener = listener_fn(|obs| {
///     println!("{:?}", obs.kind);
///     Ok(())
/// });
/// # drop(listener);
/// ```
pub fn listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&Observation) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

/// Unique identifier of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    listener: Arc<dyn Listener>,
    /// Cleared on removal so an in-flight publish skips it.
    active: AtomicBool,
}

impl Subscriber {
    fn same_listener(&self, listener: &Arc<dyn Listener>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.listener).cast::<()>(),
            Arc::as_ptr(listener).cast::<()>(),
        )
    }
}

/// Listener registry with copy-on-write membership and fan-out delivery.
///
/// `publish` iterates a snapshot of the subscriber list, so listeners may
/// subscribe or unsubscribe (themselves included) from any thread, even from
/// inside a callback. A removed subscriber is not called again, including by
/// a publish already in progress.
pub struct Dispatcher {
    subscribers: ArcSwap<Vec<Arc<Subscriber>>>,
    failures: AtomicU64,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: ArcSwap::from_pointee(Vec::new()),
            failures: AtomicU64::new(0),
        }
    }

    /// Adds a listener. The same listener may be subscribed more than once.
    pub fn subscribe(&self, listener: Arc<dyn Listener>) -> SubscriptionId {
        let subscriber = Arc::new(Subscriber {
            id: SubscriptionId::new(),
            listener,
            active: AtomicBool::new(true),
        });
        let id = subscriber.id;
        self.subscribers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&subscriber));
            next
        });
        id
    }

    /// Removes a subscription by id. Returns false if it was not present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.remove_where(|s| s.id == id) > 0
    }

    /// Removes every subscription of `listener` (compared by pointer).
    pub fn unsubscribe_listener(&self, listener: &Arc<dyn Listener>) -> usize {
        self.remove_where(|s| s.same_listener(listener))
    }

    fn remove_where(&self, matches: impl Fn(&Subscriber) -> bool) -> usize {
        let mut removed = Vec::new();
        self.subscribers.rcu(|current| {
            removed.clear();
            let mut next = Vec::with_capacity(current.len());
            for s in current.iter() {
                if matches(s) {
                    removed.push(Arc::clone(s));
                } else {
                    next.push(Arc::clone(s));
                }
            }
            next
        });
        for s in &removed {
            s.active.store(false, Ordering::Release);
        }
        removed.len()
    }

    /// Delivers `observation` to every current subscriber.
    ///
    /// A listener that errors or panics is logged and counted; delivery to the
    /// others continues. Returns the number of successful deliveries.
    pub fn publish(&self, observation: &Observation) -> usize {
        let snapshot = self.subscribers.load_full();
        let mut delivered = 0;
        for subscriber in snapshot.iter() {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.listener.on_observation(observation)));
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = %observation.kind, subscription = %subscriber.id, reason = %e, "Listener failed");
                }
                Err(_) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = %observation.kind, subscription = %subscriber.id, "Listener panicked");
                }
            }
        }
        trace!(kind = %observation.kind, delivered, "Published observation");
        delivered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.load().is_empty()
    }

    /// Failed or panicked deliveries so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.len())
            .field("failures", &self.failures())
            .finish()
    }
}
