//! Per-kind activation state machine.

use parking_lot::Mutex;

/// Result of a successful [`EventState::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Setup ran and the state became active.
    Activated,
    /// The state was already active; setup did not run.
    AlreadyActive,
}

/// Inactive/Active flag whose transitions run their side effects under the
/// same lock.
///
/// Setup and teardown are serialized with each other and with
/// [`is_active`](Self::is_active). They must not call back into the same
/// state (the lock is not reentrant).
#[derive(Debug, Default)]
pub struct EventState {
    active: Mutex<bool>,
}

impl EventState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: parking_lot::const_mutex(false),
        }
    }

    /// Runs `setup` and becomes active, unless already active.
    ///
    /// A failed setup leaves the state inactive and returns the error.
    pub fn activate<E>(&self, setup: impl FnOnce() -> Result<(), E>) -> Result<Activation, E> {
        let mut active = self.active.lock();
        if *active {
            return Ok(Activation::AlreadyActive);
        }
        setup()?;
        *active = true;
        Ok(Activation::Activated)
    }

    /// Runs `teardown` and becomes inactive. Returns false if already inactive.
    pub fn deactivate(&self, teardown: impl FnOnce()) -> bool {
        let mut active = self.active.lock();
        if !*active {
            return false;
        }
        *active = false;
        teardown();
        true
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn double_activate_runs_setup_once() {
        let state = EventState::new();
        let setups = AtomicUsize::new(0);
        let setup = || {
            setups.fetch_add(1, Ordering::SeqCst);
            Ok::<(), ()>(())
        };

        assert_eq!(state.activate(setup), Ok(Activation::Activated));
        assert_eq!(state.activate(setup), Ok(Activation::AlreadyActive));
        assert_eq!(setups.load(Ordering::SeqCst), 1);
        assert!(state.is_active());
    }

    #[test]
    fn failed_setup_stays_inactive() {
        let state = EventState::new();
        assert_eq!(state.activate(|| Err("no sensor")), Err("no sensor"));
        assert!(!state.is_active());

        // A later successful setup still activates.
        assert_eq!(state.activate(|| Ok::<(), &str>(())), Ok(Activation::Activated));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let state = EventState::new();
        let teardowns = AtomicUsize::new(0);
        assert!(!state.deactivate(|| {
            teardowns.fetch_add(1, Ordering::SeqCst);
        }));

        state.activate(|| Ok::<(), ()>(())).unwrap();
        assert!(state.deactivate(|| {
            teardowns.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!state.deactivate(|| {
            teardowns.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        assert!(!state.is_active());
    }

    #[test]
    fn concurrent_transitions_never_lose_setup_or_teardown() {
        let state = Arc::new(EventState::new());
        // +1 per setup, -1 per teardown: must mirror the final state.
        let balance = Arc::new(AtomicI64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                let balance = Arc::clone(&balance);
                thread::spawn(move || {
                    for j in 0..500 {
                        if (i + j) % 2 == 0 {
                            let _ = state.activate(|| {
                                balance.fetch_add(1, Ordering::SeqCst);
                                Ok::<(), ()>(())
                            });
                        } else {
                            state.deactivate(|| {
                                balance.fetch_sub(1, Ordering::SeqCst);
                            });
                        }
                        let b = balance.load(Ordering::SeqCst);
                        assert!(b == 0 || b == 1, "balance out of range: {b}");
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let expected = i64::from(state.is_active());
        assert_eq!(balance.load(Ordering::SeqCst), expected);
    }
}
