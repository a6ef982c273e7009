//! Shared fixed-rate timer for periodic sampling.
//!
//! A single worker thread owns every scheduled task and is driven by a
//! control channel. Tasks run on the worker, one at a time; a slow task
//! delays the others, and periods missed while it ran are skipped rather than
//! replayed.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{SigmonError, SigmonResult};

/// Upper bound on how long the worker sleeps without checking for control messages.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Longest accepted delay or period; larger values are clamped.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 3600);

type Task = Box<dyn FnMut() + Send>;

enum Control {
    Schedule {
        id: u64,
        first_run: Instant,
        period: Duration,
        cancelled: Arc<AtomicBool>,
        task: Task,
    },
    Cancel {
        id: u64,
    },
    Shutdown,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Name of the worker thread.
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "sigmon-scheduler".to_string(),
        }
    }
}

struct Inner {
    control_tx: Sender<Control>,
    next_id: AtomicU64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
        if let Some(handle) = self.join.lock().take() {
            // A task may hold the last handle; never join the worker from itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Cloneable handle to a fixed-rate task pool.
///
/// The worker stops when the last handle is dropped; outstanding
/// [`ScheduledTask`]s then become inert.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Starts a scheduler with the default configuration.
    pub fn new() -> SigmonResult<Self> {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> SigmonResult<Self> {
        let (control_tx, control_rx) = unbounded::<Control>();
        let join = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(&control_rx))
            .map_err(|e| SigmonError::internal(format!("failed to spawn {}: {e}", config.thread_name)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                control_tx,
                next_id: AtomicU64::new(1),
                join: Mutex::new(Some(join)),
            }),
        })
    }

    /// Runs `task` now and then every `period` until cancelled.
    pub fn schedule_at_fixed_rate(&self, period: Duration, task: impl FnMut() + Send + 'static) -> ScheduledTask {
        self.schedule_with_delay(Duration::ZERO, period, task)
    }

    /// Runs `task` after `initial_delay` and then every `period` until cancelled.
    ///
    /// A zero period is raised to one millisecond; delays and periods above
    /// [`MAX_PERIOD`] are clamped to it.
    pub fn schedule_with_delay(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: impl FnMut() + Send + 'static,
    ) -> ScheduledTask {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let period = period.clamp(Duration::from_millis(1), MAX_PERIOD);
        let cancelled = Arc::new(AtomicBool::new(false));
        let sent = self.inner.control_tx.send(Control::Schedule {
            id,
            first_run: Instant::now() + initial_delay.min(MAX_PERIOD),
            period,
            cancelled: Arc::clone(&cancelled),
            task: Box::new(task),
        });
        if sent.is_err() {
            warn!(task = id, "Scheduler worker is gone, task will not run");
        }
        ScheduledTask {
            id,
            period,
            control_tx: self.inner.control_tx.clone(),
            cancelled,
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("scheduled", &self.inner.next_id.load(Ordering::Relaxed).saturating_sub(1))
            .finish()
    }
}

/// Handle of a scheduled task. Cancels the task when dropped.
#[derive(Debug)]
pub struct ScheduledTask {
    id: u64,
    period: Duration,
    control_tx: Sender<Control>,
    cancelled: Arc<AtomicBool>,
}

impl ScheduledTask {
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Stops future runs. A run already in progress completes; no run starts
    /// after this returns, even before the worker drops the task.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.control_tx.send(Control::Cancel { id: self.id });
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Entry {
    next_run: Instant,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    task: Task,
}

fn worker_loop(control_rx: &Receiver<Control>) {
    let mut tasks: HashMap<u64, Entry> = HashMap::new();
    let mut shutdown = false;

    loop {
        let wait = tasks
            .values()
            .map(|e| e.next_run)
            .min()
            .map_or(IDLE_WAIT, |due| due.saturating_duration_since(Instant::now()));

        select! {
            recv(control_rx) -> msg => {
                match msg {
                    Ok(Control::Schedule { id, first_run, period, cancelled, task }) => {
                        tasks.insert(id, Entry { next_run: first_run, period, cancelled, task });
                    }
                    Ok(Control::Cancel { id }) => {
                        tasks.remove(&id);
                    }
                    Ok(Control::Shutdown) | Err(_) => {
                        shutdown = true;
                    }
                }
            }
            default(wait) => {}
        }

        if shutdown {
            break;
        }

        run_due(&mut tasks);
    }

    debug!(remaining = tasks.len(), "Scheduler worker stopped");
}

fn run_due(tasks: &mut HashMap<u64, Entry>) {
    let now = Instant::now();
    tasks.retain(|_, entry| !entry.cancelled.load(Ordering::Acquire));
    for (id, entry) in tasks.iter_mut() {
        if entry.next_run > now || entry.cancelled.load(Ordering::Acquire) {
            continue;
        }
        if catch_unwind(AssertUnwindSafe(|| (entry.task)())).is_err() {
            warn!(task = *id, "Scheduled task panicked");
        }
        entry.next_run = next_run_after(entry.next_run, entry.period, Instant::now());
    }
}

/// First slot of the fixed-rate grid strictly after `now`.
fn next_run_after(scheduled: Instant, period: Duration, now: Instant) -> Instant {
    let next = scheduled + period;
    if next > now {
        return next;
    }
    let behind = now.duration_since(next).as_nanos();
    let skipped = u32::try_from(behind / period.as_nanos() + 1).unwrap_or(u32::MAX);
    period
        .checked_mul(skipped)
        .and_then(|offset| next.checked_add(offset))
        .unwrap_or(now + period)
}
