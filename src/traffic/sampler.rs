use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::delta::supported;
use crate::error::ActivationError;
use crate::monitor::{IngestOutcome, ReadingSink, SignalSource};
use crate::observation::EventKind;
use crate::options::{self, Options};
use crate::reading::{CounterSnapshot, RawReading};
use crate::scheduler::{ScheduledTask, Scheduler};

/// Default sampling period of the traffic kinds.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Reads the platform traffic counters.
pub trait CounterSource: Send + Sync {
    /// Current value of every counter; unsupported counters read `-1`.
    fn snapshot(&self) -> CounterSnapshot;
}

impl<F> CounterSource for F
where
    F: Fn() -> CounterSnapshot + Send + Sync,
{
    fn snapshot(&self) -> CounterSnapshot {
        self()
    }
}

/// Periodically pushes counter snapshots into the traffic kinds.
///
/// Each active kind gets its own task on the shared scheduler, running every
/// `update_interval_seconds` (default 10). The first push happens one period
/// after activation.
pub struct TrafficSampler {
    counters: Arc<dyn CounterSource>,
    scheduler: Scheduler,
    tasks: Mutex<HashMap<EventKind, ScheduledTask>>,
}

impl TrafficSampler {
    #[must_use]
    pub fn new(counters: Arc<dyn CounterSource>, scheduler: Scheduler) -> Self {
        Self {
            counters,
            scheduler,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Sampling period of `kind`, if it is running.
    #[must_use]
    pub fn interval(&self, kind: EventKind) -> Option<Duration> {
        self.tasks.lock().get(&kind).map(ScheduledTask::period)
    }

    fn probe(&self, kind: EventKind) -> Result<(), ActivationError> {
        let snapshot = self.counters.snapshot();
        let (counter, value) = match kind {
            EventKind::TrafficMobile => ("mobile rx bytes", snapshot.mobile.rx_bytes),
            EventKind::TrafficWifi | EventKind::TrafficApplication => ("total rx bytes", snapshot.total.rx_bytes),
            _ => return Err(ActivationError::capability_absent(kind, "not a traffic kind")),
        };
        if supported(value).is_none() {
            return Err(ActivationError::capability_absent(kind, format!("{counter} unsupported")));
        }
        Ok(())
    }
}

impl SignalSource for TrafficSampler {
    fn start(&self, kind: EventKind, options: &Options, sink: ReadingSink) -> Result<(), ActivationError> {
        self.probe(kind)?;

        let interval = options.duration_seconds(options::UPDATE_INTERVAL_SECONDS, DEFAULT_SAMPLE_INTERVAL);
        let counters = Arc::clone(&self.counters);
        let task = self.scheduler.schedule_with_delay(interval, interval, move || {
            let outcome = sink.push(RawReading::Counters(counters.snapshot()));
            if outcome != IngestOutcome::Refused {
                trace!(kind = ?sink.kind(), ?outcome, "Traffic sample pushed");
            }
        });
        debug!(kind = ?kind, ?interval, "Traffic sampling started");

        // Replacing an old task drops it, which cancels it.
        self.tasks.lock().insert(kind, task);
        Ok(())
    }

    fn stop(&self, kind: EventKind) {
        if let Some(task) = self.tasks.lock().remove(&kind) {
            task.cancel();
            debug!(kind = ?kind, "Traffic sampling stopped");
        }
    }
}

impl std::fmt::Debug for TrafficSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficSampler")
            .field("kinds", &self.tasks.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Monitor;
    use crate::reading::InterfaceCounters;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Instant;

    struct Counters {
        mobile_rx: AtomicI64,
    }

    impl CounterSource for Counters {
        fn snapshot(&self) -> CounterSnapshot {
            let rx = self.mobile_rx.fetch_add(100, Ordering::SeqCst);
            CounterSnapshot {
                mobile: InterfaceCounters::bytes(rx, 0),
                total: InterfaceCounters::bytes(rx, 0),
                ..CounterSnapshot::default()
            }
        }
    }

    fn fast() -> Options {
        Options::new().with(options::UPDATE_INTERVAL_SECONDS, 0.01)
    }

    #[test]
    fn unsupported_counter_is_capability_absent() {
        let sampler = Arc::new(TrafficSampler::new(
            Arc::new(CounterSnapshot::default),
            Scheduler::new().unwrap(),
        ));
        let monitor = Monitor::builder()
            .with_standard_processors()
            .source(EventKind::TRAFFIC, sampler.clone())
            .build();

        let err = monitor.activate(EventKind::TrafficMobile, &fast()).unwrap_err();
        assert!(matches!(err, ActivationError::CapabilityAbsent { kind: EventKind::TrafficMobile, .. }));
        assert!(!monitor.is_active(EventKind::TrafficMobile));
        assert!(sampler.interval(EventKind::TrafficMobile).is_none());
    }

    #[test]
    fn samples_flow_until_deactivated() {
        let counters = Arc::new(Counters {
            mobile_rx: AtomicI64::new(1_000),
        });
        let sampler = Arc::new(TrafficSampler::new(counters, Scheduler::new().unwrap()));
        let monitor = Monitor::builder()
            .with_standard_processors()
            .source(EventKind::TRAFFIC, sampler.clone())
            .build();
        let stream = monitor.stream(EventKind::TrafficMobile).unwrap();

        monitor.activate(EventKind::TrafficMobile, &fast()).unwrap();
        assert_eq!(sampler.interval(EventKind::TrafficMobile), Some(Duration::from_millis(10)));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut growth = Vec::new();
        while growth.len() < 3 && Instant::now() < deadline {
            if let Ok(obs) = stream.recv_timeout(Duration::from_millis(100)) {
                growth.push(obs.as_traffic().map(|t| t.rx_bytes));
            }
        }
        // Activation re-baselines, so the first pushed snapshot yields zero.
        assert_eq!(growth.first(), Some(&Some(0)));
        assert!(growth[1..].iter().all(|g| g.is_some_and(|rx| rx >= 100)));

        assert!(monitor.deactivate(EventKind::TrafficMobile));
        assert!(sampler.interval(EventKind::TrafficMobile).is_none());
    }
}
