//! Cooperative scheduler driving collectors on independent cadences.

use crate::error::{Result, TelemetryError};
use crate::metrics::collector::SampleCollector;
use crate::metrics::data::Domain;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

/// Scheduler lifecycle, changed only through `start()` and `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Stopped,
    Running,
    /// Stop requested; the tick in flight finishes, nothing new is scheduled
    Draining,
}

impl Lifecycle {
    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::Stopped => 0,
            Lifecycle::Running => 1,
            Lifecycle::Draining => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Lifecycle::Running,
            2 => Lifecycle::Draining,
            _ => Lifecycle::Stopped,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: AtomicU8,
    wake: Notify,
}

impl Shared {
    fn load(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn store(&self, lifecycle: Lifecycle) {
        self.state.store(lifecycle.as_u8(), Ordering::SeqCst);
    }
}

/// Cloneable handle for stopping a scheduler from elsewhere, including from
/// inside a collector's tick.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Request a graceful stop. Only has an effect while running.
    pub fn stop(&self) {
        let switched = self
            .shared
            .state
            .compare_exchange(
                Lifecycle::Running.as_u8(),
                Lifecycle::Draining.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if switched {
            debug!("Scheduler stop requested");
            self.shared.wake.notify_one();
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.load()
    }

    /// Resolves once a stop has been requested.
    pub async fn stop_requested(&self) {
        self.shared.wake.notified().await
    }
}

struct Task {
    collector: Box<dyn SampleCollector>,
    period: f64,
    next_due: f64,
    ticks: u64,
}

/// Holds `(collector, period, next due time)` entries and fires each
/// collector when its time comes.
///
/// All ticks run one after another on the caller's thread; time is measured
/// in seconds since `start()`. Cadences are independent and need not line up.
pub struct TelemetryScheduler {
    tasks: Vec<Task>,
    shared: Arc<Shared>,
    started_at: Option<Instant>,
}

impl TelemetryScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shared: Arc::new(Shared::default()),
            started_at: None,
        }
    }

    /// Register a collector with a fixed period.
    pub fn register(
        &mut self,
        collector: Box<dyn SampleCollector>,
        period: Duration,
    ) -> Result<()> {
        if period.is_zero() {
            return Err(TelemetryError::config_error(format!(
                "Cadence for {} must be greater than zero",
                collector.domain()
            )));
        }
        debug!(domain = %collector.domain(), ?period, "Registered collector");
        self.tasks.push(Task {
            collector,
            period: period.as_secs_f64(),
            next_due: 0.0,
            ticks: 0,
        });
        Ok(())
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.load()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Begin firing. Every collector is reset and due immediately.
    ///
    /// The clock starts on the first call and keeps running across restarts,
    /// so samples taken after a restart never predate the ones already
    /// stored. Starting while draining cancels the pending stop and keeps the
    /// current schedule.
    pub fn start(&mut self) {
        match self.lifecycle() {
            Lifecycle::Running => {}
            Lifecycle::Draining => self.shared.store(Lifecycle::Running),
            Lifecycle::Stopped => {
                let now = match self.started_at {
                    Some(_) => self.elapsed(),
                    None => {
                        self.started_at = Some(Instant::now());
                        0.0
                    }
                };
                for task in &mut self.tasks {
                    task.collector.reset();
                    task.next_due = now;
                }
                self.shared.store(Lifecycle::Running);
                info!("Scheduler started with {} collectors", self.tasks.len());
            }
        }
    }

    /// Request a graceful stop, same as [`SchedulerHandle::stop`].
    pub fn stop(&self) {
        self.handle().stop();
    }

    /// Seconds since the first `start()`.
    pub fn elapsed(&self) -> f64 {
        self.started_at
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Earliest due time, in seconds since start, while running.
    pub fn next_due(&self) -> Option<f64> {
        if !self.is_running() {
            return None;
        }
        self.tasks
            .iter()
            .map(|task| task.next_due)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Earliest due time as a clock deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        let started = self.started_at?;
        self.next_due()
            .map(|due| started + Duration::from_secs_f64(due.max(0.0)))
    }

    /// Fire every collector due at `now`, earliest first, and reschedule it.
    ///
    /// The running flag is consulted before each tick and before each
    /// rescheduling decision: a tick that has begun always completes, but
    /// after a stop nothing else starts and nothing is rescheduled. A
    /// draining scheduler becomes stopped when this returns.
    pub fn run_due(&mut self, now: f64) -> usize {
        let mut fired = 0;

        while self.is_running() {
            let due = self
                .tasks
                .iter()
                .enumerate()
                .filter(|(_, task)| task.next_due <= now)
                .min_by(|(_, a), (_, b)| a.next_due.total_cmp(&b.next_due))
                .map(|(index, _)| index);
            let Some(index) = due else {
                break;
            };

            let task = &mut self.tasks[index];
            task.collector.tick(now);
            task.ticks += 1;
            fired += 1;

            if self.is_running() {
                let task = &mut self.tasks[index];
                task.next_due = next_due_after(task.next_due, task.period, now);
            }
        }

        if self.lifecycle() == Lifecycle::Draining {
            self.finish();
        }
        fired
    }

    /// Complete a pending stop.
    pub fn finish(&mut self) {
        if self.lifecycle() != Lifecycle::Stopped {
            self.shared.store(Lifecycle::Stopped);
            info!("Scheduler stopped after {:.1}s", self.elapsed());
        }
    }

    pub fn collectors(&self) -> impl Iterator<Item = &dyn SampleCollector> + '_ {
        self.tasks.iter().map(|task| task.collector.as_ref())
    }

    /// Number of completed ticks for a domain's collector.
    pub fn ticks(&self, domain: Domain) -> Option<u64> {
        self.tasks
            .iter()
            .find(|task| task.collector.domain() == domain)
            .map(|task| task.ticks)
    }
}

impl Default for TelemetryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-rate rescheduling. When the loop fell behind by a whole period or
/// more, skip ahead instead of firing a burst of catch-up ticks.
fn next_due_after(due: f64, period: f64, now: f64) -> f64 {
    let next = due + period;
    if next <= now {
        now + period
    } else {
        next
    }
}
