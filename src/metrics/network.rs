//! Network throughput derived from cumulative byte counters.

use crate::metrics::collector::{Channel, SampleCollector};
use crate::metrics::data::{Domain, ValueKind};
use crate::metrics::traits::{NetworkCounterProvider, NetworkCounters};
use crate::metrics::view::DashboardView;

const BYTES_PER_KB: f64 = 1024.0;

/// Turns successive counter readings into KB/s rates.
///
/// The first reading after construction or [`reset`](RateTracker::reset) has
/// nothing to diff against and yields zero in both directions.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    previous: Option<(f64, NetworkCounters)>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the counters read at `now`, returning `(up, down)` in KB/s.
    pub fn update(&mut self, now: f64, current: NetworkCounters) -> (f64, f64) {
        match self.previous {
            Some((then, previous)) if now > then => {
                let elapsed = now - then;
                self.previous = Some((now, current));
                (
                    rate(previous.bytes_sent, current.bytes_sent, elapsed),
                    rate(previous.bytes_received, current.bytes_received, elapsed),
                )
            }
            // No time has passed: keep the baseline so the delta is not lost
            Some(_) => (0.0, 0.0),
            None => {
                self.previous = Some((now, current));
                (0.0, 0.0)
            }
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// A counter that went backwards (interface reset) reads as zero throughput.
fn rate(previous: u64, current: u64, elapsed: f64) -> f64 {
    current.saturating_sub(previous) as f64 / BYTES_PER_KB / elapsed
}

/// Upload and download throughput channels.
pub struct NetworkCollector {
    provider: Box<dyn NetworkCounterProvider>,
    tracker: RateTracker,
    up: Channel,
    down: Channel,
}

impl NetworkCollector {
    pub const UP_CHANNEL_ID: &'static str = "network.up";
    pub const DOWN_CHANNEL_ID: &'static str = "network.down";

    pub fn new(provider: Box<dyn NetworkCounterProvider>, capacity: usize) -> Self {
        Self {
            provider,
            tracker: RateTracker::new(),
            up: Channel::new(Self::UP_CHANNEL_ID, ValueKind::Rate, capacity),
            down: Channel::new(Self::DOWN_CHANNEL_ID, ValueKind::Rate, capacity),
        }
    }

    pub fn up(&self) -> &Channel {
        &self.up
    }

    pub fn down(&self) -> &Channel {
        &self.down
    }
}

impl SampleCollector for NetworkCollector {
    fn domain(&self) -> Domain {
        Domain::Network
    }

    fn tick(&mut self, now: f64) {
        match self.provider.counters() {
            Ok(counters) => {
                let (up, down) = self.tracker.update(now, counters);
                self.up.record(now, up);
                self.down.record(now, down);
            }
            Err(err) => {
                self.up.skip(&err);
                self.down.skip(&err);
            }
        }
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }

    fn publish(&self, view: &mut DashboardView) {
        for channel in [&self.up, &self.down] {
            view.channels
                .insert(channel.id().to_string(), channel.view());
        }
    }
}
