//! Sample collectors: one per metric domain, driven by the scheduler.

use crate::error::TelemetryError;
use crate::metrics::data::{ChannelStatus, Domain, MetricChannel, ValueKind};
use crate::metrics::series::RollingSeriesStore;
use crate::metrics::traits::{CpuLoadProvider, MemoryProvider};
use crate::metrics::view::{ChannelView, DashboardView};
use tracing::{debug, warn};

/// A collector pulls from its provider once per tick and owns the stores it
/// writes to.
///
/// `tick` is only ever called by the scheduler, never concurrently and at
/// most once per cadence. Provider failures are handled inside `tick`; they
/// never reach the scheduler.
pub trait SampleCollector: Send {
    /// The domain this collector feeds.
    fn domain(&self) -> Domain;

    /// Poll the provider and record the reading taken at `now` seconds.
    fn tick(&mut self, now: f64);

    /// Forget derived state before the scheduler (re)starts.
    fn reset(&mut self) {}

    /// Copy current contents into `view`.
    fn publish(&self, view: &mut DashboardView);
}

/// One series channel with its store and health.
#[derive(Debug, Clone)]
pub struct Channel {
    meta: MetricChannel,
    store: RollingSeriesStore,
    status: ChannelStatus,
    skipped_ticks: u64,
}

impl Channel {
    pub fn new(id: impl Into<String>, kind: ValueKind, capacity: usize) -> Self {
        let meta = MetricChannel::new(id, kind, capacity);
        Self {
            store: RollingSeriesStore::new(meta.capacity),
            meta,
            status: ChannelStatus::Available,
            skipped_ticks: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn store(&self) -> &RollingSeriesStore {
        &self.store
    }

    pub fn status(&self) -> &ChannelStatus {
        &self.status
    }

    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    /// Append one sample.
    pub fn record(&mut self, now: f64, value: f64) {
        if let Err(err) = self.store.append(now, value) {
            warn!(channel = %self.meta.id, "Dropping sample: {}", err);
            self.skipped_ticks += 1;
        }
    }

    /// Note a tick that produced no sample.
    pub fn skip(&mut self, err: &TelemetryError) {
        self.skipped_ticks += 1;
        debug!(channel = %self.meta.id, "Skipping tick: {}", err);
    }

    /// Stop accepting samples for good. Existing samples stay.
    pub fn mark_unavailable(&mut self, reason: impl Into<String>) {
        self.status = ChannelStatus::unavailable(reason);
    }

    pub fn view(&self) -> ChannelView {
        ChannelView {
            channel: self.meta.clone(),
            status: self.status.clone(),
            skipped_ticks: self.skipped_ticks,
            samples: self.store.snapshot(),
        }
    }
}

/// Per-core CPU utilization, one channel per core.
pub struct CpuCollector {
    provider: Box<dyn CpuLoadProvider>,
    capacity: usize,
    cores: Vec<Channel>,
}

impl CpuCollector {
    /// `cores` channels are created up front; more are added if the provider
    /// reports additional cores later.
    pub fn new(provider: Box<dyn CpuLoadProvider>, cores: usize, capacity: usize) -> Self {
        let cores = (0..cores)
            .map(|core| Channel::new(MetricChannel::cpu_core_id(core), ValueKind::Percent, capacity))
            .collect();
        Self {
            provider,
            capacity,
            cores,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.cores
    }
}

impl SampleCollector for CpuCollector {
    fn domain(&self) -> Domain {
        Domain::Cpu
    }

    fn tick(&mut self, now: f64) {
        match self.provider.per_core_usage() {
            Ok(usage) => {
                while self.cores.len() < usage.len() {
                    let id = MetricChannel::cpu_core_id(self.cores.len());
                    self.cores
                        .push(Channel::new(id, ValueKind::Percent, self.capacity));
                }
                let reported = usage.len();
                for (channel, value) in self.cores.iter_mut().zip(usage) {
                    channel.record(now, value.clamp(0.0, 100.0));
                }
                if reported < self.cores.len() {
                    let err = TelemetryError::provider_error(format!(
                        "only {} of {} cores reported",
                        reported,
                        self.cores.len()
                    ));
                    self.cores[reported..]
                        .iter_mut()
                        .for_each(|channel| channel.skip(&err));
                }
            }
            Err(err) => self.cores.iter_mut().for_each(|channel| channel.skip(&err)),
        }
    }

    fn publish(&self, view: &mut DashboardView) {
        for channel in &self.cores {
            view.channels.insert(channel.id().to_string(), channel.view());
        }
    }
}

/// Available memory as a percentage of total, on a single channel.
pub struct MemoryCollector {
    provider: Box<dyn MemoryProvider>,
    channel: Channel,
}

impl MemoryCollector {
    pub const CHANNEL_ID: &'static str = "memory.available";

    pub fn new(provider: Box<dyn MemoryProvider>, capacity: usize) -> Self {
        Self {
            provider,
            channel: Channel::new(Self::CHANNEL_ID, ValueKind::Percent, capacity),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

impl SampleCollector for MemoryCollector {
    fn domain(&self) -> Domain {
        Domain::Memory
    }

    fn tick(&mut self, now: f64) {
        match self.provider.memory() {
            Ok(reading) => self.channel.record(now, reading.available_percent()),
            Err(err) => self.channel.skip(&err),
        }
    }

    fn publish(&self, view: &mut DashboardView) {
        view.channels
            .insert(self.channel.id().to_string(), self.channel.view());
    }
}
