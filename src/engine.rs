//! The telemetry engine: collectors, scheduler and actuation gateway wired
//! together and driven by one cooperative loop.

use crate::actuation::{ActuationGateway, TuningCapability};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::metrics::data::{ActuationResult, Domain, SystemSnapshot};
use crate::metrics::gpu::{detect_gpu, GpuCollector};
use crate::metrics::traits::{
    CpuLoadProvider, FrequencyProvider, GpuProvider, MemoryProvider, NetworkCounterProvider,
    ProcessProvider,
};
use crate::metrics::{
    CpuCollector, DashboardView, LabelCollector, MemoryCollector, NetworkCollector,
    ProcessSnapshotter, SystemProvider,
};
use crate::scheduler::{SchedulerHandle, TelemetryScheduler};
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

/// The metric providers, one per collector.
pub struct Providers {
    pub cpu: Box<dyn CpuLoadProvider>,
    pub memory: Box<dyn MemoryProvider>,
    pub network: Box<dyn NetworkCounterProvider>,
    pub gpu: Option<Box<dyn GpuProvider>>,
    pub frequency: Box<dyn FrequencyProvider>,
    pub label_memory: Box<dyn MemoryProvider>,
    pub processes: Box<dyn ProcessProvider>,
}

impl Providers {
    /// Providers backed by the running system. The GPU is probed only when
    /// `probe_gpu` is set.
    pub fn system(probe_gpu: bool) -> Self {
        Self {
            cpu: Box::new(SystemProvider::new()),
            memory: Box::new(SystemProvider::new()),
            network: Box::new(SystemProvider::new()),
            gpu: if probe_gpu { detect_gpu() } else { None },
            frequency: Box::new(SystemProvider::new()),
            label_memory: Box::new(SystemProvider::new()),
            processes: Box::new(SystemProvider::new()),
        }
    }
}

/// Requests handled on the engine loop, between collector ticks.
#[derive(Debug)]
pub enum EngineCommand {
    SetMultiplier {
        core: i32,
        value: i32,
        reply: oneshot::Sender<ActuationResult>,
    },
    SetVoltage {
        core: i32,
        value: f64,
        reply: oneshot::Sender<ActuationResult>,
    },
}

/// Owns every collector and the gateway, and publishes read-only
/// [`DashboardView`]s after each scheduler step and each actuation.
pub struct TelemetryEngine {
    identity: Arc<SystemSnapshot>,
    scheduler: TelemetryScheduler,
    gateway: ActuationGateway,
    last_actuation: Option<ActuationResult>,
    updates: watch::Sender<Arc<DashboardView>>,
}

impl TelemetryEngine {
    /// Build an engine on the running system: capture identity, bind system
    /// providers and probe the tuning library.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let identity = SystemSnapshot::capture();
        let providers = Providers::system(config.gpu_enabled && config.is_enabled(Domain::Gpu));
        let capability = TuningCapability::probe(&config.library_path);
        Self::from_parts(config, identity, providers, capability)
    }

    /// Build an engine from explicit parts.
    pub fn from_parts(
        config: EngineConfig,
        identity: SystemSnapshot,
        providers: Providers,
        capability: TuningCapability,
    ) -> Result<Self> {
        config.validate()?;
        let Providers {
            cpu,
            memory,
            network,
            gpu,
            frequency,
            label_memory,
            processes,
        } = providers;
        let capacity = config.capacity;
        let fast = config.fast_cadence;

        let mut scheduler = TelemetryScheduler::new();
        if config.is_enabled(Domain::Cpu) {
            let collector = CpuCollector::new(cpu, identity.cpu.threads, capacity);
            scheduler.register(Box::new(collector), fast)?;
        }
        if config.is_enabled(Domain::Memory) {
            scheduler.register(Box::new(MemoryCollector::new(memory, capacity)), fast)?;
        }
        if config.is_enabled(Domain::Network) {
            scheduler.register(Box::new(NetworkCollector::new(network, capacity)), fast)?;
        }
        if config.is_enabled(Domain::Gpu) {
            let gpu = if config.gpu_enabled { gpu } else { None };
            scheduler.register(Box::new(GpuCollector::new(gpu, capacity)), fast)?;
        }
        if config.is_enabled(Domain::Labels) {
            scheduler.register(Box::new(LabelCollector::new(frequency, label_memory)), fast)?;
        }
        if config.is_enabled(Domain::Processes) {
            scheduler.register(
                Box::new(ProcessSnapshotter::new(processes)),
                config.process_cadence,
            )?;
        }

        let gateway = ActuationGateway::new(
            capability,
            identity.cpu.physical_cores,
            config.multiplier_range.clone(),
        );
        info!(
            domains = ?config.domains,
            cores = identity.cpu.physical_cores,
            tuning_library = gateway.capability().is_bound(),
            "Telemetry engine ready"
        );

        let (updates, _) = watch::channel(Arc::new(DashboardView::default()));
        let engine = Self {
            identity: Arc::new(identity),
            scheduler,
            gateway,
            last_actuation: None,
            updates,
        };
        engine.publish();
        Ok(engine)
    }

    pub fn identity(&self) -> Arc<SystemSnapshot> {
        Arc::clone(&self.identity)
    }

    /// Handle for stopping the loop started by [`run`](Self::run).
    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn scheduler(&self) -> &TelemetryScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TelemetryScheduler {
        &mut self.scheduler
    }

    pub fn gateway(&self) -> &ActuationGateway {
        &self.gateway
    }

    /// Forward a multiplier request through the gateway.
    pub fn set_multiplier(&mut self, core: i32, value: i32) -> ActuationResult {
        let result = self.gateway.set_multiplier(core, value);
        self.record_actuation(result)
    }

    /// Record a display-only voltage request.
    pub fn set_voltage(&mut self, core: i32, value: f64) -> ActuationResult {
        let result = self.gateway.set_voltage(core, value);
        self.record_actuation(result)
    }

    fn record_actuation(&mut self, result: ActuationResult) -> ActuationResult {
        info!("{}", result.status_text());
        self.last_actuation = Some(result.clone());
        self.publish();
        result
    }

    /// Build a fresh view of every collector's current contents.
    pub fn view(&self) -> DashboardView {
        let mut view = DashboardView {
            elapsed: self.scheduler.elapsed(),
            lifecycle: self.scheduler.lifecycle(),
            cores: self.gateway.core_states().to_vec(),
            last_actuation: self.last_actuation.clone(),
            ..DashboardView::default()
        };
        for collector in self.scheduler.collectors() {
            collector.publish(&mut view);
        }
        view
    }

    /// Receiver that always holds the latest published view.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.updates.subscribe()
    }

    /// Stream of published views, starting with the current one.
    pub fn updates(&self) -> BoxStream<'static, Arc<DashboardView>> {
        WatchStream::new(self.subscribe()).boxed()
    }

    fn publish(&self) {
        self.updates.send_replace(Arc::new(self.view()));
    }

    /// Run whatever is due right now and publish.
    pub fn step(&mut self) -> usize {
        self.step_at(self.scheduler.elapsed())
    }

    /// Run whatever is due at `now` seconds since start and publish.
    pub fn step_at(&mut self, now: f64) -> usize {
        let fired = self.scheduler.run_due(now);
        if fired > 0 {
            debug!(fired, elapsed = now, "Scheduler step");
        }
        self.publish();
        fired
    }

    pub fn handle_command(&mut self, command: EngineCommand) {
        let (result, reply) = match command {
            EngineCommand::SetMultiplier { core, value, reply } => {
                (self.set_multiplier(core, value), reply)
            }
            EngineCommand::SetVoltage { core, value, reply } => {
                (self.set_voltage(core, value), reply)
            }
        };
        if reply.send(result).is_err() {
            debug!("Actuation requester went away before the reply");
        }
    }

    /// Start the scheduler and drive it until stopped, serving actuation
    /// commands between ticks. Returns the engine once drained.
    pub async fn run(mut self, mut commands: mpsc::Receiver<EngineCommand>) -> Self {
        self.scheduler.start();
        self.publish();

        let handle = self.scheduler.handle();
        let mut commands_open = true;

        while self.scheduler.is_running() {
            let due = self.scheduler.next_due();
            let deadline = self.scheduler.next_deadline();
            tokio::select! {
                _ = sleep_until(deadline) => {
                    // Clock rounding must not leave the due task unfired
                    let now = self.scheduler.elapsed().max(due.unwrap_or(0.0));
                    self.step_at(now);
                }
                _ = handle.stop_requested() => {}
                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => commands_open = false,
                },
            }
        }

        self.scheduler.finish();
        self.publish();
        self
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
