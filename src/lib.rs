//! # Vortex Telemetry
//!
//! Live hardware telemetry for a desktop dashboard, plus a small gateway for
//! per-core CPU tuning requests.
//!
//! ## Features
//!
//! - **Rolling series**: bounded per-channel histories for CPU cores, memory,
//!   network throughput and GPU utilization
//! - **Cooperative scheduling**: every collector ticks on its own cadence on
//!   one logical thread, with graceful stop
//! - **Actuation gateway**: validated multiplier requests forwarded to a native
//!   tuning library, probed once at startup
//! - **Read API**: published dashboard views over HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vortex_telemetry::{AppState, EngineConfig, TelemetryEngine, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = TelemetryEngine::new(EngineConfig::default())?;
//!     let web = WebConfig::default();
//!     let (state, commands) = AppState::for_engine(&engine, web.command_queue);
//!
//!     let handle = engine.handle();
//!     let engine_task = tokio::spawn(engine.run(commands));
//!     vortex_telemetry::start_web_server(web, state, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     handle.stop();
//!     engine_task.await?;
//!     Ok(())
//! }
//! ```

pub mod actuation;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod web;

// Re-export public API
pub use actuation::{ActuationGateway, TuningCapability, TuningLibrary};
pub use config::{EngineConfig, Preset};
pub use engine::{EngineCommand, Providers, TelemetryEngine};
pub use error::{Result, TelemetryError};
pub use metrics::{
    data::{
        ActuationError, ActuationResult, ChannelStatus, ControlValue, CoreControlState, Domain,
        MetricChannel, ProcessRecord, SystemSnapshot, ValueKind,
    },
    DashboardView, RollingSeriesStore, Sample, SampleCollector,
};
pub use scheduler::{Lifecycle, SchedulerHandle, TelemetryScheduler};
pub use web::{start_web_server, AppState, WebConfig};

/// The default number of samples kept per channel
pub const DEFAULT_CAPACITY: usize = 300;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;

/// The default location of the native tuning library
pub const DEFAULT_LIBRARY_PATH: &str = "./overclock.so";
