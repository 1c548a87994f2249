//! Metric collection: providers, rolling series and per-domain collectors.
//!
//! Providers ([`traits`]) return instantaneous readings. Collectors
//! ([`collector`] and friends) poll them on each scheduler tick and own the
//! rolling stores ([`series`]) the rendering layer reads through
//! [`view::DashboardView`].

pub mod collector;
pub mod data;
pub mod gpu;
pub mod identity;
pub mod labels;
pub mod network;
pub mod process;
pub mod series;
pub mod system;
pub mod traits;
pub mod view;

// Re-export commonly used items
pub use collector::{Channel, CpuCollector, MemoryCollector, SampleCollector};
pub use data::SystemSnapshot;
pub use gpu::GpuCollector;
pub use labels::LabelCollector;
pub use network::NetworkCollector;
pub use process::ProcessSnapshotter;
pub use series::{RollingSeriesStore, Sample};
pub use system::SystemProvider;
pub use view::DashboardView;
