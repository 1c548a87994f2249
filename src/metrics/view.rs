//! Read-only views handed to the rendering layer.

use crate::metrics::data::{
    ActuationResult, ChannelStatus, CoreControlState, MetricChannel, ProcessRecord,
};
use crate::metrics::gpu::GpuDetails;
use crate::metrics::labels::InfoLabels;
use crate::metrics::series::Sample;
use crate::scheduler::Lifecycle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of one channel: metadata, status and its samples, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelView {
    pub channel: MetricChannel,
    pub status: ChannelStatus,
    /// Ticks that contributed no sample because the provider failed
    pub skipped_ticks: u64,
    pub samples: Vec<Sample>,
}

/// Everything the rendering layer may show, at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    /// Seconds since the scheduler started
    pub elapsed: f64,
    pub lifecycle: Lifecycle,
    /// Series channels keyed by channel id
    pub channels: BTreeMap<String, ChannelView>,
    /// Present when the labels domain is enabled
    pub labels: Option<InfoLabels>,
    /// Present when the GPU domain is enabled
    pub gpu: Option<GpuDetails>,
    /// Present when the process domain is enabled
    pub processes: Option<Vec<ProcessRecord>>,
    pub cores: Vec<CoreControlState>,
    /// Outcome of the most recent actuation request, for the status line
    pub last_actuation: Option<ActuationResult>,
}

impl DashboardView {
    pub fn channel(&self, id: &str) -> Option<&ChannelView> {
        self.channels.get(id)
    }
}
