//! GPU utilization monitoring.
//!
//! The NVIDIA backend is feature-gated (`nvml`) so the crate builds on
//! machines without the NVML runtime. Without a provider the GPU channel is
//! marked unavailable once and never polled.

use crate::error::{Result, TelemetryError};
use crate::metrics::collector::{Channel, SampleCollector};
use crate::metrics::data::{ChannelStatus, Domain, ValueKind};
use crate::metrics::traits::GpuProvider;
use crate::metrics::view::DashboardView;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Reason shown when no GPU provider could be bound.
pub const GPU_UNAVAILABLE: &str = "GPU info not available";

/// Latest GPU identity and clock, shown next to the utilization series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuDetails {
    pub status: ChannelStatus,
    pub name: Option<String>,
    pub utilization_percent: Option<f64>,
    pub graphics_clock_mhz: Option<u32>,
}

impl GpuDetails {
    /// Multi-line summary for the GPU panel.
    pub fn info_text(&self) -> String {
        match (&self.status, &self.name) {
            (ChannelStatus::Available, Some(name)) => format!(
                "GPU: {}\nUtilization: {}%\nGraphics Clock: {} MHz",
                name,
                self.utilization_percent.unwrap_or_default(),
                self.graphics_clock_mhz.unwrap_or_default()
            ),
            (ChannelStatus::Unavailable { reason }, _) => reason.clone(),
            (ChannelStatus::Available, None) => "GPU info pending".to_string(),
        }
    }
}

/// Utilization series for the first GPU.
pub struct GpuCollector {
    provider: Option<Box<dyn GpuProvider>>,
    channel: Channel,
    details: GpuDetails,
}

impl GpuCollector {
    pub const CHANNEL_ID: &'static str = "gpu.utilization";

    pub fn new(provider: Option<Box<dyn GpuProvider>>, capacity: usize) -> Self {
        let mut channel = Channel::new(Self::CHANNEL_ID, ValueKind::Percent, capacity);
        let status = if provider.is_some() {
            ChannelStatus::Available
        } else {
            channel.mark_unavailable(GPU_UNAVAILABLE);
            ChannelStatus::unavailable(GPU_UNAVAILABLE)
        };

        Self {
            provider,
            channel,
            details: GpuDetails {
                status,
                name: None,
                utilization_percent: None,
                graphics_clock_mhz: None,
            },
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn details(&self) -> &GpuDetails {
        &self.details
    }

    fn disable(&mut self, reason: String) {
        warn!("GPU monitoring disabled: {}", reason);
        self.provider = None;
        self.channel.mark_unavailable(reason.clone());
        self.details.status = ChannelStatus::Unavailable { reason };
    }
}

impl SampleCollector for GpuCollector {
    fn domain(&self) -> Domain {
        Domain::Gpu
    }

    fn tick(&mut self, now: f64) {
        let Some(provider) = self.provider.as_mut() else {
            return;
        };

        match provider.read() {
            Ok(reading) => {
                let utilization = reading.utilization_percent.clamp(0.0, 100.0);
                self.channel.record(now, utilization);
                self.details.name = Some(reading.name);
                self.details.utilization_percent = Some(utilization);
                self.details.graphics_clock_mhz = Some(reading.graphics_clock_mhz);
            }
            Err(err) if err.is_unavailable() => self.disable(err.to_string()),
            Err(err) => self.channel.skip(&err),
        }
    }

    fn publish(&self, view: &mut DashboardView) {
        view.channels
            .insert(self.channel.id().to_string(), self.channel.view());
        view.gpu = Some(self.details.clone());
    }
}

/// Probe for a usable GPU backend.
pub fn detect_gpu() -> Option<Box<dyn GpuProvider>> {
    match probe_backend() {
        Ok(provider) => {
            info!("GPU monitoring enabled");
            Some(provider)
        }
        Err(err) => {
            warn!("{}: {}", GPU_UNAVAILABLE, err);
            None
        }
    }
}

#[cfg(feature = "nvml")]
fn probe_backend() -> Result<Box<dyn GpuProvider>> {
    Ok(Box::new(nvidia::NvmlGpu::probe()?))
}

#[cfg(not(feature = "nvml"))]
fn probe_backend() -> Result<Box<dyn GpuProvider>> {
    Err(TelemetryError::unavailable(
        "built without the `nvml` feature",
    ))
}

#[cfg(feature = "nvml")]
mod nvidia {
    use super::*;
    use crate::metrics::traits::GpuReading;
    use nvml_wrapper::enum_wrappers::device::Clock;
    use nvml_wrapper::Nvml;

    /// NVIDIA GPU provider using NVML.
    pub struct NvmlGpu {
        nvml: Nvml,
        index: u32,
    }

    impl NvmlGpu {
        /// Initialize NVML and make sure at least one device is present.
        pub fn probe() -> Result<Self> {
            let nvml = Nvml::init().map_err(|e| {
                TelemetryError::unavailable(format!("NVML not available: {}", e))
            })?;
            let count = nvml.device_count().map_err(|e| {
                TelemetryError::unavailable(format!("Failed to count NVIDIA devices: {}", e))
            })?;
            if count == 0 {
                return Err(TelemetryError::unavailable("No NVIDIA GPU found"));
            }
            Ok(Self { nvml, index: 0 })
        }
    }

    impl GpuProvider for NvmlGpu {
        fn read(&mut self) -> Result<GpuReading> {
            let device = self
                .nvml
                .device_by_index(self.index)
                .map_err(|e| TelemetryError::provider_error(format!("NVML device: {}", e)))?;
            let utilization = device
                .utilization_rates()
                .map_err(|e| TelemetryError::provider_error(format!("NVML utilization: {}", e)))?;
            let graphics_clock_mhz = device.clock_info(Clock::Graphics).unwrap_or(0);
            let name = device
                .name()
                .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string());

            Ok(GpuReading {
                name,
                utilization_percent: utilization.gpu as f64,
                graphics_clock_mhz,
            })
        }
    }
}
