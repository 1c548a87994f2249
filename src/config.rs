//! Engine configuration.

use crate::error::{Result, TelemetryError};
use crate::metrics::data::Domain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Named domain sets matching the dashboard variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Every domain
    Full,
    /// CPU, memory, labels and processes
    Standard,
    /// CPU, memory and labels
    Minimal,
}

impl Preset {
    pub fn domains(&self) -> BTreeSet<Domain> {
        let domains: &[Domain] = match self {
            Preset::Full => &[
                Domain::Cpu,
                Domain::Memory,
                Domain::Network,
                Domain::Gpu,
                Domain::Labels,
                Domain::Processes,
            ],
            Preset::Standard => &[Domain::Cpu, Domain::Memory, Domain::Labels, Domain::Processes],
            Preset::Minimal => &[Domain::Cpu, Domain::Memory, Domain::Labels],
        };
        domains.iter().copied().collect()
    }
}

impl FromStr for Preset {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Preset::Full),
            "standard" => Ok(Preset::Standard),
            "minimal" => Ok(Preset::Minimal),
            other => Err(TelemetryError::config_error(format!(
                "Unknown preset '{}'. Use full, standard or minimal",
                other
            ))),
        }
    }
}

/// Configuration for the telemetry engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Metric domains to collect
    pub domains: BTreeSet<Domain>,
    /// Samples kept per channel
    pub capacity: usize,
    /// Period of the CPU, memory, network, GPU and label collectors
    pub fast_cadence: Duration,
    /// Period of the process snapshotter
    pub process_cadence: Duration,
    /// Path of the native tuning library
    pub library_path: PathBuf,
    /// Multipliers accepted by the gateway
    pub multiplier_range: RangeInclusive<i32>,
    /// Whether to probe for a GPU at all
    pub gpu_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domains: Preset::Full.domains(),
            capacity: crate::DEFAULT_CAPACITY,
            fast_cadence: Duration::from_secs(1),
            process_cadence: Duration::from_secs(3),
            library_path: PathBuf::from(crate::DEFAULT_LIBRARY_PATH),
            multiplier_range: 8..=255,
            gpu_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the domains of `preset`.
    pub fn from_preset(preset: Preset) -> Self {
        Self::default().with_preset(preset)
    }

    /// Replace the enabled domains with those of `preset`.
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.domains = preset.domains();
        self
    }

    /// Replace the enabled domains.
    pub fn with_domains(mut self, domains: impl IntoIterator<Item = Domain>) -> Self {
        self.domains = domains.into_iter().collect();
        self
    }

    /// Set the number of samples kept per channel.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the period of the fast collectors.
    pub fn with_fast_cadence(mut self, cadence: Duration) -> Self {
        self.fast_cadence = cadence;
        self
    }

    /// Set the period of the process snapshotter.
    pub fn with_process_cadence(mut self, cadence: Duration) -> Self {
        self.process_cadence = cadence;
        self
    }

    /// Set the tuning library path.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = path.into();
        self
    }

    /// Set the accepted multiplier range.
    pub fn with_multiplier_range(mut self, range: RangeInclusive<i32>) -> Self {
        self.multiplier_range = range;
        self
    }

    /// Enable or disable GPU probing.
    pub fn with_gpu(mut self, enabled: bool) -> Self {
        self.gpu_enabled = enabled;
        self
    }

    pub fn is_enabled(&self, domain: Domain) -> bool {
        self.domains.contains(&domain)
    }

    /// Check the values before the engine is built.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TelemetryError::config_error("Capacity must be at least 1"));
        }
        if self.fast_cadence.is_zero() || self.process_cadence.is_zero() {
            return Err(TelemetryError::config_error("Cadences must be greater than zero"));
        }
        if self.multiplier_range.is_empty() {
            return Err(TelemetryError::config_error("Multiplier range is empty"));
        }
        Ok(())
    }
}
