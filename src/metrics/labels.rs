//! Current-value labels: per-core clock speeds and available memory.
//!
//! These are not series. Only the most recent formatted text is kept.

use crate::metrics::collector::SampleCollector;
use crate::metrics::data::Domain;
use crate::metrics::traits::{FrequencyProvider, MemoryProvider};
use crate::metrics::view::DashboardView;
use serde::{Deserialize, Serialize};
use tracing::debug;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Latest label text for the info panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoLabels {
    pub core_speeds: String,
    pub available_memory: String,
}

impl Default for InfoLabels {
    fn default() -> Self {
        Self {
            core_speeds: "Core Speeds: Updating...".to_string(),
            available_memory: "Available RAM: Updating...".to_string(),
        }
    }
}

/// Format per-core clocks, `N/A` when nothing was reported.
pub fn format_core_speeds(frequencies: &[f64]) -> String {
    if frequencies.is_empty() {
        return "Core Speeds: N/A".to_string();
    }
    let cores: Vec<String> = frequencies
        .iter()
        .enumerate()
        .map(|(core, mhz)| format!("Core {}: {:.1} MHz", core, mhz))
        .collect();
    format!("Core Speeds: {}", cores.join(", "))
}

/// Format available memory in whole gigabytes, rounded down.
pub fn format_available_memory(available_bytes: u64) -> String {
    format!("Available RAM: {} GB", available_bytes / BYTES_PER_GB)
}

/// Refreshes [`InfoLabels`] from the frequency and memory providers.
pub struct LabelCollector {
    frequency: Box<dyn FrequencyProvider>,
    memory: Box<dyn MemoryProvider>,
    labels: InfoLabels,
}

impl LabelCollector {
    pub fn new(frequency: Box<dyn FrequencyProvider>, memory: Box<dyn MemoryProvider>) -> Self {
        Self {
            frequency,
            memory,
            labels: InfoLabels::default(),
        }
    }

    pub fn labels(&self) -> &InfoLabels {
        &self.labels
    }
}

impl SampleCollector for LabelCollector {
    fn domain(&self) -> Domain {
        Domain::Labels
    }

    fn tick(&mut self, _now: f64) {
        match self.frequency.per_core_frequency() {
            Ok(frequencies) => self.labels.core_speeds = format_core_speeds(&frequencies),
            Err(err) => debug!("Keeping previous core speed label: {}", err),
        }
        match self.memory.memory() {
            Ok(reading) => {
                self.labels.available_memory = format_available_memory(reading.available_bytes)
            }
            Err(err) => debug!("Keeping previous memory label: {}", err),
        }
    }

    fn publish(&self, view: &mut DashboardView) {
        view.labels = Some(self.labels.clone());
    }
}
