//! Data structures for telemetry channels, processes and core controls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static machine identity, captured once at startup.
///
/// Nothing in here changes after construction. Available memory and per-core
/// clocks are refreshed separately as labels, see
/// [`InfoLabels`](crate::metrics::labels::InfoLabels).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemSnapshot {
    /// When the identity was captured
    pub captured_at: DateTime<Utc>,
    /// CPU identity and topology
    pub cpu: CpuIdentity,
    /// Operating system name
    pub os_name: String,
    /// Operating system version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: String,
    /// Total system memory in bytes
    pub total_memory_bytes: u64,
    /// Board vendor and product, or a fallback text
    pub board: String,
}

/// CPU identity and topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpuIdentity {
    /// CPU brand string
    pub name: String,
    /// CPU architecture (e.g., "x86_64")
    pub architecture: String,
    /// Number of physical cores
    pub physical_cores: usize,
    /// Number of logical threads
    pub threads: usize,
    /// Frequency of the first core in MHz at capture time
    pub frequency_mhz: Option<u64>,
}

/// A metric domain, i.e. one group of channels fed by one collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Cpu,
    Memory,
    Network,
    Gpu,
    Labels,
    Processes,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Cpu => "cpu",
            Domain::Memory => "memory",
            Domain::Network => "network",
            Domain::Gpu => "gpu",
            Domain::Labels => "labels",
            Domain::Processes => "processes",
        };
        f.write_str(name)
    }
}

/// The kind of value a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Scalar percentage in 0..=100
    Percent,
    /// Rate derived from counter deltas
    Rate,
    /// Plain count
    Count,
}

impl ValueKind {
    /// Display unit used by the rendering layer.
    pub fn unit(&self) -> &'static str {
        match self {
            ValueKind::Percent => "%",
            ValueKind::Rate => "KB/s",
            ValueKind::Count => "",
        }
    }
}

/// Metadata of one named metric stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricChannel {
    /// Channel identifier (e.g. "cpu.core0")
    pub id: String,
    /// Value type of the samples
    pub kind: ValueKind,
    /// Maximum number of retained samples
    pub capacity: usize,
}

impl MetricChannel {
    pub fn new(id: impl Into<String>, kind: ValueKind, capacity: usize) -> Self {
        Self {
            id: id.into(),
            kind,
            capacity,
        }
    }

    /// Channel id for one CPU core's utilization.
    pub fn cpu_core_id(core: usize) -> String {
        format!("cpu.core{}", core)
    }
}

/// Whether a channel can currently receive samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelStatus {
    Available,
    /// Persistent precondition, not retried
    Unavailable { reason: String },
}

impl ChannelStatus {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ChannelStatus::Available)
    }
}

/// One live process, as seen by a single enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// CPU usage percentage since the previous enumeration
    pub cpu_percent: f32,
    /// Resident memory as a percentage of total memory
    pub memory_percent: f32,
    /// Thread count, when the platform exposes it
    pub threads: Option<u32>,
}

/// Last requested control values of one physical core.
///
/// The voltage is display state only; nothing is sent to hardware for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoreControlState {
    pub core: usize,
    pub multiplier: i32,
    pub voltage: f64,
}

impl CoreControlState {
    /// Multiplier shown before any request was made.
    pub const DEFAULT_MULTIPLIER: i32 = 30;
    /// Voltage shown before any request was made.
    pub const DEFAULT_VOLTAGE: f64 = 1.0;

    pub fn new(core: usize) -> Self {
        Self {
            core,
            multiplier: Self::DEFAULT_MULTIPLIER,
            voltage: Self::DEFAULT_VOLTAGE,
        }
    }
}

/// The value carried by an actuation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum ControlValue {
    Multiplier(i32),
    Voltage(f64),
}

/// Why an actuation request did not apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActuationError {
    #[error("core {core} is out of range (0..{cores})")]
    CoreOutOfRange { core: i32, cores: usize },

    #[error("multiplier {value} is out of range ({min}..={max})")]
    MultiplierOutOfRange { value: i32, min: i32, max: i32 },

    #[error("tuning library unavailable: {reason}")]
    LibraryUnavailable { reason: String },

    #[error("tuning call failed: {message}")]
    CallFailed { message: String },
}

impl ActuationError {
    /// Rejected locally before any external call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ActuationError::CoreOutOfRange { .. } | ActuationError::MultiplierOutOfRange { .. }
        )
    }
}

/// Outcome of one actuation request. Produced per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuationResult {
    pub core: i32,
    pub requested: ControlValue,
    pub applied: bool,
    pub error: Option<ActuationError>,
}

impl ActuationResult {
    pub fn applied(core: i32, requested: ControlValue) -> Self {
        Self {
            core,
            requested,
            applied: true,
            error: None,
        }
    }

    pub fn failed(core: i32, requested: ControlValue, error: ActuationError) -> Self {
        Self {
            core,
            requested,
            applied: false,
            error: Some(error),
        }
    }

    /// Status line in the control panel's wording.
    pub fn status_text(&self) -> String {
        match (&self.error, self.requested) {
            (Some(err), _) => format!("Error: {}", err),
            (None, ControlValue::Multiplier(value)) => {
                format!("Core {} multiplier set to {}", self.core, value)
            }
            (None, ControlValue::Voltage(value)) => {
                format!("Core {} voltage adjustment: {:.2}V", self.core, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_control_defaults() {
        let state = CoreControlState::new(3);
        assert_eq!(state.core, 3);
        assert_eq!(state.multiplier, 30);
        assert_eq!(state.voltage, 1.0);
    }

    #[test]
    fn test_status_text() {
        let ok = ActuationResult::applied(1, ControlValue::Multiplier(42));
        assert_eq!(ok.status_text(), "Core 1 multiplier set to 42");

        let volt = ActuationResult::applied(0, ControlValue::Voltage(1.234));
        assert_eq!(volt.status_text(), "Core 0 voltage adjustment: 1.23V");

        let failed = ActuationResult::failed(
            0,
            ControlValue::Multiplier(40),
            ActuationError::LibraryUnavailable {
                reason: "not loaded".to_string(),
            },
        );
        assert_eq!(
            failed.status_text(),
            "Error: tuning library unavailable: not loaded"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(ActuationError::CoreOutOfRange { core: -1, cores: 4 }.is_validation());
        assert!(!ActuationError::CallFailed {
            message: "boom".to_string()
        }
        .is_validation());
    }

    #[test]
    fn test_channel_status_serialization() {
        let json = serde_json::to_string(&ChannelStatus::unavailable("no gpu")).unwrap();
        assert!(json.contains("\"state\":\"unavailable\""));
        assert!(json.contains("no gpu"));
    }
}
