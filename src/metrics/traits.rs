//! Traits for pluggable metric providers.
//!
//! Each provider returns an instantaneous reading for one metric domain.
//! Providers are independent: any of them may fail for a single poll
//! ([`TelemetryError::Provider`](crate::TelemetryError::Provider)) or be
//! missing altogether, without affecting the others.

use crate::error::Result;
use crate::metrics::data::ProcessRecord;
use serde::{Deserialize, Serialize};

/// Memory totals in bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryReading {
    /// Available memory as a percentage of total, 0 when the total is unknown.
    pub fn available_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.available_bytes as f64 / self.total_bytes as f64 * 100.0
        }
    }
}

/// Cumulative network byte counters, summed over all interfaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// One GPU poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuReading {
    pub name: String,
    /// Utilization percentage (0 to 100)
    pub utilization_percent: f64,
    /// Graphics clock in MHz, 0 when it cannot be read
    pub graphics_clock_mhz: u32,
}

/// Per-core CPU utilization.
pub trait CpuLoadProvider: Send {
    /// Utilization percentage (0 to 100) for each logical core.
    fn per_core_usage(&mut self) -> Result<Vec<f64>>;
}

/// Per-core clock speed.
pub trait FrequencyProvider: Send {
    /// Current clock of each logical core in MHz. May be empty.
    fn per_core_frequency(&mut self) -> Result<Vec<f64>>;
}

/// System memory totals.
pub trait MemoryProvider: Send {
    fn memory(&mut self) -> Result<MemoryReading>;
}

/// Cumulative network counters.
pub trait NetworkCounterProvider: Send {
    fn counters(&mut self) -> Result<NetworkCounters>;
}

/// GPU utilization and clock.
pub trait GpuProvider: Send {
    fn read(&mut self) -> Result<GpuReading>;
}

/// Live process table.
pub trait ProcessProvider: Send {
    /// Enumerate processes. Processes that vanish or deny access during the
    /// enumeration are left out of the result rather than reported.
    fn processes(&mut self) -> Result<Vec<ProcessRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_percent() {
        let reading = MemoryReading {
            total_bytes: 8 * 1024,
            available_bytes: 2 * 1024,
        };
        assert_eq!(reading.available_percent(), 25.0);

        let unknown = MemoryReading {
            total_bytes: 0,
            available_bytes: 0,
        };
        assert_eq!(unknown.available_percent(), 0.0);
    }
}
