//! Metric providers backed by `sysinfo` and direct /proc access.

use crate::error::{Result, TelemetryError};
use crate::metrics::data::ProcessRecord;
use crate::metrics::traits::{
    CpuLoadProvider, FrequencyProvider, MemoryProvider, MemoryReading, NetworkCounterProvider,
    NetworkCounters, ProcessProvider,
};
use std::ffi::OsStr;
use sysinfo::{Networks, System};

/// System-backed provider.
///
/// Every collector gets its own instance: CPU usage in `sysinfo` is computed
/// from the delta between two refreshes of the same `System`, so sharing one
/// between collectors on different cadences would skew the readings.
pub struct SystemProvider {
    system: System,
    networks: Networks,
}

impl SystemProvider {
    /// Create a provider with nothing refreshed yet.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuLoadProvider for SystemProvider {
    fn per_core_usage(&mut self) -> Result<Vec<f64>> {
        self.system.refresh_cpu_usage();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(TelemetryError::provider_error("No CPU information available"));
        }
        Ok(cpus.iter().map(|cpu| cpu.cpu_usage() as f64).collect())
    }
}

impl FrequencyProvider for SystemProvider {
    fn per_core_frequency(&mut self) -> Result<Vec<f64>> {
        self.system.refresh_cpu_frequency();
        Ok(self
            .system
            .cpus()
            .iter()
            .map(|cpu| cpu.frequency() as f64)
            .filter(|mhz| *mhz > 0.0)
            .collect())
    }
}

impl MemoryProvider for SystemProvider {
    fn memory(&mut self) -> Result<MemoryReading> {
        self.system.refresh_memory();
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(TelemetryError::provider_error("Total memory reported as zero"));
        }
        Ok(MemoryReading {
            total_bytes,
            available_bytes: self.system.available_memory(),
        })
    }
}

impl NetworkCounterProvider for SystemProvider {
    fn counters(&mut self) -> Result<NetworkCounters> {
        self.networks.refresh();
        let (bytes_sent, bytes_received) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(sent, received), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    received.saturating_add(data.total_received()),
                )
            });
        Ok(NetworkCounters {
            bytes_sent,
            bytes_received,
        })
    }
}

impl ProcessProvider for SystemProvider {
    fn processes(&mut self) -> Result<Vec<ProcessRecord>> {
        // Dead processes are dropped from the table by the refresh itself
        self.system.refresh_all();
        let total_memory = self.system.total_memory();

        let mut records: Vec<ProcessRecord> = self
            .system
            .processes()
            .iter()
            .filter_map(|(pid, process)| {
                let pid = pid.as_u32();
                let threads = read_thread_count(pid);
                if cfg!(target_os = "linux") && threads.is_none() {
                    // Vanished between the refresh and now, or not readable
                    return None;
                }

                let memory_percent = if total_memory > 0 {
                    (process.memory() as f64 / total_memory as f64 * 100.0) as f32
                } else {
                    0.0
                };

                Some(ProcessRecord {
                    pid,
                    name: OsStr::new(process.name()).to_string_lossy().into_owned(),
                    cpu_percent: process.cpu_usage(),
                    memory_percent,
                    threads,
                })
            })
            .collect();

        records.sort_by_key(|record| record.pid);
        Ok(records)
    }
}

/// Read the thread count of a process from /proc/<pid>/status.
fn read_thread_count(pid: u32) -> Option<u32> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    parse_thread_count(&status)
}

fn parse_thread_count(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thread_count() {
        let status = "Name:\tbash\nState:\tS (sleeping)\nThreads:\t4\nVmRSS:\t1024 kB\n";
        assert_eq!(parse_thread_count(status), Some(4));
        assert_eq!(parse_thread_count("Name:\tbash\n"), None);
    }

    #[test]
    fn test_memory_reading() {
        let mut provider = SystemProvider::new();
        let reading = provider.memory().unwrap();
        assert!(reading.total_bytes > 0);
        assert!(reading.available_bytes <= reading.total_bytes);
    }

    #[test]
    fn test_per_core_usage_in_range() {
        let mut provider = SystemProvider::new();
        let usage = provider.per_core_usage().unwrap();
        assert!(!usage.is_empty());
        assert!(usage.iter().all(|u| (0.0..=100.0).contains(u)));
    }

    #[test]
    fn test_process_listing_contains_self() {
        let mut provider = SystemProvider::new();
        let processes = provider.processes().unwrap();
        let me = std::process::id();
        assert!(processes.iter().any(|p| p.pid == me));
    }
}
