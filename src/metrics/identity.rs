//! One-shot system identity capture.

use crate::metrics::data::{CpuIdentity, SystemSnapshot};
use chrono::Utc;
use std::fs;
use sysinfo::System;

/// Board text when the platform has no lookup.
pub const BOARD_UNSUPPORTED: &str = "Unsupported OS";
/// Board text when the lookup itself failed.
pub const BOARD_UNAVAILABLE: &str = "Unavailable";

impl SystemSnapshot {
    /// Capture CPU, OS, memory and board identity from the running system.
    pub fn capture() -> Self {
        let system = System::new_all();

        let cpus = system.cpus();
        let threads = cpus.len();
        let name = cpus
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let frequency_mhz = cpus.first().map(|cpu| cpu.frequency()).filter(|f| *f > 0);
        let physical_cores = system.physical_core_count().unwrap_or(threads).max(1);

        Self {
            captured_at: Utc::now(),
            cpu: CpuIdentity {
                name,
                architecture: std::env::consts::ARCH.to_string(),
                physical_cores,
                threads,
                frequency_mhz,
            },
            os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            total_memory_bytes: system.total_memory(),
            board: board_identity(),
        }
    }
}

/// Look up the board vendor and product string for this OS.
pub fn board_identity() -> String {
    if cfg!(target_os = "linux") {
        read_linux_board().unwrap_or_else(|| BOARD_UNAVAILABLE.to_string())
    } else if cfg!(target_os = "macos") {
        read_macos_model().unwrap_or_else(|| BOARD_UNAVAILABLE.to_string())
    } else {
        BOARD_UNSUPPORTED.to_string()
    }
}

/// Read board identity from the DMI tables.
fn read_linux_board() -> Option<String> {
    let vendor = fs::read_to_string("/sys/class/dmi/id/board_vendor").ok();
    let product = fs::read_to_string("/sys/class/dmi/id/board_name").ok();
    format_board(vendor.as_deref(), product.as_deref())
}

fn read_macos_model() -> Option<String> {
    let output = std::process::Command::new("sysctl")
        .args(["-n", "hw.model"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let model = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!model.is_empty()).then_some(model)
}

/// Join vendor and product, `None` when neither could be read.
fn format_board(vendor: Option<&str>, product: Option<&str>) -> Option<String> {
    if vendor.is_none() && product.is_none() {
        return None;
    }
    let vendor = vendor.map(str::trim).unwrap_or("Unknown");
    let product = product.map(str::trim).unwrap_or("Unknown");
    Some(format!("{} {}", vendor, product).trim().to_string())
}
