//! System information snapshot for the `info` command.

use serde::Serialize;
use sysinfo::{Disks, Networks, System};

/// Point-in-time view of the host system.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub hostname: String,
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub cpu_count: usize,
    pub total_memory: u64,
    pub used_memory: u64,
    pub disks: Vec<DiskInfo>,
    pub networks: Vec<NetworkInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskInfo {
    pub name: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl DiskInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub interface: String,
    pub received_bytes: u64,
    pub transmitted_bytes: u64,
}

impl SystemSnapshot {
    /// Collect a fresh snapshot.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list()
            .iter()
            .map(|disk| DiskInfo {
                name: disk.name().to_string_lossy().into_owned(),
                mount_point: disk.mount_point().to_string_lossy().into_owned(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect();

        let networks = Networks::new_with_refreshed_list()
            .iter()
            .map(|(interface, data)| NetworkInfo {
                interface: interface.clone(),
                received_bytes: data.total_received(),
                transmitted_bytes: data.total_transmitted(),
            })
            .collect();

        Self {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            cpu_count: num_cpus::get(),
            total_memory: sys.total_memory(),
            used_memory: sys.used_memory(),
            disks,
            networks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_has_sane_values() {
        let snapshot = SystemSnapshot::collect();
        assert!(snapshot.cpu_count >= 1);
        assert!(snapshot.total_memory > 0);
        assert!(snapshot.used_memory <= snapshot.total_memory);
    }
}
