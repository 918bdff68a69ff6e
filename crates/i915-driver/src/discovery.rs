//! Runtime GPU discovery
//!
//! Scans the PCI sysfs tree for Intel display-class devices. The
//! `I915_PCI_ADDR` environment variable pins a single device and takes
//! priority over the scan.

use crate::error::{GpuError, Result};
use i915_chip::pcie::{Platform, INTEL_VENDOR_ID, PCI_CLASS_DISPLAY};
use std::path::{Path, PathBuf};

/// Default sysfs location of PCI devices
pub const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// Environment variable naming the PCI address to use
pub const PCI_ADDR_ENV: &str = "I915_PCI_ADDR";

/// Discovered GPUs, sorted by PCI address
#[derive(Debug)]
pub struct GpuManager {
    devices: Vec<GpuInfo>,
}

/// Information about a discovered GPU
#[derive(Debug, Clone)]
pub struct GpuInfo {
    /// Position in the sorted device list
    pub index: usize,

    /// PCI address (0000:00:02.0, etc.)
    pub pcie_address: String,

    /// sysfs directory of the device
    pub sysfs_path: PathBuf,

    /// PCI device id
    pub device_id: u16,

    /// Platform derived from the device id
    pub platform: Platform,

    /// Bound kernel driver, if any
    pub driver: Option<String>,
}

impl GpuManager {
    /// Discover Intel GPUs under [`SYSFS_PCI_DEVICES`].
    ///
    /// # Errors
    ///
    /// Returns `GpuError::NoDevicesFound` if nothing matches, or
    /// `GpuError::DeviceNotFound` if `I915_PCI_ADDR` names a missing device.
    pub fn discover() -> Result<Self> {
        let pinned = std::env::var(PCI_ADDR_ENV).ok();
        Self::discover_in(Path::new(SYSFS_PCI_DEVICES), pinned.as_deref())
    }

    /// Discover under an arbitrary sysfs root, optionally pinned to one
    /// address.
    ///
    /// # Errors
    ///
    /// See [`GpuManager::discover`].
    pub fn discover_in(root: &Path, pinned: Option<&str>) -> Result<Self> {
        if let Some(addr) = pinned {
            tracing::info!("Using {PCI_ADDR_ENV}={addr}");
            let path = root.join(addr);
            if !path.is_dir() {
                return Err(GpuError::device_not_found(path));
            }
            let device_id = read_hex_sysfs(&path.join("device"))?;
            let info = GpuInfo::new(0, addr.to_string(), path, device_id);
            return Ok(Self {
                devices: vec![info],
            });
        }

        tracing::info!("Scanning {} for Intel GPUs...", root.display());

        let entries = std::fs::read_dir(root)
            .map_err(|e| GpuError::mmio(format!("Cannot read {}: {e}", root.display())))?;

        let mut found = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();

            let Ok(vendor) = read_hex_sysfs(&path.join("vendor")) else {
                continue;
            };
            if vendor != INTEL_VENDOR_ID {
                continue;
            }
            let Ok(class) = read_class_sysfs(&path.join("class")) else {
                continue;
            };
            if class >> 16 != PCI_CLASS_DISPLAY {
                continue;
            }
            let Ok(device_id) = read_hex_sysfs(&path.join("device")) else {
                continue;
            };

            let addr = entry.file_name().to_string_lossy().to_string();
            tracing::debug!("Candidate {addr}: device {device_id:#06x}, class {class:#08x}");
            found.push((addr, path, device_id));
        }

        // Sort to ensure consistent ordering
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let devices: Vec<_> = found
            .into_iter()
            .enumerate()
            .map(|(index, (addr, path, id))| GpuInfo::new(index, addr, path, id))
            .collect();

        if devices.is_empty() {
            tracing::warn!("No Intel GPU found");
            return Err(GpuError::NoDevicesFound);
        }

        for d in &devices {
            tracing::info!(
                "GPU {}: {} @ {} (device {:#06x}, driver {})",
                d.index,
                d.platform,
                d.pcie_address,
                d.device_id,
                d.driver.as_deref().unwrap_or("none")
            );
        }

        Ok(Self { devices })
    }

    /// Number of discovered devices
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// All devices
    #[must_use]
    pub fn devices(&self) -> &[GpuInfo] {
        &self.devices
    }

    /// Device by index
    ///
    /// # Errors
    ///
    /// Returns `GpuError::InvalidIndex` if the index is out of bounds.
    pub fn device(&self, index: usize) -> Result<&GpuInfo> {
        self.devices.get(index).ok_or(GpuError::InvalidIndex {
            index,
            count: self.devices.len(),
        })
    }

    /// Device by PCI address
    ///
    /// # Errors
    ///
    /// Returns `GpuError::DeviceNotFound` if no device has that address.
    pub fn find(&self, pcie_address: &str) -> Result<&GpuInfo> {
        self.devices
            .iter()
            .find(|d| d.pcie_address == pcie_address)
            .ok_or_else(|| GpuError::device_not_found(pcie_address))
    }

    /// Device chosen by a CLI selector: an index or a PCI address.
    ///
    /// # Errors
    ///
    /// Returns the error of [`GpuManager::device`] or [`GpuManager::find`].
    pub fn select(&self, selector: &str) -> Result<&GpuInfo> {
        match selector.parse::<usize>() {
            Ok(index) => self.device(index),
            Err(_) => self.find(selector),
        }
    }
}

impl GpuInfo {
    fn new(index: usize, pcie_address: String, sysfs_path: PathBuf, device_id: u16) -> Self {
        let driver = std::fs::read_link(sysfs_path.join("driver"))
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()));
        Self {
            index,
            pcie_address,
            sysfs_path,
            device_id,
            platform: Platform::from_device_id(device_id),
            driver,
        }
    }

    /// sysfs file of a BAR (`resource0`, `resource2`, ...)
    #[must_use]
    pub fn resource_path(&self, bar: usize) -> PathBuf {
        self.sysfs_path.join(format!("resource{bar}"))
    }

    /// Whether the i915 kernel driver is bound
    #[must_use]
    pub fn is_i915_bound(&self) -> bool {
        self.driver.as_deref() == Some("i915")
    }
}

/// Read a hexadecimal `u16` from sysfs (`0x8086\n`).
fn read_hex_sysfs(path: &Path) -> Result<u16> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GpuError::mmio(format!("Cannot read {}: {e}", path.display())))?;

    let trimmed = content.trim().trim_start_matches("0x");

    u16::from_str_radix(trimmed, 16)
        .map_err(|e| GpuError::mmio(format!("Invalid hex value in {}: {e}", path.display())))
}

/// Read the 24-bit PCI class code (`0x030000\n`).
fn read_class_sysfs(path: &Path) -> Result<u32> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GpuError::mmio(format!("Cannot read {}: {e}", path.display())))?;

    u32::from_str_radix(content.trim().trim_start_matches("0x"), 16)
        .map_err(|e| GpuError::mmio(format!("Invalid class in {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_device(root: &Path, addr: &str, vendor: &str, device: &str, class: &str) {
        let dir = root.join(addr);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vendor"), format!("{vendor}\n")).unwrap();
        fs::write(dir.join("device"), format!("{device}\n")).unwrap();
        fs::write(dir.join("class"), format!("{class}\n")).unwrap();
    }

    #[test]
    fn finds_intel_display_devices_only() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "0000:00:02.0", "0x8086", "0x0166", "0x030000");
        // Intel but not a display controller
        fake_device(root.path(), "0000:00:1f.0", "0x8086", "0x1e55", "0x060100");
        // Display controller from another vendor
        fake_device(root.path(), "0000:01:00.0", "0x10de", "0x1234", "0x030000");

        let mgr = GpuManager::discover_in(root.path(), None).unwrap();
        assert_eq!(mgr.device_count(), 1);
        let gpu = mgr.device(0).unwrap();
        assert_eq!(gpu.pcie_address, "0000:00:02.0");
        assert_eq!(gpu.platform, Platform::IvyBridge);
        assert_eq!(gpu.driver, None);
        assert!(gpu.resource_path(0).ends_with("0000:00:02.0/resource0"));
    }

    #[test]
    fn devices_sorted_by_address() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "0000:05:00.0", "0x8086", "0x0f31", "0x030000");
        fake_device(root.path(), "0000:00:02.0", "0x8086", "0x0166", "0x038000");

        let mgr = GpuManager::discover_in(root.path(), None).unwrap();
        let addrs: Vec<_> = mgr.devices().iter().map(|d| d.pcie_address.as_str()).collect();
        assert_eq!(addrs, ["0000:00:02.0", "0000:05:00.0"]);
        assert_eq!(mgr.select("1").unwrap().platform, Platform::ValleyView);
        assert_eq!(mgr.select("0000:00:02.0").unwrap().index, 0);
        assert!(matches!(
            mgr.device(2),
            Err(GpuError::InvalidIndex { index: 2, count: 2 })
        ));
        assert!(matches!(mgr.find("0000:09:00.0"), Err(GpuError::DeviceNotFound { .. })));
    }

    #[test]
    fn empty_tree_reports_no_devices() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            GpuManager::discover_in(root.path(), None),
            Err(GpuError::NoDevicesFound)
        ));
    }

    #[test]
    fn pinned_address_wins() {
        let root = tempfile::tempdir().unwrap();
        fake_device(root.path(), "0000:00:02.0", "0x8086", "0x0166", "0x030000");
        fake_device(root.path(), "0000:00:03.0", "0x8086", "0x0f31", "0x030000");

        let mgr = GpuManager::discover_in(root.path(), Some("0000:00:03.0")).unwrap();
        assert_eq!(mgr.device_count(), 1);
        assert_eq!(mgr.device(0).unwrap().platform, Platform::ValleyView);

        assert!(matches!(
            GpuManager::discover_in(root.path(), Some("0000:00:09.0")),
            Err(GpuError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn hex_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor");
        fs::write(&path, "0x8086\n").unwrap();
        assert_eq!(read_hex_sysfs(&path).unwrap(), 0x8086);
        fs::write(&path, "garbage").unwrap();
        assert!(read_hex_sysfs(&path).is_err());
    }
}
