//! Captured register BAR images.
//!
//! A snapshot is a raw little-endian copy of BAR0 (for example taken with
//! `dd` from `resource0`). It implements [`RegisterIo`] so that dumps and
//! decodes can run offline; writes are rejected.

use crate::error::{GpuError, Result};
use crate::mmio::{checked_offset, RegisterIo};
use bytes::{Buf, Bytes};
use i915_chip::Platform;
use std::path::Path;

/// Read-only register image
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: Bytes,
    platform: Platform,
}

impl Snapshot {
    /// Wrap an in-memory image.
    #[must_use]
    pub fn new(data: impl Into<Bytes>, platform: Platform) -> Self {
        Self {
            data: data.into(),
            platform,
        }
    }

    /// Load an image from disk.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Io` if the file cannot be read.
    pub fn open(path: &Path, platform: Platform) -> Result<Self> {
        let data = std::fs::read(path)?;
        tracing::debug!(
            "Loaded snapshot {} ({} bytes) as {platform}",
            path.display(),
            data.len()
        );
        Ok(Self::new(data, platform))
    }

    /// Image size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl RegisterIo for Snapshot {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn read32(&self, offset: u32) -> Result<u32> {
        let resolved = self.platform.resolve_offset(offset);
        let at = checked_offset(resolved, self.data.len())?;
        Ok(self.data.slice(at..at + 4).get_u32_le())
    }

    fn write32(&mut self, offset: u32, _value: u32) -> Result<()> {
        Err(GpuError::ReadOnly { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(len: usize, words: &[(usize, u32)]) -> Vec<u8> {
        let mut data = vec![0u8; len];
        for &(at, v) in words {
            data[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        data
    }

    #[test]
    fn reads_little_endian() {
        let snap = Snapshot::new(image(16, &[(4, 0x1234_5678)]), Platform::I965);
        assert_eq!(snap.read32(4).unwrap(), 0x1234_5678);
        assert_eq!(snap.read32(0).unwrap(), 0);
        assert_eq!(snap.len(), 16);
    }

    #[test]
    fn rejects_out_of_range_and_writes() {
        let mut snap = Snapshot::new(image(16, &[]), Platform::I965);
        assert!(matches!(snap.read32(16), Err(GpuError::OutOfRange { offset: 16, .. })));
        assert!(matches!(snap.read32(14), Err(GpuError::OutOfRange { .. })));
        assert!(matches!(
            snap.write32(0, 1),
            Err(GpuError::ReadOnly { offset: 0 })
        ));
    }

    #[test]
    fn valleyview_snapshot_resolves_display_offsets() {
        let data = image(0x20_0000, &[(0x1f_0008, 0x8000_0000), (0x2030, 5)]);
        let snap = Snapshot::new(data, Platform::ValleyView);
        assert_eq!(snap.read32(0x70008).unwrap(), 0x8000_0000);
        assert_eq!(snap.read32(0x2030).unwrap(), 5);
    }

    #[test]
    fn open_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar0.bin");
        std::fs::write(&path, image(8, &[(0, 0xcafe_f00d)])).unwrap();
        let snap = Snapshot::open(&path, Platform::SandyBridge).unwrap();
        assert_eq!(snap.platform(), Platform::SandyBridge);
        assert_eq!(snap.read32(0).unwrap(), 0xcafe_f00d);
        assert!(Snapshot::open(&dir.path().join("missing"), Platform::I965).is_err());
    }
}
