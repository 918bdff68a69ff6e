//! Memory-mapped register access
//!
//! [`MmioWindow`] maps BAR0 of the GPU through its sysfs `resource0` file
//! and bounds-checks every access. Callers always pass legacy register
//! offsets; the window resolves them for the platform (ValleyView moves the
//! display block) before the volatile load or store.

// MMIO registers are naturally aligned by hardware
#![allow(clippy::cast_ptr_alignment)]

use crate::discovery::GpuInfo;
use crate::error::{GpuError, Result};
use i915_chip::Platform;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::path::Path;
use std::ptr::NonNull;

/// Source of 32-bit register values.
///
/// Offsets are legacy offsets; implementations apply
/// [`Platform::resolve_offset`].
pub trait RegisterIo {
    /// Platform the registers belong to.
    fn platform(&self) -> Platform;

    /// Read the register at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::OutOfRange` if the resolved offset is outside the
    /// backing store.
    fn read32(&self, offset: u32) -> Result<u32>;

    /// Write the register at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::OutOfRange` for bad offsets and
    /// `GpuError::ReadOnly` for sources that cannot be written.
    fn write32(&mut self, offset: u32, value: u32) -> Result<()>;
}

/// Check `offset..offset+4` against `limit`, returning it as `usize`.
pub(crate) fn checked_offset(offset: u32, limit: usize) -> Result<usize> {
    let start = offset as usize;
    match start.checked_add(4) {
        Some(end) if end <= limit && start % 4 == 0 => Ok(start),
        _ => Err(GpuError::OutOfRange { offset, limit }),
    }
}

/// Mapped register BAR
#[derive(Debug)]
pub struct MmioWindow {
    ptr: NonNull<u8>,
    size: usize,
    platform: Platform,
    _file: File,
}

impl MmioWindow {
    /// Map BAR0 of a discovered GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource file cannot be opened or mapped.
    pub fn map(info: &GpuInfo) -> Result<Self> {
        Self::map_path(&info.resource_path(0), info.platform)
    }

    /// Map an arbitrary resource file (`/sys/bus/pci/devices/<addr>/resource0`).
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Mmio` if the file cannot be opened, is empty, or
    /// the mapping fails.
    pub fn map_path(path: &Path, platform: Platform) -> Result<Self> {
        tracing::debug!("Mapping register BAR: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                GpuError::mmio(format!(
                    "Cannot open {}: {e}. Running as root?",
                    path.display()
                ))
            })?;

        // BAR sizes fit in usize on 64-bit targets
        #[allow(clippy::cast_possible_truncation)]
        let size = file
            .metadata()
            .map_err(|e| GpuError::mmio(format!("Cannot stat BAR: {e}")))?
            .len() as usize;

        if size == 0 {
            return Err(GpuError::mmio("BAR size is 0 (device disabled?)"));
        }

        // SAFETY: mmap of a PCI resource file.
        // - fd is valid (just opened) and kept alive in `_file` for the
        //   lifetime of the mapping
        // - size is the non-zero length of the resource file
        // - MAP_SHARED with offset 0 maps the whole BAR
        // - the mapping is released in Drop
        let addr = unsafe {
            mmap(
                std::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                0,
            )
        }
        .map_err(|e| GpuError::mmio(format!("mmap failed: {e}")))?;

        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| GpuError::mmio("mmap returned a null pointer"))?;

        tracing::info!(
            "Mapped {} registers ({} KB at {ptr:p})",
            platform,
            size / 1024
        );

        Ok(Self {
            ptr,
            size,
            platform,
            _file: file,
        })
    }

    /// Size of the mapping in bytes
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Read at an already-resolved BAR offset.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::OutOfRange` for offsets outside the mapping.
    pub fn read_raw(&self, offset: u32) -> Result<u32> {
        let at = checked_offset(offset, self.size)?;
        // SAFETY: volatile read of a hardware register.
        // - `at + 4 <= size` and `at` is dword aligned (checked above)
        // - ptr comes from a successful mmap of `size` bytes that lives
        //   until Drop
        let value = unsafe { self.ptr.as_ptr().add(at).cast::<u32>().read_volatile() };
        tracing::trace!("read {offset:#x} = {value:#010x}");
        Ok(value)
    }

    /// Write at an already-resolved BAR offset.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::OutOfRange` for offsets outside the mapping.
    pub fn write_raw(&mut self, offset: u32, value: u32) -> Result<()> {
        let at = checked_offset(offset, self.size)?;
        tracing::trace!("write {offset:#x} = {value:#010x}");
        // SAFETY: volatile write to a hardware register; same bounds and
        // lifetime argument as `read_raw`, and `&mut self` gives exclusive
        // access to the mapping.
        unsafe {
            self.ptr
                .as_ptr()
                .add(at)
                .cast::<u32>()
                .write_volatile(value);
        }
        Ok(())
    }
}

impl RegisterIo for MmioWindow {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn read32(&self, offset: u32) -> Result<u32> {
        self.read_raw(self.platform.resolve_offset(offset))
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write_raw(self.platform.resolve_offset(offset), value)
    }
}

impl Drop for MmioWindow {
    fn drop(&mut self) {
        tracing::debug!("Unmapping register BAR ({} KB)", self.size / 1024);

        // SAFETY: ptr and size are exactly what mmap returned in
        // `map_path`; Drop runs once and no references outlive self.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: the window owns its mapping exclusively; moving it between
// threads does not invalidate process-wide mmap'd memory.
unsafe impl Send for MmioWindow {}

// SAFETY: reads take &self and are bounds-checked volatile loads; writes
// need &mut self. No interior mutability.
unsafe impl Sync for MmioWindow {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_checks() {
        assert_eq!(checked_offset(0, 4).unwrap(), 0);
        assert_eq!(checked_offset(0xffc, 0x1000).unwrap(), 0xffc);
        assert!(matches!(
            checked_offset(0x1000, 0x1000),
            Err(GpuError::OutOfRange { offset: 0x1000, limit: 0x1000 })
        ));
        // Straddles the end
        assert!(checked_offset(0xffe, 0x1000).is_err());
        // Unaligned
        assert!(checked_offset(0x2, 0x1000).is_err());
        assert!(checked_offset(u32::MAX, usize::MAX).is_err());
    }

    #[test]
    fn map_missing_file_fails() {
        let err = MmioWindow::map_path(Path::new("/nonexistent/resource0"), Platform::I965)
            .unwrap_err();
        assert!(matches!(err, GpuError::Mmio { .. }));
    }

    #[test]
    fn map_empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = MmioWindow::map_path(file.path(), Platform::I965).unwrap_err();
        assert!(err.to_string().contains("BAR size is 0"));
    }

    #[test]
    fn regular_file_round_trip() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 0x2000]).unwrap();
        file.flush().unwrap();

        let mut win = MmioWindow::map_path(file.path(), Platform::I965).unwrap();
        win.write32(0x1004, 0xdead_beef).unwrap();
        assert_eq!(win.read32(0x1004).unwrap(), 0xdead_beef);
        assert_eq!(win.read_raw(0x1004).unwrap(), 0xdead_beef);
        assert!(win.read32(0x2000).is_err());
    }

    #[test]
    fn valleyview_window_rebases_display_offsets() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 0x20_0000]).unwrap();
        file.flush().unwrap();

        let mut win = MmioWindow::map_path(file.path(), Platform::ValleyView).unwrap();
        // PIPEACONF lands at display base + 0x70008.
        win.write32(0x70008, 0x8000_0000).unwrap();
        assert_eq!(win.read_raw(0x1f_0008).unwrap(), 0x8000_0000);
        assert_eq!(win.read_raw(0x70008).unwrap(), 0);
        // Render ring registers stay put.
        win.write32(0x2030, 7).unwrap();
        assert_eq!(win.read_raw(0x2030).unwrap(), 7);
    }
}
