//! DRM device access
//!
//! Opens `/dev/dri/card*` nodes owned by the i915 driver and issues raw
//! ioctls. Request numbers are built with the kernel's `_IOC` encoding.

use crate::error::{GpuError, Result};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

/// DRM device node directory
pub const DEV_DRI: &str = "/dev/dri";

/// Highest card minor probed by [`DrmDevice::open_any`]
const MAX_CARDS: u32 = 16;

/// ioctl request encoding (`include/uapi/asm-generic/ioctl.h`)
pub mod ioctls {
    use std::os::raw::c_ulong;

    const NRSHIFT: u32 = 0;
    const TYPESHIFT: u32 = 8;
    const SIZESHIFT: u32 = 16;
    const DIRSHIFT: u32 = 30;

    const NONE: c_ulong = 0;
    const WRITE: c_ulong = 1;
    const READ: c_ulong = 2;

    /// DRM ioctl type byte
    pub const DRM_IOCTL_BASE: u8 = b'd';
    /// First driver-private ioctl number
    pub const DRM_COMMAND_BASE: u8 = 0x40;

    /// `_IOC(dir, type, nr, size)`
    #[must_use]
    pub const fn ioc(dir: c_ulong, ty: u8, nr: u8, size: usize) -> c_ulong {
        (dir << DIRSHIFT)
            | ((size as c_ulong) << SIZESHIFT)
            | ((ty as c_ulong) << TYPESHIFT)
            | ((nr as c_ulong) << NRSHIFT)
    }

    /// `_IO('d', nr)`
    #[must_use]
    pub const fn io(nr: u8) -> c_ulong {
        ioc(NONE, DRM_IOCTL_BASE, nr, 0)
    }

    /// `_IOW('d', nr, T)`
    #[must_use]
    pub const fn iow<T>(nr: u8) -> c_ulong {
        ioc(WRITE, DRM_IOCTL_BASE, nr, std::mem::size_of::<T>())
    }

    /// `_IOR('d', nr, T)`
    #[must_use]
    pub const fn ior<T>(nr: u8) -> c_ulong {
        ioc(READ, DRM_IOCTL_BASE, nr, std::mem::size_of::<T>())
    }

    /// `_IOWR('d', nr, T)`
    #[must_use]
    pub const fn iowr<T>(nr: u8) -> c_ulong {
        ioc(READ | WRITE, DRM_IOCTL_BASE, nr, std::mem::size_of::<T>())
    }
}

/// Open DRM device node
#[derive(Debug)]
pub struct DrmDevice {
    file: File,
    path: PathBuf,
}

impl DrmDevice {
    /// Open a specific device node.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::DeviceNotFound` if the node does not exist, or
    /// `GpuError::Io` if it cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GpuError::device_not_found(path));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        tracing::debug!("Opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open the first card node bound to the i915 driver.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::NoDevicesFound` if no i915 card node can be opened.
    pub fn open_any() -> Result<Self> {
        for minor in 0..MAX_CARDS {
            let name = format!("card{minor}");
            let node = Path::new(DEV_DRI).join(&name);
            if !node.exists() {
                continue;
            }
            match card_driver(&name) {
                Some(driver) if driver == "i915" => {}
                other => {
                    tracing::debug!("Skipping {name}: driver {other:?}");
                    continue;
                }
            }
            match Self::open(&node) {
                Ok(dev) => {
                    tracing::info!("Using {}", node.display());
                    return Ok(dev);
                }
                Err(e) => tracing::warn!("Cannot open {}: {e}", node.display()),
            }
        }
        Err(GpuError::NoDevicesFound)
    }

    /// Device node path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Issue `request` with `arg`, restarting on `EINTR` and `EAGAIN`.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` carrying the kernel's errno.
    pub(crate) fn ioctl<T>(&self, op: &'static str, request: libc::c_ulong, arg: &mut T) -> Result<()> {
        loop {
            // SAFETY: `request` encodes the size of `T` and the kernel reads
            // and writes at most that many bytes through the pointer; `arg`
            // is a live exclusive borrow for the duration of the call and
            // the fd stays open while `self` exists.
            let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, &raw mut *arg) };
            if ret == 0 {
                return Ok(());
            }
            let err = GpuError::last_ioctl(op);
            match err.errno() {
                Some(libc::EINTR | libc::EAGAIN) => continue,
                _ => {
                    tracing::trace!("{op}: {err}");
                    return Err(err);
                }
            }
        }
    }

    /// Issue an argument-less request.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` carrying the kernel's errno.
    pub(crate) fn ioctl_none(&self, op: &'static str, request: libc::c_ulong) -> Result<()> {
        loop {
            // SAFETY: `_IO` requests carry no payload; a null argument is
            // what the kernel expects.
            let ret = unsafe {
                libc::ioctl(
                    self.file.as_raw_fd(),
                    request as _,
                    std::ptr::null_mut::<libc::c_void>(),
                )
            };
            if ret == 0 {
                return Ok(());
            }
            let err = GpuError::last_ioctl(op);
            if !matches!(err.errno(), Some(libc::EINTR | libc::EAGAIN)) {
                return Err(err);
            }
        }
    }
}

impl AsFd for DrmDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Kernel driver bound to `/sys/class/drm/<card>/device`.
fn card_driver(card: &str) -> Option<String> {
    let link = std::fs::read_link(format!("/sys/class/drm/{card}/device/driver")).ok()?;
    link.file_name().map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::ioctls::*;

    #[repr(C)]
    struct Eight([u32; 2]);

    #[repr(C)]
    struct Sixteen([u64; 2]);

    #[test]
    fn ioc_encoding_matches_kernel() {
        // DRM_IOCTL_GEM_CLOSE
        assert_eq!(iow::<Eight>(0x09), 0x4008_6409);
        // DRM_IOCTL_GEM_FLINK
        assert_eq!(iowr::<Eight>(0x0a), 0xc008_640a);
        // DRM_IOCTL_I915_GEM_CREATE
        assert_eq!(iowr::<Sixteen>(DRM_COMMAND_BASE + 0x1b), 0xc010_645b);
        // DRM_IOCTL_I915_GEM_GET_APERTURE
        assert_eq!(ior::<Sixteen>(DRM_COMMAND_BASE + 0x23), 0x8010_6463);
        // DRM_IOCTL_I915_GEM_THROTTLE
        assert_eq!(io(DRM_COMMAND_BASE + 0x18), 0x6458);
    }

    #[test]
    fn open_missing_node() {
        let err = super::DrmDevice::open("/dev/dri/card-does-not-exist").unwrap_err();
        assert!(matches!(err, crate::GpuError::DeviceNotFound { .. }));
    }
}
