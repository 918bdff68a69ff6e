//! Error types for GPU access

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for GPU operations
pub type Result<T> = std::result::Result<T, GpuError>;

/// Errors that can occur while talking to an i915 GPU
#[derive(Debug, Error)]
pub enum GpuError {
    /// Device not found at the expected path
    #[error("Device not found: {path}")]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// No Intel GPUs detected on the system
    #[error("No Intel GPU detected")]
    NoDevicesFound,

    /// Device index out of range
    #[error("Device index {index} out of range (have {count} devices)")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Number of available devices
        count: usize,
    },

    /// I/O error during device communication
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Mapping or accessing the register BAR failed
    #[error("MMIO error: {reason}")]
    Mmio {
        /// Reason for failure
        reason: String,
    },

    /// Register offset outside the mapped window or snapshot
    #[error("Register {offset:#x} out of range (limit {limit:#x})")]
    OutOfRange {
        /// Requested offset
        offset: u32,
        /// Size of the backing window
        limit: usize,
    },

    /// Write attempted on a read-only register source
    #[error("Register source is read-only (write to {offset:#x})")]
    ReadOnly {
        /// Offset of the rejected write
        offset: u32,
    },

    /// DRM ioctl returned an error
    #[error("{op} failed: {}", os_error(.errno))]
    Ioctl {
        /// Operation name (`GEM_CREATE`, `EXECBUFFER2`, ...)
        op: &'static str,
        /// Raw errno
        errno: i32,
    },

    /// Feature not present on this GPU
    #[error("Not supported: {what}")]
    Unsupported {
        /// Missing feature
        what: String,
    },

    /// Data read back from the GPU does not match what was written
    #[error("Verification failed: {reason}")]
    Mismatch {
        /// Description of the first mismatch
        reason: String,
    },
}

fn os_error(errno: &i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(*errno)
}

impl GpuError {
    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create an MMIO error
    pub fn mmio(reason: impl Into<String>) -> Self {
        Self::Mmio {
            reason: reason.into(),
        }
    }

    /// Create an ioctl error from `errno`
    pub const fn ioctl(op: &'static str, errno: i32) -> Self {
        Self::Ioctl { op, errno }
    }

    /// Create an ioctl error from the calling thread's last OS error
    pub fn last_ioctl(op: &'static str) -> Self {
        let errno = std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO);
        Self::ioctl(op, errno)
    }

    /// Create an unsupported-feature error
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }

    /// Create a verification mismatch error
    pub fn mismatch(reason: impl Into<String>) -> Self {
        Self::Mismatch {
            reason: reason.into(),
        }
    }

    /// Raw errno, if this error came from the kernel.
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Ioctl { errno, .. } => Some(*errno),
            Self::Io { source } => source.raw_os_error(),
            _ => None,
        }
    }
}
