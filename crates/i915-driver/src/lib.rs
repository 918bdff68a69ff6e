//! Userspace access to Intel i915 GPUs.
//!
//! Two independent paths into the hardware:
//!
//! ```text
//! Registers (root, no driver involvement):
//!   GpuManager ─► MmioWindow (sysfs resource0 mmap) ─► RegisterIo
//!                 Snapshot   (captured BAR image)   ─► RegisterIo
//!
//! GEM (through the i915 kernel driver):
//!   DrmDevice (/dev/dri/card*) ─► gem_* ioctls ─► BatchBuilder / Batch
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use i915_driver::{dump_table, GpuManager, MmioWindow};
//! use i915_chip::tables::tables_for;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mgr = GpuManager::discover()?;
//! let gpu = mgr.device(0)?;
//! let regs = MmioWindow::map(gpu)?;
//! for table in tables_for(gpu.platform) {
//!     for line in dump_table(&regs, table)? {
//!         println!("{line}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod batch;
mod discovery;
pub mod drm;
mod dump;
mod error;
pub mod gem;
pub mod mmio;
mod snapshot;

pub use batch::{Batch, BatchBuilder};
pub use discovery::{GpuInfo, GpuManager, PCI_ADDR_ENV, SYSFS_PCI_DEVICES};
pub use drm::DrmDevice;
pub use dump::{decode_value, dump_table, parse_u32, pipe_clocks, DumpLine};
pub use error::{GpuError, Result};
pub use gem::{ContextId, FlinkName, GemHandle, Tiling};
pub use mmio::{MmioWindow, RegisterIo};
pub use snapshot::Snapshot;
