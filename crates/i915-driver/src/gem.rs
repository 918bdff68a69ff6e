//! GEM buffer objects, contexts and batch submission
//!
//! Thin wrappers over the DRM core and i915 ioctls. Argument structs mirror
//! the kernel ABI on 64-bit targets; user pointers travel as `u64`.

// Kernel ABI fields are u64 sizes and pointers
#![allow(clippy::cast_possible_truncation)]

use crate::drm::ioctls::{io, ior, iow, iowr, DRM_COMMAND_BASE};
use crate::drm::DrmDevice;
use crate::error::{GpuError, Result};
use bytemuck::{Pod, Zeroable};
use i915_chip::mi::domain;
use std::os::raw::c_ulong;

/// GEM object handle, valid until closed or until its fd is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GemHandle(pub u32);

impl std::fmt::Display for GemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global (flink) name of a GEM object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlinkName(pub u32);

/// Hardware context id; 0 is the default context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

impl ContextId {
    /// The per-fd default context
    pub const DEFAULT: Self = Self(0);
}

/// `I915_TILING_*` surface layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tiling {
    /// Linear
    None,
    /// X-major tiles (512 B × 8 rows)
    X,
    /// Y-major tiles (128 B × 32 rows)
    Y,
}

impl Tiling {
    /// Kernel ABI value
    #[must_use]
    pub const fn raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::X => 1,
            Self::Y => 2,
        }
    }

    /// Decode a kernel ABI value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::X),
            2 => Some(Self::Y),
            _ => None,
        }
    }
}

// ── ABI structs ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemClose {
    handle: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemFlink {
    handle: u32,
    name: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemOpen {
    name: u32,
    handle: u32,
    size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GetParam {
    param: i32,
    pad: u32,
    value: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemCreate {
    size: u64,
    handle: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemRw {
    handle: u32,
    pad: u32,
    offset: u64,
    size: u64,
    data_ptr: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemSetDomain {
    handle: u32,
    read_domains: u32,
    write_domain: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemSetTiling {
    handle: u32,
    tiling_mode: u32,
    stride: u32,
    swizzle_mode: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct GemGetAperture {
    aper_size: u64,
    aper_available_size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct ContextCreate {
    ctx_id: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
struct ContextDestroy {
    ctx_id: u32,
    pad: u32,
}

/// `drm_i915_gem_relocation_entry`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RelocationEntry {
    /// Object whose address is written
    pub target_handle: u32,
    /// Added to the target's address
    pub delta: u32,
    /// Byte offset in the batch of the dword to patch
    pub offset: u64,
    /// Address the batch was built with
    pub presumed_offset: u64,
    /// Domains the target is read through
    pub read_domains: u32,
    /// Domain the target is written through
    pub write_domain: u32,
}

/// `drm_i915_gem_exec_object2`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExecObject2 {
    /// Object handle
    pub handle: u32,
    /// Number of entries at `relocs_ptr`
    pub relocation_count: u32,
    /// User pointer to `RelocationEntry` array
    pub relocs_ptr: u64,
    /// Required alignment, 0 for default
    pub alignment: u64,
    /// GTT offset, updated by the kernel
    pub offset: u64,
    /// `EXEC_OBJECT_*` flags
    pub flags: u64,
    /// Reserved
    pub rsvd1: u64,
    /// Reserved
    pub rsvd2: u64,
}

impl ExecObject2 {
    /// Object without relocations
    #[must_use]
    pub fn new(handle: GemHandle) -> Self {
        Self {
            handle: handle.0,
            ..Self::default()
        }
    }
}

/// `drm_i915_gem_execbuffer2`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ExecBuffer2 {
    /// User pointer to `ExecObject2` array; the batch is the last entry
    pub buffers_ptr: u64,
    /// Number of objects
    pub buffer_count: u32,
    /// Byte offset of the first command in the batch object
    pub batch_start_offset: u32,
    /// Batch length in bytes
    pub batch_len: u32,
    /// Legacy cliprect field
    pub dr1: u32,
    /// Legacy cliprect field
    pub dr4: u32,
    /// Legacy cliprect count
    pub num_cliprects: u32,
    /// Legacy cliprect pointer
    pub cliprects_ptr: u64,
    /// Ring selector and `I915_EXEC_*` flags
    pub flags: u64,
    /// Context id
    pub rsvd1: u64,
    /// Reserved
    pub rsvd2: u64,
}

// ── Request numbers ──────────────────────────────────────────────────────────

const GEM_CLOSE: c_ulong = iow::<GemClose>(0x09);
const GEM_FLINK: c_ulong = iowr::<GemFlink>(0x0a);
const GEM_OPEN: c_ulong = iowr::<GemOpen>(0x0b);

const I915_GETPARAM: c_ulong = iowr::<GetParam>(DRM_COMMAND_BASE + 0x06);
const I915_GEM_THROTTLE: c_ulong = io(DRM_COMMAND_BASE + 0x18);
const I915_GEM_CREATE: c_ulong = iowr::<GemCreate>(DRM_COMMAND_BASE + 0x1b);
const I915_GEM_PREAD: c_ulong = iow::<GemRw>(DRM_COMMAND_BASE + 0x1c);
const I915_GEM_PWRITE: c_ulong = iow::<GemRw>(DRM_COMMAND_BASE + 0x1d);
const I915_GEM_SET_DOMAIN: c_ulong = iow::<GemSetDomain>(DRM_COMMAND_BASE + 0x1f);
const I915_GEM_SET_TILING: c_ulong = iowr::<GemSetTiling>(DRM_COMMAND_BASE + 0x21);
const I915_GEM_GET_APERTURE: c_ulong = ior::<GemGetAperture>(DRM_COMMAND_BASE + 0x23);
const I915_GEM_EXECBUFFER2: c_ulong = iow::<ExecBuffer2>(DRM_COMMAND_BASE + 0x29);
const I915_GEM_CONTEXT_CREATE: c_ulong = iowr::<ContextCreate>(DRM_COMMAND_BASE + 0x2d);
const I915_GEM_CONTEXT_DESTROY: c_ulong = iow::<ContextDestroy>(DRM_COMMAND_BASE + 0x2e);

/// `I915_PARAM_*` values for [`DrmDevice::getparam`]
pub mod param {
    /// PCI device id
    pub const CHIPSET_ID: i32 = 4;
    /// Video decode ring present
    pub const HAS_BSD: i32 = 10;
    /// Blitter ring present
    pub const HAS_BLT: i32 = 11;
}

// ── Operations ───────────────────────────────────────────────────────────────

impl DrmDevice {
    /// Create a GEM object of `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn gem_create(&self, size: u64) -> Result<GemHandle> {
        let mut arg = GemCreate {
            size,
            ..GemCreate::default()
        };
        self.ioctl("GEM_CREATE", I915_GEM_CREATE, &mut arg)?;
        tracing::trace!("created handle {} ({size} bytes)", arg.handle);
        Ok(GemHandle(arg.handle))
    }

    /// Close a GEM handle.
    ///
    /// # Errors
    ///
    /// `EINVAL` for a handle this fd does not own.
    pub fn gem_close(&self, handle: GemHandle) -> Result<()> {
        let mut arg = GemClose {
            handle: handle.0,
            pad: 0,
        };
        self.ioctl("GEM_CLOSE", GEM_CLOSE, &mut arg)
    }

    /// Publish a global name for `handle`.
    ///
    /// # Errors
    ///
    /// `ENOENT` for an unknown handle.
    pub fn gem_flink(&self, handle: GemHandle) -> Result<FlinkName> {
        let mut arg = GemFlink {
            handle: handle.0,
            name: 0,
        };
        self.ioctl("GEM_FLINK", GEM_FLINK, &mut arg)?;
        Ok(FlinkName(arg.name))
    }

    /// Open an object by global name, returning the new handle and size.
    ///
    /// # Errors
    ///
    /// `ENOENT` for an unknown name.
    pub fn gem_open(&self, name: FlinkName) -> Result<(GemHandle, u64)> {
        let mut arg = GemOpen {
            name: name.0,
            ..GemOpen::default()
        };
        self.ioctl("GEM_OPEN", GEM_OPEN, &mut arg)?;
        Ok((GemHandle(arg.handle), arg.size))
    }

    /// Read `buf.len()` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// `EINVAL` when the range exceeds the object, `ENOENT` for a bad
    /// handle.
    pub fn gem_pread(&self, handle: GemHandle, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut arg = GemRw {
            handle: handle.0,
            pad: 0,
            offset,
            size: buf.len() as u64,
            data_ptr: buf.as_mut_ptr() as u64,
        };
        self.ioctl("GEM_PREAD", I915_GEM_PREAD, &mut arg)
    }

    /// Write `data` at `offset`.
    ///
    /// # Errors
    ///
    /// `EINVAL` when the range exceeds the object, `ENOENT` for a bad
    /// handle.
    pub fn gem_pwrite(&self, handle: GemHandle, offset: u64, data: &[u8]) -> Result<()> {
        let mut arg = GemRw {
            handle: handle.0,
            pad: 0,
            offset,
            size: data.len() as u64,
            data_ptr: data.as_ptr() as u64,
        };
        self.ioctl("GEM_PWRITE", I915_GEM_PWRITE, &mut arg)
    }

    /// Move `handle` into the given domains, waiting for outstanding
    /// rendering.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn gem_set_domain(&self, handle: GemHandle, read_domains: u32, write_domain: u32) -> Result<()> {
        let mut arg = GemSetDomain {
            handle: handle.0,
            read_domains,
            write_domain,
        };
        self.ioctl("GEM_SET_DOMAIN", I915_GEM_SET_DOMAIN, &mut arg)
    }

    /// Wait for all rendering to `handle` to finish.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn gem_sync(&self, handle: GemHandle) -> Result<()> {
        self.gem_set_domain(handle, domain::GTT, domain::GTT)
    }

    /// Change the tiling layout of `handle`, returning the layout the kernel
    /// actually applied. `stride` is the surface pitch in bytes.
    ///
    /// # Errors
    ///
    /// `EINVAL` for a stride the hardware cannot fence; `GpuError::Unsupported`
    /// if the kernel reports a layout this crate does not know.
    pub fn gem_set_tiling(&self, handle: GemHandle, tiling: Tiling, stride: u32) -> Result<Tiling> {
        let mut arg = GemSetTiling {
            handle: handle.0,
            tiling_mode: tiling.raw(),
            stride,
            swizzle_mode: 0,
        };
        self.ioctl("GEM_SET_TILING", I915_GEM_SET_TILING, &mut arg)?;
        tracing::trace!("handle {handle}: tiling {} swizzle {}", arg.tiling_mode, arg.swizzle_mode);
        Tiling::from_raw(arg.tiling_mode)
            .ok_or_else(|| GpuError::unsupported(format!("tiling mode {}", arg.tiling_mode)))
    }

    /// Total GTT aperture size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn gem_aperture_size(&self) -> Result<u64> {
        let mut arg = GemGetAperture::default();
        self.ioctl("GEM_GET_APERTURE", I915_GEM_GET_APERTURE, &mut arg)?;
        Ok(arg.aper_size)
    }

    /// Block until the GPU has caught up with this fd's older requests.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn gem_throttle(&self) -> Result<()> {
        self.ioctl_none("GEM_THROTTLE", I915_GEM_THROTTLE)
    }

    /// Create a hardware context.
    ///
    /// # Errors
    ///
    /// `ENODEV` / `EINVAL` when the kernel or GPU has no context support.
    pub fn context_create(&self) -> Result<ContextId> {
        let mut arg = ContextCreate::default();
        self.ioctl("CONTEXT_CREATE", I915_GEM_CONTEXT_CREATE, &mut arg)?;
        Ok(ContextId(arg.ctx_id))
    }

    /// Destroy a hardware context.
    ///
    /// # Errors
    ///
    /// `ENOENT` for an unknown context.
    pub fn context_destroy(&self, ctx: ContextId) -> Result<()> {
        let mut arg = ContextDestroy {
            ctx_id: ctx.0,
            pad: 0,
        };
        self.ioctl("CONTEXT_DESTROY", I915_GEM_CONTEXT_DESTROY, &mut arg)
    }

    /// Query an `I915_PARAM_*` value.
    ///
    /// # Errors
    ///
    /// `EINVAL` for a parameter the kernel does not know.
    pub fn getparam(&self, param: i32) -> Result<i32> {
        let mut value: i32 = 0;
        let mut arg = GetParam {
            param,
            pad: 0,
            value: (&raw mut value) as u64,
        };
        self.ioctl("GETPARAM", I915_GETPARAM, &mut arg)?;
        Ok(value)
    }

    /// PCI device id as reported by the kernel.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure.
    pub fn chipset_id(&self) -> Result<u16> {
        let id = self.getparam(param::CHIPSET_ID)?;
        u16::try_from(id).map_err(|_| GpuError::unsupported(format!("chipset id {id:#x}")))
    }

    /// Whether the video decode ring exists. Unknown parameters count as
    /// absent.
    #[must_use]
    pub fn has_bsd(&self) -> bool {
        self.getparam(param::HAS_BSD).is_ok_and(|v| v != 0)
    }

    /// Whether the blitter ring exists. Unknown parameters count as absent.
    #[must_use]
    pub fn has_blt(&self) -> bool {
        self.getparam(param::HAS_BLT).is_ok_and(|v| v != 0)
    }

    /// Submit a batch.
    ///
    /// `objects` must end with the batch object; relocation pointers inside
    /// them must stay valid for the call. The kernel updates each object's
    /// `offset`.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` on kernel failure (`EINVAL` for rejected
    /// commands, `EBUSY` when the ring is full).
    pub fn execbuffer2(
        &self,
        objects: &mut [ExecObject2],
        batch_len: u32,
        flags: u64,
        ctx: ContextId,
    ) -> Result<()> {
        let mut arg = ExecBuffer2 {
            buffers_ptr: objects.as_mut_ptr() as u64,
            buffer_count: objects.len() as u32,
            batch_len,
            flags,
            rsvd1: u64::from(ctx.0),
            ..ExecBuffer2::default()
        };
        self.ioctl("EXECBUFFER2", I915_GEM_EXECBUFFER2, &mut arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn abi_struct_sizes() {
        assert_eq!(size_of::<GemClose>(), 8);
        assert_eq!(size_of::<GemOpen>(), 16);
        assert_eq!(size_of::<GetParam>(), 16);
        assert_eq!(size_of::<GemCreate>(), 16);
        assert_eq!(size_of::<GemRw>(), 32);
        assert_eq!(size_of::<GemSetDomain>(), 12);
        assert_eq!(size_of::<GemSetTiling>(), 16);
        assert_eq!(size_of::<RelocationEntry>(), 32);
        assert_eq!(size_of::<ExecObject2>(), 56);
        assert_eq!(size_of::<ExecBuffer2>(), 64);
    }

    #[test]
    fn request_numbers() {
        assert_eq!(GEM_CLOSE, 0x4008_6409);
        assert_eq!(GEM_FLINK, 0xc008_640a);
        assert_eq!(GEM_OPEN, 0xc010_640b);
        assert_eq!(I915_GETPARAM, 0xc010_6446);
        assert_eq!(I915_GEM_THROTTLE, 0x6458);
        assert_eq!(I915_GEM_CREATE, 0xc010_645b);
        assert_eq!(I915_GEM_PREAD, 0x4020_645c);
        assert_eq!(I915_GEM_PWRITE, 0x4020_645d);
        assert_eq!(I915_GEM_SET_DOMAIN, 0x400c_645f);
        assert_eq!(I915_GEM_SET_TILING, 0xc010_6461);
        assert_eq!(I915_GEM_GET_APERTURE, 0x8010_6463);
        assert_eq!(I915_GEM_EXECBUFFER2, 0x4040_6469);
        assert_eq!(I915_GEM_CONTEXT_CREATE, 0xc008_646d);
        assert_eq!(I915_GEM_CONTEXT_DESTROY, 0x4008_646e);
    }

    #[test]
    fn exec_object_defaults() {
        let obj = ExecObject2::new(GemHandle(7));
        assert_eq!(obj.handle, 7);
        assert_eq!(obj.relocation_count, 0);
        assert_eq!(obj.relocs_ptr, 0);
    }

    #[test]
    fn tiling_abi_values() {
        for t in [Tiling::None, Tiling::X, Tiling::Y] {
            assert_eq!(Tiling::from_raw(t.raw()), Some(t));
        }
        assert_eq!(Tiling::X.raw(), 1);
        assert_eq!(Tiling::from_raw(3), None);
    }
}
