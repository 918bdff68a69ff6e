//! Command streamer encodings used by the batch-buffer programs.
//!
//! Only the handful of commands the tests emit: `MI_NOOP`,
//! `MI_BATCH_BUFFER_END`, `MI_LOAD_REGISTER_IMM` and the 2D blitter's
//! `XY_SRC_COPY_BLT`.

/// No-op, also used to pad batches to an even dword count.
pub const MI_NOOP: u32 = 0;

/// Terminates a batch buffer.
pub const MI_BATCH_BUFFER_END: u32 = 0x0a << 23;

/// Load one or more registers from immediate data. Privileged: the kernel
/// command parser (or the hardware in non-secure mode) must reject it.
pub const MI_LOAD_REGISTER_IMM: u32 = 0x22 << 23;

/// `MI_LOAD_REGISTER_IMM` header for `pairs` (register, value) pairs.
#[must_use]
pub const fn load_register_imm(pairs: u32) -> u32 {
    MI_LOAD_REGISTER_IMM | (2 * pairs - 1)
}

/// 2D blitter source copy, six dwords of payload.
pub const XY_SRC_COPY_BLT_CMD: u32 = (2 << 29) | (0x53 << 22) | 6;
pub const XY_SRC_COPY_BLT_WRITE_ALPHA: u32 = 1 << 21;
pub const XY_SRC_COPY_BLT_WRITE_RGB: u32 = 1 << 20;
/// Source surface is tiled; its pitch is given in dwords.
pub const XY_SRC_COPY_BLT_SRC_TILED: u32 = 1 << 15;
/// Destination surface is tiled; its pitch is given in dwords.
pub const XY_SRC_COPY_BLT_DST_TILED: u32 = 1 << 11;

/// Copy ROP (`S`).
pub const ROP_SRC_COPY: u32 = 0xcc;
/// 32 bpp colour depth field.
pub const BLT_DEPTH_32: u32 = 3 << 24;

/// Ring selectors for `execbuffer2.flags`.
pub mod ring {
    pub const DEFAULT: u64 = 0;
    pub const RENDER: u64 = 1;
    pub const BSD: u64 = 2;
    pub const BLT: u64 = 3;
}

/// GEM cache domains.
pub mod domain {
    pub const CPU: u32 = 0x0000_0001;
    pub const RENDER: u32 = 0x0000_0002;
    pub const GTT: u32 = 0x0000_0040;
}

/// Dword indices in [`linear_copy_batch`] that receive relocations.
pub const COPY_DST_RELOC_DWORD: usize = 4;
pub const COPY_SRC_RELOC_DWORD: usize = 7;

/// Ten-dword batch copying a `width`×`height` 32 bpp linear surface.
///
/// Destination and source addresses are left as zero; the caller supplies
/// relocations at [`COPY_DST_RELOC_DWORD`] and [`COPY_SRC_RELOC_DWORD`].
#[must_use]
pub const fn linear_copy_batch(width: u32, height: u32) -> [u32; 10] {
    copy_batch(width, height, false, false)
}

/// Like [`linear_copy_batch`], with either side X-tiled.
///
/// Gen4+ blitters take the pitch of a tiled surface in dwords and need the
/// per-side tiled bit. Older parts reach tiled surfaces through fences and
/// must be given `false` here.
#[must_use]
pub const fn copy_batch(width: u32, height: u32, src_tiled: bool, dst_tiled: bool) -> [u32; 10] {
    let mut cmd = XY_SRC_COPY_BLT_CMD | XY_SRC_COPY_BLT_WRITE_ALPHA | XY_SRC_COPY_BLT_WRITE_RGB;
    let mut src_pitch = width * 4;
    let mut dst_pitch = width * 4;
    if src_tiled {
        src_pitch /= 4;
        cmd |= XY_SRC_COPY_BLT_SRC_TILED;
    }
    if dst_tiled {
        dst_pitch /= 4;
        cmd |= XY_SRC_COPY_BLT_DST_TILED;
    }
    [
        cmd,
        BLT_DEPTH_32 | (ROP_SRC_COPY << 16) | dst_pitch,
        0,                      // dst x1,y1
        (height << 16) | width, // dst x2,y2
        0,                      // dst reloc
        0,                      // src x1,y1
        src_pitch,
        0, // src reloc
        MI_BATCH_BUFFER_END,
        MI_NOOP,
    ]
}
