//! Partial pwrite / pread against GPU-written data on real hardware
//!
//! The scratch object is always filled by the blitter from a staging
//! object, so partial CPU reads and writes touch cachelines the GPU wrote
//! last. Results are copied back to staging with the blitter before they
//! are checked.

use i915_chip::mi::{self, domain, ring};
use i915_driver::{BatchBuilder, ContextId, DrmDevice, GemHandle};

const BO_SIZE: usize = 4 * 4096;
const ROUNDS: usize = 1000;

/// The object as a 1024-pixel-wide 32 bpp surface, one row per page.
const COPY: [u32; 10] = mi::linear_copy_batch(1024, (BO_SIZE / 4096) as u32);

/// xorshift32, enough to scatter offsets
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() as usize % n
    }

    /// Random non-empty `(start, len)` inside the object.
    fn span(&mut self) -> (usize, usize) {
        let start = self.below(BO_SIZE);
        (start, self.below(BO_SIZE - start) + 1)
    }
}

struct Fixture {
    dev: DrmDevice,
    ring: u64,
    scratch: GemHandle,
    staging: GemHandle,
}

impl Fixture {
    fn new() -> Self {
        let dev = DrmDevice::open_any().expect("i915 device");
        let ring = if dev.has_blt() { ring::BLT } else { ring::DEFAULT };
        let scratch = dev.gem_create(BO_SIZE as u64).expect("create scratch");
        let staging = dev.gem_create(BO_SIZE as u64).expect("create staging");
        Self {
            dev,
            ring,
            scratch,
            staging,
        }
    }

    fn copy(&self, src: GemHandle, dst: GemHandle) {
        let mut b = BatchBuilder::from_dwords(&COPY);
        b.reloc_at(mi::COPY_DST_RELOC_DWORD, dst, 0, domain::RENDER, domain::RENDER)
            .reloc_at(mi::COPY_SRC_RELOC_DWORD, src, 0, domain::RENDER, 0);
        b.upload(&self.dev)
            .expect("upload copy")
            .submit(self.ring, ContextId::DEFAULT)
            .expect("blit");
    }

    /// Fill scratch with `value` through the blitter.
    fn blt_fill(&self, value: u8) {
        self.dev
            .gem_pwrite(self.staging, 0, &[value; BO_SIZE])
            .expect("fill staging");
        self.copy(self.staging, self.scratch);
    }

    /// Scratch contents as seen after a blit back into staging.
    fn read_back(&self) -> Vec<u8> {
        self.copy(self.scratch, self.staging);
        let mut buf = vec![0u8; BO_SIZE];
        self.dev.gem_pread(self.staging, 0, &mut buf).expect("pread staging");
        buf
    }

    fn assert_partial_read(&self, rng: &mut Rng, value: u8, round: usize) {
        let (start, len) = rng.span();
        let mut buf = vec![0u8; len];
        self.dev
            .gem_pread(self.scratch, start as u64, &mut buf)
            .expect("partial pread");
        if let Some(j) = buf.iter().position(|&b| b != value) {
            panic!("round {round}: read mismatch at {}, got {}, expected {value}", start + j, buf[j]);
        }
    }

    fn assert_partial_write(&self, rng: &mut Rng, value: u8, round: usize) {
        let (start, len) = rng.span();
        let written = (round as u8).wrapping_add(63);
        self.dev
            .gem_pwrite(self.scratch, start as u64, &vec![written; len])
            .expect("partial pwrite");

        let buf = self.read_back();
        for (j, &b) in buf.iter().enumerate() {
            let want = if (start..start + len).contains(&j) { written } else { value };
            assert_eq!(b, want, "round {round}: mismatch at {j} (write {start}+{len})");
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = self.dev.gem_close(self.staging);
        let _ = self.dev.gem_close(self.scratch);
    }
}

#[test]
#[ignore] // Requires hardware
fn partial_reads() {
    let fx = Fixture::new();
    let mut rng = Rng(0xdead_beef);

    for round in 0..ROUNDS {
        let value = round as u8;
        fx.blt_fill(value);
        fx.assert_partial_read(&mut rng, value, round);
    }
}

#[test]
#[ignore] // Requires hardware
fn partial_writes() {
    let fx = Fixture::new();
    let mut rng = Rng(0x1234_5678);

    for round in 0..ROUNDS {
        let value = round as u8;
        fx.blt_fill(value);
        fx.assert_partial_write(&mut rng, value, round);
    }
}

#[test]
#[ignore] // Requires hardware
fn partial_read_writes() {
    let fx = Fixture::new();
    let mut rng = Rng(0x0bad_cafe);

    for round in 0..ROUNDS {
        let value = round as u8;
        fx.blt_fill(value);
        fx.assert_partial_read(&mut rng, value, round);

        // Rewrite through the GPU so the cachelines the read pulled in go stale.
        let value = (round as u8).wrapping_add(17);
        fx.blt_fill(value);
        fx.assert_partial_write(&mut rng, value, round);
    }
}
