//! X-tiled blit consistency.
//!
//! Each of `count` 1 MiB X-tiled objects is filled by writing an incrementing
//! dword pattern into a linear staging object and blitting it across. The
//! tiled objects are then copied into each other in forward, backward and
//! random order; every check blits the tiled object back into a fresh linear
//! object and reads that. The CPU never touches a tiled object directly, so
//! a wrong tiling or fence setup shows up as swizzled data.
//!
//! Usage:
//!   cargo run --release --bin tiled_blits
//!   cargo run --release --bin tiled_blits -- 33

use anyhow::{bail, Context, Result};
use i915_bench::{blit_ring, default_buffer_count, submit_copy, Xoshiro, EXIT_SKIP};
use i915_chip::{mi, Platform};
use i915_driver::{DrmDevice, GemHandle, GpuError, Tiling};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 512;
const HEIGHT: u32 = 512;
const DWORDS: usize = (WIDTH * HEIGHT) as usize;
const BO_SIZE: u64 = (DWORDS * 4) as u64;
const STRIDE: u32 = WIDTH * 4;

const LINEAR_TO_TILED: [u32; 10] = mi::copy_batch(WIDTH, HEIGHT, false, true);
const TILED_TO_LINEAR: [u32; 10] = mi::copy_batch(WIDTH, HEIGHT, true, false);
const TILED_TO_TILED: [u32; 10] = mi::copy_batch(WIDTH, HEIGHT, true, true);

struct Tiled<'a> {
    dev: &'a DrmDevice,
    ring: u64,
}

impl Tiled<'_> {
    /// Tiled object holding `start`, `start + 1`, … in linear order.
    fn create(&self, start: u32) -> Result<GemHandle> {
        let bo = self.dev.gem_create(BO_SIZE)?;
        if let Err(e) = self.fill(bo, start) {
            if let Err(close) = self.dev.gem_close(bo) {
                tracing::warn!("closing {bo} failed: {close}");
            }
            return Err(e);
        }
        Ok(bo)
    }

    fn fill(&self, bo: GemHandle, start: u32) -> Result<()> {
        let tiling = self.dev.gem_set_tiling(bo, Tiling::X, STRIDE)?;
        if tiling != Tiling::X {
            bail!("kernel applied {tiling:?} instead of X tiling");
        }

        let linear = self.dev.gem_create(BO_SIZE)?;
        let pattern: Vec<u32> = (0..DWORDS as u32).map(|j| start.wrapping_add(j)).collect();
        let result = self
            .dev
            .gem_pwrite(linear, 0, bytemuck::cast_slice(&pattern))
            .and_then(|()| submit_copy(self.dev, self.ring, &LINEAR_TO_TILED, bo, linear));
        self.dev.gem_close(linear)?;
        Ok(result?)
    }

    fn check(&self, bo: GemHandle, start: u32) -> Result<()> {
        let linear = self.dev.gem_create(BO_SIZE)?;
        let mut buf = vec![0u32; DWORDS];
        let result = submit_copy(self.dev, self.ring, &TILED_TO_LINEAR, linear, bo)
            .and_then(|()| self.dev.gem_pread(linear, 0, bytemuck::cast_slice_mut(&mut buf)));
        self.dev.gem_close(linear)?;
        result?;

        let expected = (0..DWORDS as u32).map(|j| start.wrapping_add(j));
        if let Some((i, (found, want))) = buf
            .iter()
            .copied()
            .zip(expected)
            .enumerate()
            .find(|(_, (found, want))| found != want)
        {
            return Err(GpuError::mismatch(format!(
                "{bo}: expected 0x{want:08x}, found 0x{found:08x} at offset 0x{:08x}",
                i * 4
            ))
            .into());
        }
        Ok(())
    }

    fn check_all(&self, bos: &[GemHandle], starts: &[u32]) -> Result<()> {
        for (&bo, &start) in bos.iter().zip(starts) {
            self.check(bo, start)?;
        }
        Ok(())
    }

    fn copy(&self, bos: &[GemHandle], starts: &mut [u32], dst: usize, src: usize) -> Result<()> {
        submit_copy(self.dev, self.ring, &TILED_TO_TILED, bos[dst], bos[src])?;
        starts[dst] = starts[src];
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    println!("GEM tiled blits");
    println!("===============");

    let dev = DrmDevice::open_any().context("no i915 device")?;
    let platform = Platform::from_device_id(dev.chipset_id()?);
    if !platform.is_965() {
        // Pre-Gen4 blits of tiled surfaces go through fences.
        println!("{platform}: tiled blits need fenced relocations, skipping");
        std::process::exit(EXIT_SKIP);
    }

    let count = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("invalid count: {arg}"))?,
        // Always odd.
        None => default_buffer_count(&dev)? | 1,
    };
    if count == 0 {
        bail!("count must be positive");
    }
    println!("Using {count} 1 MiB buffers");

    let t0 = Instant::now();
    let tiled = Tiled {
        dev: &dev,
        ring: blit_ring(&dev),
    };
    let mut bos = Vec::with_capacity(count);
    let mut starts = Vec::with_capacity(count);
    let result = (|| -> Result<()> {
        for i in 0..count {
            let start = (i * DWORDS) as u32;
            bos.push(tiled.create(start)?);
            starts.push(start);
        }
        run_passes(&tiled, &bos, &mut starts)
    })();

    for &bo in &bos {
        if let Err(e) = dev.gem_close(bo) {
            tracing::warn!("closing {bo} failed: {e}");
        }
    }
    result?;

    println!("All passes verified in {:.2} s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn run_passes(tiled: &Tiled<'_>, bos: &[GemHandle], starts: &mut [u32]) -> Result<()> {
    let count = bos.len();

    println!("Verifying initialisation...");
    tiled.check_all(bos, starts).context("initial contents")?;

    println!("Cyclic blits, forward...");
    for i in 0..count * 4 {
        let (src, dst) = (i % count, (i + 1) % count);
        if src != dst {
            tiled.copy(bos, starts, dst, src)?;
        }
    }
    tiled.check_all(bos, starts).context("forward pass")?;

    println!("Cyclic blits, backward...");
    for i in 0..count * 4 {
        let (src, dst) = ((i + 1) % count, i % count);
        if src != dst {
            tiled.copy(bos, starts, dst, src)?;
        }
    }
    tiled.check_all(bos, starts).context("backward pass")?;

    println!("Random blits...");
    let mut rng = Xoshiro::new(0x5eed);
    for _ in 0..count * 4 {
        let src = rng.below(count);
        let dst = rng.below(count);
        if src != dst {
            tiled.copy(bos, starts, dst, src)?;
        }
    }
    tiled.check_all(bos, starts).context("random pass")
}
