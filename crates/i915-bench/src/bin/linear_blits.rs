//! Linear blit consistency.
//!
//! Fills `count` 1 MiB buffers with distinct incrementing dword patterns,
//! then copies them into each other with the blitter in a forward cycle, a
//! backward cycle and a random order, verifying every buffer after each
//! pass. The default count is sized to 1.5× the GTT aperture so objects
//! get evicted and rebound along the way.
//!
//! Usage:
//!   cargo run --release --bin linear_blits
//!   cargo run --release --bin linear_blits -- 64

use anyhow::{bail, Context, Result};
use i915_bench::{blit_ring, default_buffer_count, submit_copy, Xoshiro};
use i915_chip::mi;
use i915_driver::{DrmDevice, GemHandle, GpuError};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 512;
const HEIGHT: u32 = 512;
const DWORDS: usize = (WIDTH * HEIGHT) as usize;
const BO_SIZE: u64 = (DWORDS * 4) as u64;
const COPY: [u32; 10] = mi::linear_copy_batch(WIDTH, HEIGHT);

struct Surface {
    handle: GemHandle,
    start: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    println!("GEM linear blits");
    println!("================");

    let dev = DrmDevice::open_any().context("no i915 device")?;
    let blit_ring = blit_ring(&dev);

    let count = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("invalid count: {arg}"))?,
        None => default_buffer_count(&dev)?,
    };
    if count == 0 {
        bail!("count must be positive");
    }
    println!("Using {count} 1 MiB buffers");

    let t0 = Instant::now();
    let mut surfaces = Vec::with_capacity(count);
    for i in 0..count {
        let handle = dev.gem_create(BO_SIZE)?;
        let start = (i * DWORDS) as u32;
        let pattern: Vec<u32> = (0..DWORDS as u32).map(|j| start.wrapping_add(j)).collect();
        dev.gem_pwrite(handle, 0, bytemuck::cast_slice(&pattern))?;
        surfaces.push(Surface { handle, start });
    }
    let result = run_passes(&dev, blit_ring, &mut surfaces);

    for s in &surfaces {
        if let Err(e) = dev.gem_close(s.handle) {
            tracing::warn!("closing {} failed: {e}", s.handle);
        }
    }
    result?;

    println!("All passes verified in {:.2} s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn run_passes(dev: &DrmDevice, blit_ring: u64, surfaces: &mut [Surface]) -> Result<()> {
    let count = surfaces.len();
    verify_all(dev, surfaces).context("initial contents")?;

    println!("Cyclic blits, forward...");
    for i in 0..count {
        let (src, dst) = (i, (i + 1) % count);
        copy(dev, blit_ring, surfaces, dst, src)?;
    }
    verify_all(dev, surfaces).context("forward pass")?;

    println!("Cyclic blits, backward...");
    for i in 0..count {
        let (src, dst) = ((i + 1) % count, i);
        copy(dev, blit_ring, surfaces, dst, src)?;
    }
    verify_all(dev, surfaces).context("backward pass")?;

    println!("Random blits...");
    let mut rng = Xoshiro::new(0x5eed);
    for _ in 0..count * 4 {
        let src = rng.below(count);
        let dst = rng.below(count);
        if src == dst {
            continue;
        }
        copy(dev, blit_ring, surfaces, dst, src)?;
    }
    verify_all(dev, surfaces).context("random pass")
}

fn copy(dev: &DrmDevice, blit_ring: u64, surfaces: &mut [Surface], dst: usize, src: usize) -> Result<()> {
    submit_copy(dev, blit_ring, &COPY, surfaces[dst].handle, surfaces[src].handle)?;
    surfaces[dst].start = surfaces[src].start;
    Ok(())
}

fn verify_all(dev: &DrmDevice, surfaces: &[Surface]) -> Result<()> {
    let mut buf = vec![0u32; DWORDS];
    for s in surfaces {
        dev.gem_pread(s.handle, 0, bytemuck::cast_slice_mut(&mut buf))?;
        let expected = (0..DWORDS as u32).map(|j| s.start.wrapping_add(j));
        if let Some((i, (found, want))) = buf
            .iter()
            .copied()
            .zip(expected)
            .enumerate()
            .find(|(_, (found, want))| found != want)
        {
            return Err(GpuError::mismatch(format!(
                "{}: expected 0x{want:08x}, found 0x{found:08x} at offset 0x{:08x}",
                s.handle,
                i * 4
            ))
            .into());
        }
    }
    Ok(())
}
