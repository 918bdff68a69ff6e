//! Privileged register write from an unprivileged batch.
//!
//! Submits `MI_LOAD_REGISTER_IMM` targeting `RENDER_RING_CTL` on randomly
//! chosen rings. The command parser must either reject the batch or the
//! hardware must ignore the write; either way the GPU must keep running.
//! Every batch is waited on, so a hang shows up as this program stalling.
//!
//! Usage:
//!   cargo run --release --bin non_secure_batch
//!   cargo run --release --bin non_secure_batch -- --iterations 16

use anyhow::{Context, Result};
use i915_bench::{available_rings, parse_arg, Xoshiro};
use i915_chip::mi::{self, MI_NOOP};
use i915_chip::regs::RENDER_RING_CTL;
use i915_driver::{BatchBuilder, ContextId, DrmDevice};
use tracing_subscriber::EnvFilter;

const SEED: u64 = 0xdead_beef;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let iterations: usize = parse_arg(&args, "--iterations", 0x100);

    println!("GEM non-secure batch");
    println!("====================");

    let dev = DrmDevice::open_any().context("no i915 device")?;
    let rings = available_rings(&dev);
    let mut rng = Xoshiro::new(SEED);

    let mut b = BatchBuilder::new();
    b.emit(mi::load_register_imm(1))
        .emit(RENDER_RING_CTL)
        .emit(0)
        .emit(MI_NOOP)
        .end();
    let mut batch = b.upload(&dev)?;

    let (mut accepted, mut rejected) = (0usize, 0usize);
    for i in 0..iterations {
        let ring = rings[rng.below(rings.len())];
        match batch.run(ring.flag, ContextId::DEFAULT) {
            Ok(()) => accepted += 1,
            Err(e) if e.errno() == Some(libc::EINVAL) => {
                tracing::debug!("batch {i} on {} rejected", ring.name);
                rejected += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("batch {i} on {}", ring.name)),
        }
    }

    println!("{accepted} executed, {rejected} rejected by the command parser");
    Ok(())
}
