//! Nop batch execution latency.
//!
//! Submits an empty batch (`MI_BATCH_BUFFER_END`) 1, 2, 4 … 2^17 times on
//! every ring the kernel exposes and reports the average time per
//! submission, including the final wait for the GPU.
//!
//! Usage:
//!   cargo run --release --bin exec_nop
//!   cargo run --release --bin exec_nop -- --max-loops 1024

use anyhow::{Context, Result};
use i915_bench::{available_rings, parse_arg, ExecConfig, Ring, EXIT_SKIP};
use i915_chip::mi::{MI_BATCH_BUFFER_END, MI_NOOP};
use i915_driver::{Batch, BatchBuilder, ContextId, DrmDevice};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let defaults = ExecConfig::default();
    let cfg = ExecConfig {
        max_loops: parse_arg(&args, "--max-loops", defaults.max_loops),
    };

    println!("GEM nop execution");
    println!("=================");

    let dev = DrmDevice::open_any().context("no i915 device")?;
    let batch = BatchBuilder::from_dwords(&[MI_BATCH_BUFFER_END, MI_NOOP]);
    let mut nop = batch.upload(&dev)?;

    let mut skipped_all = true;
    for ring in available_rings(&dev) {
        // Probe once so a ring the kernel refuses is skipped, not failed.
        if let Err(e) = nop.run(ring.flag, ContextId::DEFAULT) {
            println!("ring {}: skipped ({e})", ring.name);
            continue;
        }
        skipped_all = false;
        time_ring(&dev, &mut nop, ring, &cfg)?;
    }

    if skipped_all {
        std::process::exit(EXIT_SKIP);
    }
    Ok(())
}

/// Average per-submission time, measured until the last batch retires.
fn time_ring(dev: &DrmDevice, nop: &mut Batch<'_>, ring: Ring, cfg: &ExecConfig) -> Result<()> {
    for count in cfg.loop_counts() {
        let start = Instant::now();
        for _ in 0..count {
            nop.submit(ring.flag, ContextId::DEFAULT)
                .with_context(|| format!("exec on {}", ring.name))?;
        }
        dev.gem_sync(nop.handle())?;
        let us = start.elapsed().as_secs_f64() * 1e6 / f64::from(count);
        println!(
            "Time to exec x {count}: {us:7.3} µs (ring={})",
            ring.name
        );
    }
    Ok(())
}
