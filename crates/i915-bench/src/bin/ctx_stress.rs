//! Hardware context create/exec stress.
//!
//! Spawns worker threads that each create a logical context and submit
//! batches in it. Every iteration allocates two fresh 4 KiB objects, binds
//! them to the batch and closes them again, so object or context leaks in
//! the kernel grow with the iteration count. Workers open their own DRM fd
//! by default; `--shared-fd` makes them all use one. The status of the
//! first failing worker becomes the process exit code.
//!
//! Usage:
//!   cargo run --release --bin ctx_stress
//!   cargo run --release --bin ctx_stress -- --threads 4 --iterations 1000
//!   cargo run --release --bin ctx_stress -- --shared-fd

use anyhow::{Context, Result};
use i915_bench::{parse_arg, StressConfig, EXIT_SKIP};
use i915_chip::mi::{ring, MI_BATCH_BUFFER_END, MI_NOOP};
use i915_driver::{BatchBuilder, ContextId, DrmDevice, GpuError};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const SCRATCH_SIZE: u64 = 4096;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let defaults = StressConfig::default();
    let cfg = StressConfig {
        threads: parse_arg(&args, "--threads", defaults.threads),
        iterations: parse_arg(&args, "--iterations", defaults.iterations),
        multiple_fds: fd_mode(&args, defaults.multiple_fds),
    };

    println!("GEM context stress");
    println!("==================");
    println!(
        "{} threads × {} batches, {}",
        cfg.threads,
        cfg.iterations,
        if cfg.multiple_fds { "one fd each" } else { "shared fd" }
    );

    let shared = if cfg.multiple_fds {
        None
    } else {
        Some(Arc::new(DrmDevice::open_any().context("no i915 device")?))
    };

    let start = Instant::now();
    let workers: Vec<_> = (0..cfg.threads)
        .map(|id| {
            let iterations = cfg.iterations;
            let shared = shared.clone();
            std::thread::spawn(move || worker(id, shared, iterations))
        })
        .collect();

    let mut status = 0;
    for (id, handle) in workers.into_iter().enumerate() {
        let code = match handle.join() {
            Ok(code) => code,
            Err(_) => {
                eprintln!("worker {id} panicked");
                1
            }
        };
        if status == 0 && code != 0 {
            status = code;
        }
    }

    if status != 0 {
        std::process::exit(status);
    }
    println!("Done in {:.2} s", start.elapsed().as_secs_f64());
    Ok(())
}

/// `--shared-fd` wins over `--multiple-fds`; neither keeps `default`.
fn fd_mode(args: &[String], default: bool) -> bool {
    if args.iter().any(|a| a == "--shared-fd") {
        false
    } else if args.iter().any(|a| a == "--multiple-fds") {
        true
    } else {
        default
    }
}

/// Exit status of one worker: 0, [`EXIT_SKIP`] or 1.
fn worker(id: usize, shared: Option<Arc<DrmDevice>>, iterations: usize) -> i32 {
    let result = match shared {
        Some(dev) => run_worker(id, &dev, iterations),
        None => DrmDevice::open_any()
            .context("no i915 device")
            .and_then(|dev| run_worker(id, &dev, iterations)),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            if let Some(GpuError::Unsupported { .. }) = e.downcast_ref::<GpuError>() {
                println!("worker {id}: contexts not supported");
                return EXIT_SKIP;
            }
            eprintln!("worker {id}: {e:#}");
            1
        }
    }
}

fn run_worker(id: usize, dev: &DrmDevice, iterations: usize) -> Result<()> {
    let ctx = match dev.context_create() {
        Ok(ctx) => ctx,
        Err(e) if matches!(e.errno(), Some(libc::ENODEV | libc::EINVAL)) => {
            return Err(GpuError::unsupported("hardware contexts").into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!("worker {id}: context {}", ctx.0);

    let result = (0..iterations).try_for_each(|i| {
        exec_with_scratch(dev, ctx).with_context(|| format!("exec {i} in context {}", ctx.0))
    });

    dev.context_destroy(ctx)?;
    result
}

/// One batch in `ctx` with two freshly allocated 4 KiB objects bound to it.
fn exec_with_scratch(dev: &DrmDevice, ctx: ContextId) -> Result<()> {
    let src = dev.gem_create(SCRATCH_SIZE)?;
    let dst = match dev.gem_create(SCRATCH_SIZE) {
        Ok(dst) => dst,
        Err(e) => {
            dev.gem_close(src)?;
            return Err(e.into());
        }
    };

    let result = BatchBuilder::from_dwords(&[MI_BATCH_BUFFER_END, MI_NOOP])
        .upload(dev)
        .and_then(|mut batch| batch.submit_with(&[src, dst], ring::RENDER, ctx));

    dev.gem_close(dst)?;
    dev.gem_close(src)?;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn fd_mode_flags() {
        assert!(fd_mode(&args(&["ctx_stress"]), true));
        assert!(!fd_mode(&args(&["ctx_stress", "--shared-fd"]), true));
        assert!(fd_mode(&args(&["ctx_stress", "--multiple-fds"]), false));
        assert!(!fd_mode(&args(&["ctx_stress", "--multiple-fds", "--shared-fd"]), true));
    }
}
