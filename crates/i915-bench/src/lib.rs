//! Shared plumbing for the GEM benchmark and stress binaries.
//!
//! Each program under `src/bin/` is standalone; this module only holds the
//! pieces several of them need: argument parsing, ring enumeration, blit
//! submission, buffer-count sizing, the skip exit code and a small
//! deterministic PRNG.

#![warn(clippy::all)]

use i915_chip::mi::{self, domain, ring};
use i915_driver::{BatchBuilder, ContextId, DrmDevice, GemHandle};

/// Exit status reported when the hardware lacks what a program exercises.
pub const EXIT_SKIP: i32 = 77;

/// Parse `flag <value>` out of `args`, falling back to `default`.
pub fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

/// Execution ring available on the opened device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    /// Short name used in reports
    pub name: &'static str,
    /// `execbuffer2` ring selector
    pub flag: u64,
}

impl Ring {
    /// Render (3D) ring
    pub const RENDER: Self = Self {
        name: "render",
        flag: ring::RENDER,
    };
    /// Video decode ring
    pub const BSD: Self = Self {
        name: "bsd",
        flag: ring::BSD,
    };
    /// Blitter ring
    pub const BLT: Self = Self {
        name: "blt",
        flag: ring::BLT,
    };
}

/// Rings the kernel reports for `dev`; render is always present.
pub fn available_rings(dev: &DrmDevice) -> Vec<Ring> {
    rings_from(dev.has_bsd(), dev.has_blt())
}

fn rings_from(has_bsd: bool, has_blt: bool) -> Vec<Ring> {
    let mut rings = vec![Ring::RENDER];
    if has_bsd {
        rings.push(Ring::BSD);
    }
    if has_blt {
        rings.push(Ring::BLT);
    }
    rings
}

/// `exec_nop` parameters
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Largest submission count timed per ring (doubled from 1).
    pub max_loops: u32,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self { max_loops: 1 << 17 }
    }
}

impl ExecConfig {
    /// Submission counts to time: 1, 2, 4 … `max_loops`.
    pub fn loop_counts(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::successors(Some(1u32), |n| n.checked_mul(2)).take_while(|&n| n <= self.max_loops)
    }
}

/// `ctx_stress` parameters
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Worker threads, each with its own context
    pub threads: usize,
    /// Batches submitted per worker
    pub iterations: usize,
    /// Give every worker its own DRM fd instead of sharing one
    pub multiple_fds: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            iterations: 10_000,
            multiple_fds: true,
        }
    }
}

/// Ring blits run on: the blitter when present, otherwise the default ring.
pub fn blit_ring(dev: &DrmDevice) -> u64 {
    if dev.has_blt() {
        ring::BLT
    } else {
        ring::DEFAULT
    }
}

/// Submit a ten-dword copy batch from [`mi::copy_batch`] with `dst` and
/// `src` relocated into it.
///
/// # Errors
///
/// Returns the error of the upload or the submission.
pub fn submit_copy(
    dev: &DrmDevice,
    ring: u64,
    dwords: &[u32; 10],
    dst: GemHandle,
    src: GemHandle,
) -> i915_driver::Result<()> {
    let mut b = BatchBuilder::from_dwords(dwords);
    b.reloc_at(mi::COPY_DST_RELOC_DWORD, dst, 0, domain::RENDER, domain::RENDER)
        .reloc_at(mi::COPY_SRC_RELOC_DWORD, src, 0, domain::RENDER, 0);
    b.upload(dev)?.submit(ring, ContextId::DEFAULT)
}

const MIB: u64 = 1024 * 1024;

/// 1 MiB buffers covering 1.5× the GTT aperture, capped at 90% of RAM.
///
/// # Errors
///
/// Returns the error of the aperture query.
pub fn default_buffer_count(dev: &DrmDevice) -> i915_driver::Result<usize> {
    let aperture_mb = dev.gem_aperture_size()? / MIB;
    let ram_mb = std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|m| mem_total_mb(&m));
    Ok(buffer_count(aperture_mb, ram_mb))
}

fn buffer_count(aperture_mb: u64, ram_mb: Option<u64>) -> usize {
    let mut count = 3 * aperture_mb / 2;
    if let Some(ram_mb) = ram_mb {
        let cap = ram_mb * 9 / 10;
        if count > cap {
            tracing::info!("not enough RAM for {count} buffers, reducing to {cap}");
            count = cap;
        }
    }
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// `MemTotal` of a /proc/meminfo dump, in MiB.
fn mem_total_mb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|l| l.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
        .map(|kb| kb / 1024)
}

// ─── Utility: PRNG ───────────────────────────────────────────────────────────

/// xoshiro256++ seeded through splitmix64
pub struct Xoshiro {
    s: [u64; 4],
}

impl Xoshiro {
    /// Generator seeded from `seed`
    pub fn new(seed: u64) -> Self {
        let mut z = seed;
        let mut s = [0u64; 4];
        for slot in &mut s {
            z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut x = z;
            x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            *slot = x ^ (x >> 31);
        }
        Self { s }
    }

    /// Next 64 random bits
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform-enough index in `0..n`; `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arg_reads_flag_value() {
        let args: Vec<String> = ["prog", "--threads", "4", "--bogus"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(parse_arg(&args, "--threads", 10usize), 4);
        assert_eq!(parse_arg(&args, "--iterations", 7usize), 7);
        assert_eq!(parse_arg(&args, "--bogus", 1u32), 1);
    }

    #[test]
    fn loop_counts_double_up_to_max() {
        let cfg = ExecConfig::default();
        let counts: Vec<u32> = cfg.loop_counts().collect();
        assert_eq!(counts.len(), 18);
        assert_eq!(counts[0], 1);
        assert_eq!(*counts.last().unwrap(), 1 << 17);

        let small = ExecConfig { max_loops: 5 };
        assert_eq!(small.loop_counts().collect::<Vec<_>>(), [1, 2, 4]);
    }

    #[test]
    fn rings_always_include_render() {
        assert_eq!(rings_from(false, false), [Ring::RENDER]);
        assert_eq!(rings_from(true, true), [Ring::RENDER, Ring::BSD, Ring::BLT]);
        assert_eq!(rings_from(false, true), [Ring::RENDER, Ring::BLT]);
    }

    #[test]
    fn stress_defaults() {
        let cfg = StressConfig::default();
        assert_eq!(cfg.threads, 10);
        assert_eq!(cfg.iterations, 10_000);
        assert!(cfg.multiple_fds);
    }

    #[test]
    fn buffer_count_capped_by_ram() {
        assert_eq!(buffer_count(256, None), 384);
        assert_eq!(buffer_count(256, Some(8192)), 384);
        assert_eq!(buffer_count(4096, Some(1000)), 900);
    }

    #[test]
    fn meminfo_total() {
        let dump = "MemTotal:       16314128 kB\nMemFree:         1234 kB\n";
        assert_eq!(mem_total_mb(dump), Some(15931));
        assert_eq!(mem_total_mb("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn xoshiro_is_deterministic() {
        let mut a = Xoshiro::new(0xdead_beef);
        let mut b = Xoshiro::new(0xdead_beef);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = Xoshiro::new(1);
        assert!((0..100).all(|_| c.below(3) < 3));
    }
}
