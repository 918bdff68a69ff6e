//! Batch buffer construction and submission.
//!
//! [`BatchBuilder`] collects dwords and relocations in memory;
//! [`BatchBuilder::upload`] copies them into a GEM object and returns a
//! [`Batch`] that can be executed any number of times. Submission retries on
//! `EBUSY` after throttling, the way the kernel expects clients to back off
//! when a ring is full.

use crate::drm::DrmDevice;
use crate::error::Result;
use crate::gem::{ContextId, ExecObject2, GemHandle, RelocationEntry};
use i915_chip::mi::{MI_BATCH_BUFFER_END, MI_NOOP};

const PAGE_SIZE: u64 = 4096;

/// In-memory batch under construction
#[derive(Debug, Clone, Default)]
pub struct BatchBuilder {
    dwords: Vec<u32>,
    relocs: Vec<RelocationEntry>,
}

impl BatchBuilder {
    /// Empty batch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch initialised from `dwords`
    #[must_use]
    pub fn from_dwords(dwords: &[u32]) -> Self {
        Self {
            dwords: dwords.to_vec(),
            relocs: Vec::new(),
        }
    }

    /// Append one dword.
    pub fn emit(&mut self, dword: u32) -> &mut Self {
        self.dwords.push(dword);
        self
    }

    /// Append several dwords.
    pub fn emit_all(&mut self, dwords: &[u32]) -> &mut Self {
        self.dwords.extend_from_slice(dwords);
        self
    }

    /// Patch dword `index` with the address of `target` plus `delta`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the batch.
    pub fn reloc_at(
        &mut self,
        index: usize,
        target: GemHandle,
        delta: u32,
        read_domains: u32,
        write_domain: u32,
    ) -> &mut Self {
        assert!(index < self.dwords.len(), "relocation past end of batch");
        self.relocs.push(RelocationEntry {
            target_handle: target.0,
            delta,
            offset: (index * 4) as u64,
            presumed_offset: 0,
            read_domains,
            write_domain,
        });
        self
    }

    /// Append an address dword for `target` plus `delta`.
    pub fn emit_reloc(
        &mut self,
        target: GemHandle,
        delta: u32,
        read_domains: u32,
        write_domain: u32,
    ) -> &mut Self {
        self.dwords.push(delta);
        let index = self.dwords.len() - 1;
        self.reloc_at(index, target, delta, read_domains, write_domain)
    }

    /// Terminate with `MI_BATCH_BUFFER_END`, padding to an even dword count.
    pub fn end(&mut self) -> &mut Self {
        self.dwords.push(MI_BATCH_BUFFER_END);
        if self.dwords.len() % 2 == 1 {
            self.dwords.push(MI_NOOP);
        }
        self
    }

    /// Dwords emitted so far
    #[must_use]
    pub fn dwords(&self) -> &[u32] {
        &self.dwords
    }

    /// Relocations recorded so far
    #[must_use]
    pub fn relocations(&self) -> &[RelocationEntry] {
        &self.relocs
    }

    /// Batch length in bytes
    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.dwords.len() * 4
    }

    /// Distinct relocation targets, in first-use order.
    fn targets(&self) -> Vec<GemHandle> {
        let mut out: Vec<GemHandle> = Vec::new();
        for r in &self.relocs {
            let h = GemHandle(r.target_handle);
            if !out.contains(&h) {
                out.push(h);
            }
        }
        out
    }

    /// Copy the batch into a fresh GEM object.
    ///
    /// # Errors
    ///
    /// Returns the error of object creation or the upload write.
    pub fn upload<'a>(&self, dev: &'a DrmDevice) -> Result<Batch<'a>> {
        let size = (self.len_bytes() as u64).div_ceil(PAGE_SIZE).max(1) * PAGE_SIZE;
        let handle = dev.gem_create(size)?;
        let batch = Batch {
            dev,
            handle,
            len: u32::try_from(self.len_bytes()).unwrap_or(u32::MAX),
            targets: self.targets(),
            relocs: self.relocs.clone(),
        };
        dev.gem_pwrite(handle, 0, bytemuck::cast_slice(&self.dwords))?;
        Ok(batch)
    }
}

/// Uploaded batch; closes its GEM object on drop
#[derive(Debug)]
pub struct Batch<'a> {
    dev: &'a DrmDevice,
    handle: GemHandle,
    len: u32,
    targets: Vec<GemHandle>,
    relocs: Vec<RelocationEntry>,
}

impl Batch<'_> {
    /// Handle of the batch object
    #[must_use]
    pub const fn handle(&self) -> GemHandle {
        self.handle
    }

    /// Execute on `ring` in context `ctx`.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` for anything but a transient `EBUSY`.
    pub fn submit(&mut self, ring: u64, ctx: ContextId) -> Result<()> {
        self.submit_with(&[], ring, ctx)
    }

    /// Execute with `extra` objects bound alongside the relocation targets.
    ///
    /// # Errors
    ///
    /// Returns `GpuError::Ioctl` for anything but a transient `EBUSY`.
    pub fn submit_with(&mut self, extra: &[GemHandle], ring: u64, ctx: ContextId) -> Result<()> {
        let mut objects: Vec<ExecObject2> = exec_order(extra, &self.targets)
            .into_iter()
            .map(ExecObject2::new)
            .collect();
        let mut batch_obj = ExecObject2::new(self.handle);
        batch_obj.relocation_count = self.relocs.len() as u32;
        batch_obj.relocs_ptr = self.relocs.as_mut_ptr() as u64;
        objects.push(batch_obj);

        loop {
            match self.dev.execbuffer2(&mut objects, self.len, ring, ctx) {
                Err(e) if e.errno() == Some(libc::EBUSY) => {
                    tracing::debug!("ring busy, throttling");
                    self.dev.gem_throttle()?;
                }
                other => return other,
            }
        }
    }

    /// Submit and wait for completion.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Batch::submit`] or the wait.
    pub fn run(&mut self, ring: u64, ctx: ContextId) -> Result<()> {
        self.submit(ring, ctx)?;
        self.dev.gem_sync(self.handle)
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.dev.gem_close(self.handle) {
            tracing::warn!("closing batch {} failed: {e}", self.handle);
        }
    }
}

/// `extra` followed by relocation targets not already listed.
fn exec_order(extra: &[GemHandle], targets: &[GemHandle]) -> Vec<GemHandle> {
    let mut out = extra.to_vec();
    for &t in targets {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use i915_chip::mi::{self, domain};

    #[test]
    fn end_pads_to_even_length() {
        let mut b = BatchBuilder::new();
        b.end();
        assert_eq!(b.dwords(), [MI_BATCH_BUFFER_END, MI_NOOP]);

        let mut b = BatchBuilder::new();
        b.emit(mi::load_register_imm(1)).emit(0x203c).emit(0).end();
        assert_eq!(b.dwords().len(), 4);
        assert_eq!(b.dwords()[3], MI_BATCH_BUFFER_END);
        assert_eq!(b.len_bytes(), 16);
    }

    #[test]
    fn relocations_record_byte_offsets() {
        let mut b = BatchBuilder::from_dwords(&mi::linear_copy_batch(512, 512));
        b.reloc_at(
            mi::COPY_DST_RELOC_DWORD,
            GemHandle(5),
            0,
            domain::RENDER,
            domain::RENDER,
        )
        .reloc_at(mi::COPY_SRC_RELOC_DWORD, GemHandle(6), 0, domain::RENDER, 0);
        let relocs = b.relocations();
        assert_eq!(relocs.len(), 2);
        assert_eq!(relocs[0].offset, 16);
        assert_eq!(relocs[0].write_domain, domain::RENDER);
        assert_eq!(relocs[1].offset, 28);
        assert_eq!(relocs[1].write_domain, 0);
        assert_eq!(b.targets(), [GemHandle(5), GemHandle(6)]);
    }

    #[test]
    fn emit_reloc_appends_presumed_address() {
        let mut b = BatchBuilder::new();
        b.emit(1).emit_reloc(GemHandle(9), 0x40, domain::RENDER, 0);
        assert_eq!(b.dwords(), [1, 0x40]);
        assert_eq!(b.relocations()[0].offset, 4);
        assert_eq!(b.relocations()[0].delta, 0x40);
    }

    #[test]
    fn duplicate_targets_listed_once() {
        let mut b = BatchBuilder::from_dwords(&[0; 4]);
        b.reloc_at(0, GemHandle(3), 0, 0, 0)
            .reloc_at(1, GemHandle(3), 4, 0, 0)
            .reloc_at(2, GemHandle(1), 0, 0, 0);
        assert_eq!(b.targets(), [GemHandle(3), GemHandle(1)]);
    }

    #[test]
    #[should_panic(expected = "relocation past end of batch")]
    fn reloc_past_end_panics() {
        BatchBuilder::new().reloc_at(0, GemHandle(1), 0, 0, 0);
    }

    #[test]
    fn extra_objects_precede_targets_without_duplicates() {
        let order = exec_order(&[GemHandle(4), GemHandle(2)], &[GemHandle(2), GemHandle(9)]);
        assert_eq!(order, [GemHandle(4), GemHandle(2), GemHandle(9)]);
        assert_eq!(exec_order(&[], &[GemHandle(1)]), [GemHandle(1)]);
    }
}
