//! Cache entry table and block-wise read path

use std::collections::TryReserveError;
use std::io;

use tracing::trace;

use super::EvictionPolicy;
use crate::device::BlockDevice;
use crate::error::{LogFsError, Result};

/// One block-sized slot
#[derive(Debug)]
pub struct CacheEntry {
    offset: u64,
    data: Box<[u8]>,
    valid: bool,
}

impl CacheEntry {
    /// An invalid slot with a zeroed block buffer
    pub(crate) fn empty(block_size: usize) -> std::result::Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(block_size)?;
        data.resize(block_size, 0);
        Ok(Self {
            offset: 0,
            data: data.into_boxed_slice(),
            valid: false,
        })
    }

    /// Mark the slot as holding the block at `offset`
    pub(crate) fn fill(&mut self, offset: u64) {
        self.offset = offset;
        self.valid = true;
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn overlaps(&self, start: u64, end: u64) -> bool {
        let entry_end = self.offset + self.data.len() as u64;
        self.offset < end && start < entry_end
    }
}

/// Fixed array of cache entries plus the victim policy
pub struct ReadCache {
    entries: Vec<CacheEntry>,
    block_size: usize,
    policy: Box<dyn EvictionPolicy>,
    hits: u64,
    misses: u64,
}

impl ReadCache {
    /// Allocate `entries` block-sized slots, all invalid
    pub fn new(
        block_size: usize,
        entries: usize,
        policy: Box<dyn EvictionPolicy>,
    ) -> Result<Self> {
        let bytes = block_size.saturating_mul(entries);
        let mut table = Vec::new();
        table
            .try_reserve_exact(entries)
            .map_err(|_| LogFsError::OutOfMemory { bytes })?;
        for _ in 0..entries {
            let entry =
                CacheEntry::empty(block_size).map_err(|_| LogFsError::OutOfMemory { bytes })?;
            table.push(entry);
        }

        Ok(Self {
            entries: table,
            block_size,
            policy,
            hits: 0,
            misses: 0,
        })
    }

    /// Slot holding a valid copy of the block at `aligned_offset`
    pub fn lookup(&self, aligned_offset: u64) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.valid && e.offset == aligned_offset)
    }

    pub fn is_cached(&self, aligned_offset: u64) -> bool {
        self.lookup(aligned_offset).is_some()
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Fill `dst` with the bytes at `[offset, offset + dst.len())`
    ///
    /// Walks the range block by block in offset order. Hits copy out of
    /// the cache; a miss evicts a slot and loads the block from `device`.
    /// A failed device read leaves the chosen slot invalid and aborts.
    pub fn read(&mut self, device: &dyn BlockDevice, offset: u64, dst: &mut [u8]) -> io::Result<()> {
        let block = self.block_size as u64;
        let mut done = 0usize;

        while done < dst.len() {
            let pos = offset + done as u64;
            let aligned = pos - pos % block;

            let slot = match self.lookup(aligned) {
                Some(slot) => {
                    self.hits += 1;
                    self.policy.on_access(slot);
                    slot
                }
                None => {
                    self.misses += 1;
                    let slot = self.policy.select_victim(&self.entries);
                    let entry = &mut self.entries[slot];
                    entry.valid = false;
                    device.read_blocks(aligned, &mut entry.data)?;
                    entry.fill(aligned);
                    self.policy.on_fill(slot);
                    trace!(slot, offset = aligned, "filled cache entry");
                    slot
                }
            };

            let within = (pos - aligned) as usize;
            let n = (self.block_size - within).min(dst.len() - done);
            dst[done..done + n].copy_from_slice(&self.entries[slot].data[within..within + n]);
            done += n;
        }
        Ok(())
    }

    /// Invalidate every valid entry whose block intersects `[offset, offset + len)`
    ///
    /// Returns how many entries were dropped.
    pub fn invalidate_range(&mut self, offset: u64, len: usize) -> usize {
        let end = offset + len as u64;
        let mut dropped = 0;
        for entry in self.entries.iter_mut() {
            if entry.valid && entry.overlaps(offset, end) {
                entry.valid = false;
                dropped += 1;
            }
        }
        dropped
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.valid = false;
        }
    }
}
