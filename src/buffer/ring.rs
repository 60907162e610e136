//! Circular write buffer
//!
//! Fixed-capacity ring over a single owned byte region. Positions are
//! physical indices modulo the capacity; offsets are logical device offsets.

use std::ops::Range;

use crate::error::{LogFsError, Result};

/// Appended-but-not-yet-durable bytes
#[derive(Debug)]
pub struct WriteBuffer {
    pub(super) data: Vec<u8>,
    pub(super) block_size: usize,

    /// Next free position
    pub(super) head: usize,

    /// First pending position (always block-aligned)
    pub(super) tail: usize,

    /// Bytes in `[tail, head)`; distinguishes full from empty
    pub(super) used: usize,

    /// Logical device offset of `tail`
    pub(super) tail_offset: u64,

    /// Logical head as of the last flush; everything below it is on the device
    pub(super) last_flushed_head: u64,

    shutdown: bool,
}

impl WriteBuffer {
    /// Allocate a zeroed buffer of `blocks * block_size` bytes
    pub fn with_blocks(block_size: usize, blocks: usize) -> Result<Self> {
        let bytes = block_size
            .checked_mul(blocks)
            .ok_or(LogFsError::OutOfMemory { bytes: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| LogFsError::OutOfMemory { bytes })?;
        data.resize(bytes, 0);

        Ok(Self {
            data,
            block_size,
            head: 0,
            tail: 0,
            used: 0,
            tail_offset: 0,
            last_flushed_head: 0,
            shutdown: false,
        })
    }

    /// Total capacity `C` in bytes
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes still pending (not yet durable, or durable only as a padded block)
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes an append may take right now
    pub fn available(&self) -> usize {
        self.capacity() - self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Logical offset one past the last appended byte
    pub fn head_offset(&self) -> u64 {
        self.tail_offset + self.used as u64
    }

    /// Logical offset of the first pending byte
    pub fn tail_offset(&self) -> u64 {
        self.tail_offset
    }

    /// Logical offset below which every byte is on the device
    pub fn last_flushed_head(&self) -> u64 {
        self.last_flushed_head
    }

    /// True if bytes were appended since the last flush completed
    pub fn has_unflushed(&self) -> bool {
        self.head_offset() != self.last_flushed_head
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Copy `src` in at `head`, wrapping at the end of the region
    ///
    /// Fails without touching any state if `src` does not fit.
    pub fn append(&mut self, src: &[u8]) -> Result<()> {
        let available = self.available();
        if src.len() > available {
            return Err(LogFsError::OutOfSpace {
                requested: src.len(),
                available,
            });
        }

        let capacity = self.capacity();
        let first = src.len().min(capacity - self.head);
        let (front, back) = src.split_at(first);
        self.data[self.head..self.head + first].copy_from_slice(front);
        self.data[..back.len()].copy_from_slice(back);

        self.head = (self.head + src.len()) % capacity;
        self.used += src.len();
        Ok(())
    }

    /// Copy the bytes of `[offset, offset + dst.len())` that live only in
    /// memory into the matching positions of `dst`
    ///
    /// Returns the logical range that was copied, if any.
    pub fn copy_unflushed(&self, offset: u64, dst: &mut [u8]) -> Option<Range<u64>> {
        let start = offset.max(self.last_flushed_head.max(self.tail_offset));
        let end = offset
            .saturating_add(dst.len() as u64)
            .min(self.head_offset());
        if start >= end {
            return None;
        }

        let capacity = self.capacity();
        let len = (end - start) as usize;
        let phys = (self.tail + (start - self.tail_offset) as usize) % capacity;
        let out = &mut dst[(start - offset) as usize..][..len];

        let first = len.min(capacity - phys);
        out[..first].copy_from_slice(&self.data[phys..phys + first]);
        out[first..].copy_from_slice(&self.data[..len - first]);
        Some(start..end)
    }
}
