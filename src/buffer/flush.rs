//! Flush Engine
//!
//! Drains the pending span of a [`WriteBuffer`] to a block device.
//!
//! ## Ordering
//! Oldest bytes first. A pending span that wraps the end of the ring is
//! written as two straight-line chunks.
//!
//! ## Padding
//! With [`FlushMode::PadTrailing`], an incomplete final block is zero-filled
//! up to the block boundary and written. The block stays pending afterwards:
//! `tail` only moves over whole blocks, so the next flush rewrites the block
//! once more data has arrived.

use std::io;

use tracing::debug;

use super::WriteBuffer;
use crate::device::BlockDevice;

/// How much of the pending span a flush commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Whole blocks only; a trailing partial block stays in memory
    WholeBlocks,

    /// Whole blocks, then the trailing partial block zero-padded
    PadTrailing,
}

/// What a single flush did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Device writes issued
    pub writes: usize,

    /// Bytes handed to the device, padding included
    pub bytes_written: usize,

    /// Zero bytes written past the end of the appended data
    pub pad_bytes: usize,
}

impl FlushReport {
    /// True if the flush found nothing to do
    pub fn is_noop(&self) -> bool {
        self.writes == 0
    }
}

impl WriteBuffer {
    /// Commit pending bytes to `device`
    ///
    /// `on_written(offset, len)` runs after every successful device write,
    /// before the flush returns; callers use it to invalidate cached blocks.
    ///
    /// A device failure returns immediately. Spans already written stay
    /// committed, everything after the failed write stays pending.
    pub fn flush(
        &mut self,
        device: &dyn BlockDevice,
        mode: FlushMode,
        on_written: &mut dyn FnMut(u64, usize),
    ) -> io::Result<FlushReport> {
        let mut report = FlushReport::default();
        if !self.has_unflushed() {
            return Ok(report);
        }

        let capacity = self.capacity();
        let block = self.block_size;

        while self.used > 0 {
            let contiguous = self.used.min(capacity - self.tail);
            let aligned = contiguous - contiguous % block;
            let partial = contiguous - aligned;

            let write_len = if partial > 0 && mode == FlushMode::PadTrailing {
                aligned + block
            } else {
                aligned
            };
            if write_len == 0 {
                break;
            }

            // [tail + contiguous, tail + write_len) is free space inside the
            // block that holds head.
            if write_len > contiguous {
                self.data[self.tail + contiguous..self.tail + write_len].fill(0);
            }

            let offset = self.tail_offset;
            device.write_blocks(offset, &self.data[self.tail..self.tail + write_len])?;
            on_written(offset, write_len);

            report.writes += 1;
            report.bytes_written += write_len;

            self.tail = (self.tail + aligned) % capacity;
            self.used -= aligned;
            self.tail_offset += aligned as u64;
            self.last_flushed_head = self.last_flushed_head.max(self.tail_offset);

            if write_len > aligned {
                report.pad_bytes = write_len - contiguous;
                self.last_flushed_head = self.head_offset();
                break;
            }
        }

        if report.writes > 0 {
            debug!(
                ?mode,
                writes = report.writes,
                bytes = report.bytes_written,
                pad = report.pad_bytes,
                tail_offset = self.tail_offset,
                pending = self.used,
                "flushed write buffer"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{MemoryDevice, WriteRecord};

    const B: usize = 16;

    fn setup(blocks: usize) -> (WriteBuffer, MemoryDevice) {
        (
            WriteBuffer::with_blocks(B, blocks).unwrap(),
            MemoryDevice::new(B, 64),
        )
    }

    fn flush(buf: &mut WriteBuffer, dev: &MemoryDevice, mode: FlushMode) -> FlushReport {
        buf.flush(dev, mode, &mut |_, _| {}).unwrap()
    }

    #[test]
    fn test_whole_blocks_keeps_remainder_in_memory() {
        let (mut buf, dev) = setup(4);
        buf.append(&[1u8; 20]).unwrap();

        let report = flush(&mut buf, &dev, FlushMode::WholeBlocks);
        assert_eq!(report.writes, 1);
        assert_eq!(report.bytes_written, 16);
        assert_eq!(buf.tail_offset(), 16);
        assert_eq!(buf.used(), 4);
        assert_eq!(buf.last_flushed_head(), 16);
        assert!(buf.has_unflushed());
    }

    #[test]
    fn test_whole_blocks_with_only_partial_block_is_noop() {
        let (mut buf, dev) = setup(4);
        buf.append(&[1u8; 5]).unwrap();

        let report = flush(&mut buf, &dev, FlushMode::WholeBlocks);
        assert!(report.is_noop());
        assert!(dev.writes().is_empty());
    }

    #[test]
    fn test_pad_trailing_rewinds_to_partial_block() {
        let (mut buf, dev) = setup(4);
        buf.append(&[9u8; 20]).unwrap();

        let report = flush(&mut buf, &dev, FlushMode::PadTrailing);
        assert_eq!(report.writes, 1);
        assert_eq!(report.bytes_written, 32);
        assert_eq!(report.pad_bytes, 12);
        assert_eq!(dev.writes(), vec![WriteRecord { offset: 0, len: 32 }]);

        // The partial block is still pending but nothing is unflushed
        assert_eq!(buf.tail_offset(), 16);
        assert_eq!(buf.used(), 4);
        assert!(!buf.has_unflushed());

        let contents = dev.contents();
        assert!(contents[..20].iter().all(|&b| b == 9));
        assert!(contents[20..32].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_flush_twice_is_idempotent() {
        let (mut buf, dev) = setup(4);
        buf.append(&[3u8; 7]).unwrap();

        assert_eq!(flush(&mut buf, &dev, FlushMode::PadTrailing).writes, 1);
        assert!(flush(&mut buf, &dev, FlushMode::PadTrailing).is_noop());
        assert!(flush(&mut buf, &dev, FlushMode::WholeBlocks).is_noop());
        assert_eq!(dev.writes().len(), 1);
    }

    #[test]
    fn test_padded_block_is_rewritten_with_continuation() {
        let (mut buf, dev) = setup(4);
        buf.append(&[1u8; 10]).unwrap();
        flush(&mut buf, &dev, FlushMode::PadTrailing);

        buf.append(&[2u8; 10]).unwrap();
        flush(&mut buf, &dev, FlushMode::PadTrailing);

        assert_eq!(
            dev.writes(),
            vec![
                WriteRecord { offset: 0, len: 16 },
                WriteRecord { offset: 0, len: 32 },
            ]
        );
        let contents = dev.contents();
        assert!(contents[..10].iter().all(|&b| b == 1));
        assert!(contents[10..20].iter().all(|&b| b == 2));
        assert!(contents[20..32].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_wrapped_span_flushes_in_two_chunks() {
        let (mut buf, dev) = setup(4);
        buf.append(&[0u8; 48]).unwrap();
        flush(&mut buf, &dev, FlushMode::WholeBlocks);
        assert_eq!(buf.tail, 48);

        let record: Vec<u8> = (0..32).collect();
        buf.append(&record).unwrap();
        let report = flush(&mut buf, &dev, FlushMode::WholeBlocks);
        assert_eq!(report.writes, 2);
        assert_eq!(
            dev.writes()[1..],
            [
                WriteRecord { offset: 48, len: 16 },
                WriteRecord { offset: 64, len: 16 },
            ]
        );
        assert_eq!(&dev.contents()[48..80], &record[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_span_pending() {
        let (mut buf, dev) = setup(4);
        buf.append(&[5u8; 32]).unwrap();

        dev.fail_next_writes(1);
        let err = buf.flush(&dev, FlushMode::PadTrailing, &mut |_, _| {});
        assert!(err.is_err());
        assert_eq!(buf.used(), 32);
        assert_eq!(buf.tail_offset(), 0);
        assert!(buf.has_unflushed());

        let report = flush(&mut buf, &dev, FlushMode::PadTrailing);
        assert_eq!(report.bytes_written, 32);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_failed_second_chunk_keeps_first_committed() {
        let (mut buf, dev) = setup(4);
        buf.append(&[0u8; 48]).unwrap();
        flush(&mut buf, &dev, FlushMode::WholeBlocks);

        let record: Vec<u8> = (0..32).collect();
        buf.append(&record).unwrap();

        dev.fail_write_after(1);
        let mut seen = Vec::new();
        let result = buf.flush(&dev, FlushMode::WholeBlocks, &mut |off, len| {
            seen.push((off, len))
        });
        assert!(result.is_err());

        // The chunk before the wrap is on the device and no longer pending
        assert_eq!(seen, vec![(48, 16)]);
        assert_eq!(buf.tail, 0);
        assert_eq!(buf.tail_offset(), 64);
        assert_eq!(buf.used(), 16);
        assert_eq!(buf.last_flushed_head(), 64);
        assert!(buf.has_unflushed());
        assert_eq!(&dev.contents()[48..64], &record[..16]);

        let report = flush(&mut buf, &dev, FlushMode::WholeBlocks);
        assert_eq!(report.writes, 1);
        assert_eq!(dev.writes().last(), Some(&WriteRecord { offset: 64, len: 16 }));
        assert_eq!(&dev.contents()[48..80], &record[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_on_written_sees_every_write() {
        let (mut buf, dev) = setup(4);
        buf.append(&[0u8; 40]).unwrap();

        let mut seen = Vec::new();
        buf.flush(&dev, FlushMode::PadTrailing, &mut |off, len| seen.push((off, len)))
            .unwrap();
        assert_eq!(seen, vec![(0, 48)]);
    }
}
