//! Engine Module
//!
//! The log instance that coordinates all components.
//!
//! ## Responsibilities
//! - Own the device, write buffer, read cache and flush worker
//! - Serve appends without blocking on space
//! - Serve reads that observe every prior append
//! - Force all pending data to the device on close

use std::io;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::{Bytes, BytesMut};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::buffer::{FlushMode, FlushReport, WriteBuffer};
use crate::cache::{self, ReadCache};
use crate::config::{Config, TrailingBlock};
use crate::device::{BlockDevice, FileDevice};
use crate::error::{LogFsError, Result};
use crate::stats::{Counters, LogStats};
use crate::worker::{self, Wake};

/// State shared between the caller and the flush worker
///
/// ## Lock order
/// `buffer` → `cache`. The flush path takes the cache lock while holding
/// the buffer lock to invalidate written blocks; the read path takes the
/// buffer lock and releases it before touching the cache.
pub(crate) struct Shared {
    pub(crate) device: Box<dyn BlockDevice>,
    pub(crate) buffer: Mutex<WriteBuffer>,
    pub(crate) cache: Mutex<ReadCache>,
    pub(crate) counters: Counters,
}

impl Shared {
    /// Run one flush, invalidating cached blocks as each write lands
    pub(crate) fn flush(&self, mode: FlushMode) -> Result<FlushReport> {
        let mut buffer = self.buffer.lock();
        let report = buffer.flush(self.device.as_ref(), mode, &mut |offset, len| {
            let dropped = self.cache.lock().invalidate_range(offset, len);
            if dropped > 0 {
                debug!(offset, len, dropped, "invalidated cache entries");
            }
        })?;
        drop(buffer);

        self.counters.record_flush(&report);
        Ok(report)
    }
}

/// A log-structured append-only store over a block device
///
/// ## Concurrency Model
/// - One producer context calling `append`/`read`
/// - One background worker thread flushing whole blocks
/// - `append` fails fast with [`LogFsError::OutOfSpace`] instead of waiting
/// - `read` flushes on the caller's thread before touching the device
pub struct LogFs {
    config: Config,
    shared: Arc<Shared>,
    wake_tx: Sender<Wake>,
    worker: Option<JoinHandle<()>>,
}

impl LogFs {
    /// Open a file-backed log with the default config
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Open a file-backed log
    ///
    /// The backing file must already exist (see [`FileDevice::create`]).
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let device = FileDevice::open(path, config.block_size).map_err(|source| {
            LogFsError::Device {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::with_device(device, config)
    }

    /// Open a log over any block device
    ///
    /// `config.block_size` is ignored; the device's own block size is used.
    pub fn with_device(device: impl BlockDevice + 'static, config: Config) -> Result<Self> {
        config.validate()?;
        let block_size = device.block_size();
        if block_size == 0 || device.capacity() % block_size as u64 != 0 {
            return Err(LogFsError::Config(format!(
                "device is not block-addressable: block_size={} capacity={}",
                block_size,
                device.capacity()
            )));
        }

        // Step 1: Allocate the write buffer and read cache
        let buffer = WriteBuffer::with_blocks(block_size, config.wcache_blocks)?;
        let policy = cache::policy_for(config.eviction);
        let read_cache = ReadCache::new(block_size, config.rcache_blocks, policy)?;

        let shared = Arc::new(Shared {
            device: Box::new(device),
            buffer: Mutex::new(buffer),
            cache: Mutex::new(read_cache),
            counters: Counters::default(),
        });

        // Step 2: Start the flush worker
        let (wake_tx, wake_rx) = channel::bounded(1);
        let handle = worker::spawn(Arc::clone(&shared), wake_rx)?;

        info!(
            block_size,
            capacity = shared.device.capacity(),
            wcache_blocks = config.wcache_blocks,
            rcache_blocks = config.rcache_blocks,
            trailing_block = ?config.trailing_block,
            "opened log"
        );

        Ok(Self {
            config,
            shared,
            wake_tx,
            worker: Some(handle),
        })
    }

    /// Append a record
    ///
    /// All or nothing: if the buffer cannot take the whole record right now
    /// the call fails with [`LogFsError::OutOfSpace`] and nothing changes.
    pub fn append(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.shared.buffer.lock().append(data) {
            self.shared.counters.record_out_of_space();
            debug!(error = %e, "append rejected");
            return Err(e);
        }
        self.shared.counters.record_append(data.len());

        // Full means a wake is already pending.
        let _ = self.wake_tx.try_send(Wake::NewData);
        Ok(())
    }

    /// Read `len` bytes starting at logical offset `offset`
    ///
    /// The range is checked against the device before anything is allocated.
    pub fn read(&self, offset: u64, len: usize) -> Result<Bytes> {
        self.check_range(offset, len)?;
        let mut out = BytesMut::zeroed(len);
        self.read_into(offset, &mut out)?;
        Ok(out.freeze())
    }

    /// Fill `dst` with the bytes starting at logical offset `offset`
    ///
    /// Every byte appended before the call is visible. On error the
    /// contents of `dst` are unspecified.
    pub fn read_into(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        self.shared.counters.record_read();
        if dst.is_empty() {
            return Ok(());
        }
        let end = self.check_range(offset, dst.len())?;

        // Step 1: Make everything appended so far durable
        self.flush()?;

        // Step 2: Copy bytes that still live only in memory. Taken before
        // the device reads so a concurrent background flush cannot open a gap.
        let in_memory = self.shared.buffer.lock().copy_unflushed(offset, dst);

        // Step 3: Serve the rest through the cache
        let mut cache = self.shared.cache.lock();
        for range in device_ranges(offset..end, in_memory) {
            let lo = (range.start - offset) as usize;
            let hi = (range.end - offset) as usize;
            cache.read(self.shared.device.as_ref(), range.start, &mut dst[lo..hi])?;
        }
        Ok(())
    }

    /// End of `[offset, offset + len)`, if the range lies on the device
    fn check_range(&self, offset: u64, len: usize) -> Result<u64> {
        let capacity = self.shared.device.capacity();
        let end = offset.checked_add(len as u64).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("read range overflows: offset={offset} len={len}"),
            )
        })?;
        if end > capacity {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read past device end: end={end} capacity={capacity}"),
            )
            .into());
        }
        Ok(end)
    }

    /// Force every appended byte to the device
    ///
    /// With [`TrailingBlock::Defer`] an incomplete final block stays in
    /// memory instead of being padded.
    pub fn flush(&self) -> Result<FlushReport> {
        let mode = match self.config.trailing_block {
            TrailingBlock::Pad => FlushMode::PadTrailing,
            TrailingBlock::Defer => FlushMode::WholeBlocks,
        };
        self.shared.flush(mode)
    }

    /// Stop the worker, force all data to the device and release the log
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };

        // Step 1: Stop the worker
        self.shared.buffer.lock().request_shutdown();
        // The worker may already be gone after seeing the flag.
        let _ = self.wake_tx.send(Wake::Shutdown);
        if handle.join().is_err() {
            warn!("flush worker panicked");
        }

        // Step 2: Final forced flush, trailing block included
        let report = self.shared.flush(FlushMode::PadTrailing)?;
        self.shared.device.sync()?;

        info!(
            durable_offset = self.durable_offset(),
            final_writes = report.writes,
            "closed log"
        );
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Device block size
    pub fn block_size(&self) -> usize {
        self.shared.device.block_size()
    }

    /// Write buffer capacity in bytes
    pub fn capacity(&self) -> usize {
        self.shared.buffer.lock().capacity()
    }

    /// Bytes an append may take right now
    pub fn available(&self) -> usize {
        self.shared.buffer.lock().available()
    }

    /// Bytes held in the write buffer
    pub fn pending(&self) -> usize {
        self.shared.buffer.lock().used()
    }

    /// Logical end of the log
    pub fn len(&self) -> u64 {
        self.shared.buffer.lock().head_offset()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical offset below which every byte is on the device
    pub fn durable_offset(&self) -> u64 {
        self.shared.buffer.lock().last_flushed_head()
    }

    /// True if the read cache holds the block at `aligned_offset`
    pub fn is_cached(&self, aligned_offset: u64) -> bool {
        self.shared.cache.lock().is_cached(aligned_offset)
    }

    pub fn stats(&self) -> LogStats {
        let cache = self.shared.cache.lock();
        self.shared.counters.snapshot(cache.hits(), cache.misses())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for LogFs {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!(error = %e, "failed to flush log on drop");
        }
    }
}

/// The parts of `request` not covered by `in_memory`
fn device_ranges(request: Range<u64>, in_memory: Option<Range<u64>>) -> Vec<Range<u64>> {
    match in_memory {
        None => vec![request],
        Some(mem) => [request.start..mem.start, mem.end..request.end]
            .into_iter()
            .filter(|r| r.start < r.end)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_ranges_without_overlay() {
        assert_eq!(device_ranges(10..20, None), vec![10..20]);
    }

    #[test]
    fn test_device_ranges_splits_around_overlay() {
        assert_eq!(device_ranges(0..100, Some(40..60)), vec![0..40, 60..100]);
        assert_eq!(device_ranges(0..100, Some(40..100)), vec![0..40]);
        assert!(device_ranges(0..100, Some(0..100)).is_empty());
    }
}
