//! Operation counters
//!
//! Lock-free counters updated on the hot paths, plus a plain snapshot type.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::FlushReport;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    appends: AtomicU64,
    appended_bytes: AtomicU64,
    out_of_space: AtomicU64,
    flushes: AtomicU64,
    device_writes: AtomicU64,
    bytes_written: AtomicU64,
    pad_bytes: AtomicU64,
    reads: AtomicU64,
}

impl Counters {
    pub(crate) fn record_append(&self, len: usize) {
        self.appends.fetch_add(1, Ordering::Relaxed);
        self.appended_bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_out_of_space(&self) {
        self.out_of_space.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, report: &FlushReport) {
        if report.is_noop() {
            return;
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.device_writes
            .fetch_add(report.writes as u64, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(report.bytes_written as u64, Ordering::Relaxed);
        self.pad_bytes
            .fetch_add(report.pad_bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, cache_hits: u64, cache_misses: u64) -> LogStats {
        LogStats {
            appends: self.appends.load(Ordering::Relaxed),
            appended_bytes: self.appended_bytes.load(Ordering::Relaxed),
            out_of_space: self.out_of_space.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            pad_bytes: self.pad_bytes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
        }
    }
}

/// Point-in-time view of a log's activity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    /// Successful appends
    pub appends: u64,
    pub appended_bytes: u64,

    /// Appends rejected because the buffer was full
    pub out_of_space: u64,

    /// Flushes that wrote at least one block
    pub flushes: u64,
    pub device_writes: u64,

    /// Bytes written to the device, padding included
    pub bytes_written: u64,
    pub pad_bytes: u64,

    pub reads: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
