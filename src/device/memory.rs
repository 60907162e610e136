//! In-memory block device
//!
//! Keeps a journal of every write and can inject read/write faults.
//! Clones share the same storage, so a caller can keep a handle for
//! inspection after handing the device to a log.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{check_request, BlockDevice};

/// One write issued against the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug)]
struct Inner {
    bytes: Vec<u8>,
    writes: Vec<WriteRecord>,
    reads: u64,
    fail_reads: usize,
    fail_writes: usize,
    fault_after_writes: Option<usize>,
}

/// RAM-backed device for tests and benchmarks
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    inner: Arc<Mutex<Inner>>,
    block_size: usize,
}

impl MemoryDevice {
    /// Create a zero-filled device of `blocks` blocks
    pub fn new(block_size: usize, blocks: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                bytes: vec![0u8; block_size * blocks],
                writes: Vec::new(),
                reads: 0,
                fail_reads: 0,
                fail_writes: 0,
                fault_after_writes: None,
            })),
            block_size,
        }
    }

    /// Copy of the full device contents
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().bytes.clone()
    }

    /// Every successful write, in issue order
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().writes.clone()
    }

    /// Number of successful reads
    pub fn read_count(&self) -> u64 {
        self.inner.lock().reads
    }

    /// Make the next `n` reads fail
    pub fn fail_next_reads(&self, n: usize) {
        self.inner.lock().fail_reads = n;
    }

    /// Make the next `n` writes fail
    pub fn fail_next_writes(&self, n: usize) {
        self.inner.lock().fail_writes = n;
    }

    /// Let `n` more writes succeed, then fail exactly one
    pub fn fail_write_after(&self, n: usize) {
        self.inner.lock().fault_after_writes = Some(n);
    }
}

impl BlockDevice for MemoryDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn capacity(&self) -> u64 {
        self.inner.lock().bytes.len() as u64
    }

    fn read_blocks(&self, offset: u64, dst: &mut [u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        check_request(offset, dst.len(), self.block_size, inner.bytes.len() as u64)?;
        if inner.fail_reads > 0 {
            inner.fail_reads -= 1;
            return Err(io::Error::other("injected read fault"));
        }
        let start = offset as usize;
        dst.copy_from_slice(&inner.bytes[start..start + dst.len()]);
        inner.reads += 1;
        Ok(())
    }

    fn write_blocks(&self, offset: u64, src: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        check_request(offset, src.len(), self.block_size, inner.bytes.len() as u64)?;
        if inner.fail_writes > 0 {
            inner.fail_writes -= 1;
            return Err(io::Error::other("injected write fault"));
        }
        match inner.fault_after_writes {
            Some(0) => {
                inner.fault_after_writes = None;
                return Err(io::Error::other("injected write fault"));
            }
            Some(n) => inner.fault_after_writes = Some(n - 1),
            None => {}
        }
        let start = offset as usize;
        inner.bytes[start..start + src.len()].copy_from_slice(src);
        inner.writes.push(WriteRecord {
            offset,
            len: src.len(),
        });
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_device_round_trip() {
        let dev = MemoryDevice::new(512, 4);
        dev.write_blocks(512, &[7u8; 512]).unwrap();

        let mut buf = vec![0u8; 1024];
        dev.read_blocks(0, &mut buf).unwrap();
        assert!(buf[..512].iter().all(|&b| b == 0));
        assert!(buf[512..].iter().all(|&b| b == 7));
        assert_eq!(dev.writes(), vec![WriteRecord { offset: 512, len: 512 }]);
    }

    #[test]
    fn test_memory_device_injected_faults() {
        let dev = MemoryDevice::new(512, 4);
        dev.fail_next_writes(1);
        assert!(dev.write_blocks(0, &[1u8; 512]).is_err());
        assert!(dev.write_blocks(0, &[1u8; 512]).is_ok());

        dev.fail_next_reads(1);
        let mut buf = vec![0u8; 512];
        assert!(dev.read_blocks(0, &mut buf).is_err());
        dev.read_blocks(0, &mut buf).unwrap();
        assert_eq!(buf, vec![1u8; 512]);
        assert_eq!(dev.read_count(), 1);
    }

    #[test]
    fn test_memory_device_fault_after_writes() {
        let dev = MemoryDevice::new(512, 4);
        dev.fail_write_after(2);
        assert!(dev.write_blocks(0, &[1u8; 512]).is_ok());
        assert!(dev.write_blocks(512, &[2u8; 512]).is_ok());
        assert!(dev.write_blocks(1024, &[3u8; 512]).is_err());
        assert!(dev.write_blocks(1024, &[3u8; 512]).is_ok());
        assert_eq!(dev.writes().len(), 3);
    }
}
