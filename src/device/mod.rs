//! Device Module
//!
//! Block-addressable backing store consumed by the log.
//!
//! ## Contract
//! - The block size `B` is fixed for the lifetime of a device
//! - Capacity is a whole number of blocks
//! - Every read and write has an offset and length that are multiples of `B`
//! - Opening is the implementation's constructor, closing is `Drop`

use std::io;

mod file;
mod memory;

pub use file::FileDevice;
pub use memory::{MemoryDevice, WriteRecord};

/// Fixed-size block I/O
pub trait BlockDevice: Send + Sync {
    /// Size of one block in bytes
    fn block_size(&self) -> usize;

    /// Total addressable bytes (a multiple of `block_size`)
    fn capacity(&self) -> u64;

    /// Read `dst.len()` bytes starting at `offset`
    fn read_blocks(&self, offset: u64, dst: &mut [u8]) -> io::Result<()>;

    /// Write all of `src` starting at `offset`
    fn write_blocks(&self, offset: u64, src: &[u8]) -> io::Result<()>;

    /// Push written blocks to stable storage
    fn sync(&self) -> io::Result<()>;
}

/// Validate alignment and bounds of a block request
pub(crate) fn check_request(
    offset: u64,
    len: usize,
    block_size: usize,
    capacity: u64,
) -> io::Result<()> {
    let b = block_size as u64;
    if offset % b != 0 || len % block_size != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unaligned request: offset={offset} len={len} block_size={block_size}"),
        ));
    }
    let end = offset.checked_add(len as u64).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "request range overflows u64")
    })?;
    if end > capacity {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("request out of bounds: offset={offset} len={len} capacity={capacity}"),
        ));
    }
    Ok(())
}
