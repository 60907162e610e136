//! File-backed block device
//!
//! Uses positional I/O (`std::os::unix::fs::FileExt`), so no shared seek
//! position is needed and the device can be used from several threads.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use super::{check_request, BlockDevice};

/// A regular file treated as an array of fixed-size blocks
#[derive(Debug)]
pub struct FileDevice {
    file: File,
    path: PathBuf,
    block_size: usize,
    capacity: u64,
}

impl FileDevice {
    /// Open an existing backing file
    ///
    /// Capacity is the file length rounded down to whole blocks. A file
    /// shorter than one block is not a usable device.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> io::Result<Self> {
        if block_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "block size must be non-zero",
            ));
        }
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let capacity = len - len % block_size as u64;
        if capacity == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("device holds no whole block: len={len} block_size={block_size}"),
            ));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            block_size,
            capacity,
        })
    }

    /// Create (or truncate) a zero-filled backing file of `blocks` blocks
    pub fn create(path: impl AsRef<Path>, block_size: usize, blocks: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(block_size as u64 * blocks)?;
        file.sync_all()?;
        drop(file);
        Self::open(path, block_size)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn read_blocks(&self, offset: u64, dst: &mut [u8]) -> io::Result<()> {
        check_request(offset, dst.len(), self.block_size, self.capacity)?;
        self.file.read_exact_at(dst, offset)
    }

    fn write_blocks(&self, offset: u64, src: &[u8]) -> io::Result<()> {
        check_request(offset, src.len(), self.block_size, self.capacity)?;
        self.file.write_all_at(src, offset)
    }

    fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }
}
