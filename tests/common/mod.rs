//! Shared helpers for integration tests

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};

use logfs::{Config, LogFs, MemoryDevice};

pub const BLOCK: usize = 512;

/// Byte stored at logical offset `i` by [`pattern`]
pub fn pattern_byte(i: u64) -> u8 {
    (i % 251) as u8
}

/// Bytes for logical range `[start, start + len)`
pub fn pattern(start: u64, len: usize) -> Vec<u8> {
    (start..start + len as u64).map(pattern_byte).collect()
}

pub fn small_config(wcache_blocks: usize) -> Config {
    Config::builder()
        .wcache_blocks(wcache_blocks)
        .rcache_blocks(8)
        .build()
}

/// Log over a fresh in-memory device; the returned device shares storage
pub fn setup_memory_log(config: Config, device_blocks: usize) -> (MemoryDevice, LogFs) {
    let dev = MemoryDevice::new(BLOCK, device_blocks);
    let log = LogFs::with_device(dev.clone(), config).unwrap();
    (dev, log)
}

/// Poll `cond` until it holds or five seconds pass
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
