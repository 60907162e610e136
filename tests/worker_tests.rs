//! Tests for the background flush worker
//!
//! These tests verify:
//! - Whole blocks become durable without any explicit flush
//! - The worker never pads a trailing partial block
//! - Reads stay consistent while the worker flushes concurrently
//! - Shutdown completes promptly with or without pending data

mod common;

use std::sync::Arc;
use std::thread;

use common::{pattern, pattern_byte, setup_memory_log, small_config, wait_until, BLOCK};

// =============================================================================
// Background Flush Tests
// =============================================================================

#[test]
fn test_worker_flushes_whole_blocks() {
    let (dev, log) = setup_memory_log(small_config(4), 16);

    log.append(&pattern(0, 2 * BLOCK + 100)).unwrap();

    assert!(wait_until(|| log.pending() == 100));
    assert_eq!(log.durable_offset(), 2 * BLOCK as u64);
    assert_eq!(&dev.contents()[..2 * BLOCK], &pattern(0, 2 * BLOCK)[..]);
    assert_eq!(log.stats().pad_bytes, 0);
}

#[test]
fn test_worker_leaves_partial_block_alone() {
    let (dev, log) = setup_memory_log(small_config(4), 16);

    log.append(&pattern(0, BLOCK - 1)).unwrap();
    // Give the worker a chance to run; it must not write anything
    thread::sleep(std::time::Duration::from_millis(50));

    assert!(dev.writes().is_empty());
    assert_eq!(log.pending(), BLOCK - 1);
}

#[test]
fn test_worker_frees_space_for_appends() {
    let (_dev, log) = setup_memory_log(small_config(2), 64);
    let mut offset = 0u64;

    // Without any read or flush, only the worker drains the buffer
    for _ in 0..16 {
        let chunk = pattern(offset, BLOCK);
        assert!(wait_until(|| log.available() >= BLOCK));
        log.append(&chunk).unwrap();
        offset += BLOCK as u64;
    }

    assert_eq!(&log.read(0, offset as usize).unwrap()[..], &pattern(0, offset as usize)[..]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_reader_sees_appended_prefix() {
    let (_dev, log) = setup_memory_log(small_config(2), 128);
    let log = Arc::new(log);

    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let mut offset = 0u64;
            for i in 0..1000usize {
                let len = 1 + i % 61;
                let chunk = pattern(offset, len);
                loop {
                    match log.append(&chunk) {
                        Ok(()) => break,
                        Err(e) if e.is_out_of_space() => {
                            log.flush().unwrap();
                        }
                        Err(e) => panic!("append failed: {e}"),
                    }
                }
                offset += len as u64;
            }
            offset
        })
    };

    let reader = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for _ in 0..200 {
                let len = log.len();
                let start = len.saturating_sub(700);
                let read = log.read(start, (len - start) as usize).unwrap();
                for (i, &b) in read.iter().enumerate() {
                    assert_eq!(b, pattern_byte(start + i as u64), "offset {}", start + i as u64);
                }
            }
        })
    };

    let total = writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(log.len(), total);
    assert_eq!(&log.read(0, total as usize).unwrap()[..], &pattern(0, total as usize)[..]);
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_close_with_nothing_appended() {
    let (dev, log) = setup_memory_log(small_config(4), 16);
    log.close().unwrap();

    assert!(dev.writes().is_empty());
}

#[test]
fn test_close_right_after_burst_of_appends() {
    let (dev, log) = setup_memory_log(small_config(8), 64);
    let mut offset = 0u64;
    for _ in 0..40 {
        log.append(&pattern(offset, 97)).unwrap();
        offset += 97;
    }
    log.close().unwrap();

    assert_eq!(&dev.contents()[..offset as usize], &pattern(0, offset as usize)[..]);
}
