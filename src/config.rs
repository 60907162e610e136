//! Configuration for LogFS
//!
//! Centralized configuration with sensible defaults.

use crate::error::{LogFsError, Result};

/// Main configuration for a LogFS instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Write Buffer Configuration
    // -------------------------------------------------------------------------
    /// Write buffer capacity, in device blocks
    pub wcache_blocks: usize,

    /// What a forced flush does with a trailing partial block
    pub trailing_block: TrailingBlock,

    // -------------------------------------------------------------------------
    // Read Cache Configuration
    // -------------------------------------------------------------------------
    /// Number of block-sized read cache entries
    pub rcache_blocks: usize,

    /// Victim selection on a cache miss
    pub eviction: EvictionStrategy,

    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Block size used when opening a file-backed device
    pub block_size: usize,
}

/// Handling of an incomplete final block during a forced flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingBlock {
    /// Zero-pad the block, write it, and keep it pending so the next
    /// flush rewrites it with the real continuation.
    Pad,

    /// Leave the block in memory until it fills up. No device block is
    /// ever written twice; reads serve the pending bytes from the buffer.
    Defer,
}

/// Read cache victim selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionStrategy {
    /// Always reuse slot 0
    FixedSlot,

    /// Reuse an invalid slot if any, else the least recently used one
    Lru,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wcache_blocks: 32,
            trailing_block: TrailingBlock::Pad,
            rcache_blocks: 256,
            eviction: EvictionStrategy::FixedSlot,
            block_size: 4096,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject configurations that cannot back a log
    pub fn validate(&self) -> Result<()> {
        if self.wcache_blocks == 0 {
            return Err(LogFsError::Config(
                "write buffer needs at least one block".to_string(),
            ));
        }
        if self.rcache_blocks == 0 {
            return Err(LogFsError::Config(
                "read cache needs at least one entry".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(LogFsError::Config("block size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the write buffer capacity (in blocks)
    pub fn wcache_blocks(mut self, blocks: usize) -> Self {
        self.config.wcache_blocks = blocks;
        self
    }

    /// Set the trailing block policy for forced flushes
    pub fn trailing_block(mut self, policy: TrailingBlock) -> Self {
        self.config.trailing_block = policy;
        self
    }

    /// Set the number of read cache entries
    pub fn rcache_blocks(mut self, blocks: usize) -> Self {
        self.config.rcache_blocks = blocks;
        self
    }

    /// Set the read cache eviction strategy
    pub fn eviction(mut self, strategy: EvictionStrategy) -> Self {
        self.config.eviction = strategy;
        self
    }

    /// Set the block size for file-backed devices
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
