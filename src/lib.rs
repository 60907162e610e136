//! # LogFS
//!
//! A log-structured, append-only store over a block device, with:
//! - Write-behind buffering in a fixed-capacity ring
//! - Asynchronous block-aligned flushing on a background thread
//! - A small read cache kept coherent with every device write
//! - Read-after-write consistency without waiting on the worker
//!
//! ## Architecture Overview
//!
//! ```text
//!        append(bytes)                         read(offset, len)
//!             │                                       │
//!             ▼                                       │ forced flush
//!   ┌───────────────────┐   wake   ┌──────────────┐   │
//!   │   Write Buffer    │─────────▶│ Flush Worker │   │
//!   │  (ring, B-aligned │          │  (thread)    │   │
//!   │       tail)       │◀─────────┴──────┬───────┘   │
//!   └─────────┬─────────┘  whole blocks   │           │
//!             │ Flush Engine              │           │
//!             ▼                           ▼           ▼
//!   ┌─────────────────────────────────────────┐ ┌────────────┐
//!   │              Block Device               │◀│ Read Cache │
//!   │      (fixed-size, aligned block I/O)    │ │ (M blocks) │
//!   └─────────────────────────────────────────┘ └────────────┘
//!                 every write invalidates overlapping entries
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use logfs::LogFs;
//!
//! let log = LogFs::open("/tmp/logfs.img")?;
//! log.append(b"hello")?;
//! assert_eq!(&log.read(0, 5)?[..], b"hello");
//! log.close()?;
//! # Ok::<(), logfs::LogFsError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod device;
pub mod buffer;
pub mod cache;
pub mod engine;
mod stats;
mod worker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogFsError, Result};
pub use config::{Config, EvictionStrategy, TrailingBlock};
pub use device::{BlockDevice, FileDevice, MemoryDevice};
pub use engine::LogFs;
pub use stats::LogStats;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogFS
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
