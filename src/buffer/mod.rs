//! Write Buffer Module
//!
//! Stages appended bytes in memory and commits them to the device in
//! block-aligned spans.
//!
//! ## Layout
//! ```text
//!  0                                                        C
//!  ┌──────────┬────────────────────────────┬──────────────────┐
//!  │   free   │  pending (tail → head)     │       free       │
//!  └──────────┴────────────────────────────┴──────────────────┘
//!             ▲ tail  (logical tail_offset) ▲ head
//! ```
//! The pending span may wrap past `C` back to 0. `tail` always sits on a
//! block boundary, so every block of pending data is contiguous in memory.
//!
//! ## Responsibilities
//! - All-or-nothing appends with wraparound
//! - FIFO flushing of whole blocks, optionally zero-padding the last one
//! - Tracking which logical offsets are already durable

mod flush;
mod ring;

pub use flush::{FlushMode, FlushReport};
pub use ring::WriteBuffer;
