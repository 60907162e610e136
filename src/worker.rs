//! Background Flush Worker
//!
//! One dedicated thread that drains whole blocks of the write buffer.
//!
//! ## Wake-ups
//! The worker blocks on a bounded(1) channel. Appends `try_send` a
//! [`Wake::NewData`]; a full channel already carries a pending wake, so the
//! signal is dropped. `close` sends [`Wake::Shutdown`]. A disconnected
//! channel also means shutdown.
//!
//! The worker never pads: trailing partial blocks are left for the forced
//! flush on the read and close paths.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, RecvError};
use tracing::{debug, warn};

use crate::buffer::FlushMode;
use crate::engine::Shared;

/// Message that wakes the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    NewData,
    Shutdown,
}

pub(crate) const THREAD_NAME: &str = "logfs-flush";

/// Start the worker thread
pub(crate) fn spawn(shared: Arc<Shared>, wake_rx: Receiver<Wake>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(THREAD_NAME.to_string())
        .spawn(move || run(shared, wake_rx))
}

fn run(shared: Arc<Shared>, wake_rx: Receiver<Wake>) {
    debug!("flush worker started");
    loop {
        let wake = wake_rx.recv().unwrap_or_else(|RecvError| Wake::Shutdown);
        let stopping = wake == Wake::Shutdown || shared.buffer.lock().is_shutdown();

        // Errors leave the span pending; the next wake or forced flush retries.
        if let Err(e) = shared.flush(FlushMode::WholeBlocks) {
            warn!(error = %e, "background flush failed");
        }

        if stopping {
            break;
        }
    }
    debug!("flush worker stopped");
}
