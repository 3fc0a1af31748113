// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data-available listener.
//!
//! Callback-based alternative to calling [`Reader::wait`](crate::Reader::wait)
//! in a loop. A dispatcher thread holds the reader's wait slot, waits with an
//! infinite timeout, invokes the callback when new samples arrive, and re-arms.
//!
//! # Usage
//!
//! ```rust
//! use hdds_exchange::{Domain, EndpointConfig, Participant};
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! # fn main() -> hdds_exchange::Result<()> {
//! let domain = Domain::standalone(0);
//! let participant = Participant::new(&domain, "app")?;
//! let reader = participant.create_reader_with(None, &EndpointConfig::new("T"))?;
//! let writer = participant.create_writer_with(None, &EndpointConfig::new("T"))?;
//!
//! let (tx, rx) = mpsc::channel();
//! let _listener = reader.on_data_available(move |ctx| {
//!     let count = ctx.take().len();
//!     let _ = tx.send(count);
//! })?;
//!
//! writer.write()?;
//! assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The callback runs on the dispatcher thread. It must be `Send` and should
//! not block for long: no new notification is delivered while it runs.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::data::DynamicData;
use crate::error::{Error, Result};
use crate::history::Samples;
use crate::identity::Guid;
use crate::reader::ReaderInbox;
use crate::sample::SampleInfo;
use crate::wait::{WaitCoordinator, INFINITE};

/// Access to the reader from inside a data-available callback.
pub struct DataAvailable<'a> {
    inbox: &'a ReaderInbox,
    reader: Guid,
}

impl DataAvailable<'_> {
    pub fn reader_guid(&self) -> Guid {
        self.reader
    }

    /// Same as [`Reader::read`](crate::Reader::read).
    pub fn read(&mut self) -> Samples<'_, DynamicData> {
        Samples::new(self.inbox.read())
    }

    /// Same as [`Reader::take`](crate::Reader::take).
    pub fn take(&mut self) -> Samples<'_, DynamicData> {
        Samples::new(self.inbox.take())
    }

    pub fn take_where<F>(&mut self, pred: F) -> Samples<'_, DynamicData>
    where
        F: FnMut(&SampleInfo, Option<&DynamicData>) -> bool,
    {
        Samples::new(self.inbox.take_where(pred))
    }

    /// Cached samples not yet returned by `read()`.
    pub fn unread_count(&self) -> usize {
        self.inbox.activity().0
    }
}

/// Keeps a listener armed; dropping it stops the dispatcher thread.
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    coordinator: Arc<WaitCoordinator>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Stop dispatching and wait for the thread to finish. Same as dropping
    /// the handle; once this returns the reader's wait slot is free.
    pub fn cancel(self) {
        drop(self);
    }

    /// False once the reader closed or the dispatcher exited.
    pub fn is_active(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.coordinator.notify();

        if let Some(handle) = self.thread.take() {
            // dropped from inside the callback: the thread exits on its own
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("reader", &self.coordinator.label())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Claim the reader's wait slot and start the dispatcher.
///
/// The slot is claimed on the calling thread so a concurrent wait is reported
/// here as `Error::Concurrency`.
pub(crate) fn spawn<F>(
    coordinator: &Arc<WaitCoordinator>,
    inbox: Arc<ReaderInbox>,
    reader: Guid,
    mut callback: F,
) -> Result<ListenerHandle>
where
    F: FnMut(&mut DataAvailable<'_>) + Send + 'static,
{
    let claim = coordinator.claim()?;
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let thread = thread::Builder::new()
        .name(format!("hdds-exch-listen-{}", reader.entity_id[2]))
        .spawn(move || {
            let mut last_seen: Option<u64> = None;
            loop {
                let outcome = claim.wait_until(INFINITE, || {
                    if thread_stop.load(Ordering::Acquire) {
                        return Ok(Some(None));
                    }
                    let (unread, total) = inbox.activity();
                    Ok((unread > 0 && last_seen != Some(total)).then_some(Some(total)))
                });

                match outcome {
                    Ok(Some(total)) => {
                        last_seen = Some(total);
                        let mut ctx = DataAvailable {
                            inbox: &inbox,
                            reader,
                        };
                        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(&mut ctx)));
                        if result.is_err() {
                            log::warn!("[LISTENER] reader {}: callback panicked", reader);
                        }
                    }
                    Ok(None) => break,
                    Err(Error::Cancelled) => {
                        log::debug!("[LISTENER] reader {} closed, listener stopped", reader);
                        break;
                    }
                    Err(e) => {
                        log::warn!("[LISTENER] reader {}: wait failed: {}", reader, e);
                        break;
                    }
                }
            }
            drop(claim);
        })
        .map_err(|e| Error::Core(format!("failed to spawn listener thread: {}", e)))?;

    log::debug!("[LISTENER] armed on reader {}", reader);
    Ok(ListenerHandle {
        stop,
        coordinator: Arc::clone(coordinator),
        thread: Some(thread),
    })
}
