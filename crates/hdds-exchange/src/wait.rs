// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-flight wait coordinator, one per endpoint.
//!
//! ```text
//! IDLE --claim()--> WAITING --+--> RESOLVED  --+
//!   ^                         +--> TIMED_OUT --+--> IDLE (claim dropped)
//!   |                         +--> CANCELLED --+
//!   +-- second claim() while WAITING fails with Error::Concurrency
//! ```
//!
//! Waiters hold the coordinator lock while evaluating their condition, and
//! [`WaitCoordinator::notify`] takes the same lock before signalling, so a state
//! change published between "check" and "sleep" is never lost.
//!
//! Lock order: coordinator state, then whatever the condition inspects. Callers
//! must release their own locks before calling `notify()` or `cancel()`.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Infinite timeout.
pub const INFINITE: Option<Duration> = None;

/// Convert a millisecond timeout to the crate's representation.
///
/// Any negative value (conventionally `-1`) means "wait forever".
///
/// ```rust
/// use hdds_exchange::wait::timeout_from_millis;
/// use std::time::Duration;
///
/// assert_eq!(timeout_from_millis(-1), None);
/// assert_eq!(timeout_from_millis(250), Some(Duration::from_millis(250)));
/// ```
pub fn timeout_from_millis(ms: i64) -> Option<Duration> {
    u64::try_from(ms).ok().map(Duration::from_millis)
}

#[derive(Debug, Default)]
struct State {
    busy: bool,
    cancelled: bool,
    wakeups: u64,
}

/// Wait primitive shared by an endpoint and the parties that wake it.
#[derive(Debug)]
pub struct WaitCoordinator {
    label: String,
    state: Mutex<State>,
    cond: Condvar,
    #[cfg(feature = "async")]
    notify: tokio::sync::Notify,
}

impl WaitCoordinator {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            #[cfg(feature = "async")]
            notify: tokio::sync::Notify::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reserve the wait slot.
    ///
    /// Fails immediately with [`Error::Concurrency`] if another wait (or an
    /// active listener) holds it, and with [`Error::Cancelled`] once cancelled.
    pub fn claim(self: &Arc<Self>) -> Result<WaitClaim> {
        let mut state = self.state.lock();
        if state.cancelled {
            return Err(Error::Cancelled);
        }
        if state.busy {
            log::debug!("[WAIT] {}: rejected concurrent wait", self.label);
            return Err(Error::Concurrency);
        }
        state.busy = true;
        Ok(WaitClaim {
            coordinator: Arc::clone(self),
        })
    }

    pub fn is_waiting(&self) -> bool {
        self.state.lock().busy
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Number of `notify()` calls so far.
    pub fn wakeups(&self) -> u64 {
        self.state.lock().wakeups
    }

    /// Wake the current waiter so it re-evaluates its condition.
    pub fn notify(&self) {
        {
            let mut state = self.state.lock();
            state.wakeups = state.wakeups.wrapping_add(1);
        }
        self.cond.notify_all();
        #[cfg(feature = "async")]
        self.notify.notify_waiters();
    }

    /// Resolve the outstanding wait (and every later one) with `Cancelled`.
    pub fn cancel(&self) {
        {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
        }
        log::debug!("[WAIT] {}: cancelled", self.label);
        self.cond.notify_all();
        #[cfg(feature = "async")]
        self.notify.notify_waiters();
    }

    /// Claim the slot and block until `check` yields a value.
    pub fn wait_until<R, F>(self: &Arc<Self>, timeout: Option<Duration>, check: F) -> Result<R>
    where
        F: FnMut() -> Result<Option<R>>,
    {
        self.claim()?.wait_until(timeout, check)
    }

    /// Async form of [`wait_until`](Self::wait_until).
    #[cfg(feature = "async")]
    pub async fn wait_until_async<R, F>(
        self: &Arc<Self>,
        timeout: Option<Duration>,
        check: F,
    ) -> Result<R>
    where
        F: FnMut() -> Result<Option<R>>,
    {
        let claim = self.claim()?;
        claim.wait_until_async(timeout, check).await
    }
}

/// Held while a wait is outstanding; releases the slot on drop.
#[derive(Debug)]
pub struct WaitClaim {
    coordinator: Arc<WaitCoordinator>,
}

impl WaitClaim {
    pub fn coordinator(&self) -> &Arc<WaitCoordinator> {
        &self.coordinator
    }

    /// Block until `check` returns `Some`, the timeout elapses, or the
    /// coordinator is cancelled. The slot stays claimed afterwards.
    pub fn wait_until<R, F>(&self, timeout: Option<Duration>, mut check: F) -> Result<R>
    where
        F: FnMut() -> Result<Option<R>>,
    {
        let coord = &self.coordinator;
        // bounds too large to represent as an instant wait forever
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = coord.state.lock();

        loop {
            if state.cancelled {
                return Err(Error::Cancelled);
            }
            if let Some(value) = check()? {
                return Ok(value);
            }

            match deadline {
                None => coord.cond.wait(&mut state),
                Some(deadline) => {
                    if coord.cond.wait_until(&mut state, deadline).timed_out() {
                        if state.cancelled {
                            return Err(Error::Cancelled);
                        }
                        // last look: the condition may have flipped right at the deadline
                        if let Some(value) = check()? {
                            return Ok(value);
                        }
                        log::debug!("[WAIT] {}: timed out after {:?}", coord.label, timeout);
                        return Err(Error::Timeout);
                    }
                }
            }
        }
    }

    /// Async wait on the same slot.
    ///
    /// The `Notified` future is armed before each check so notifications that
    /// race with the check are not lost.
    #[cfg(feature = "async")]
    pub async fn wait_until_async<R, F>(&self, timeout: Option<Duration>, mut check: F) -> Result<R>
    where
        F: FnMut() -> Result<Option<R>>,
    {
        let coord = &self.coordinator;
        let deadline = timeout.and_then(|t| tokio::time::Instant::now().checked_add(t));

        loop {
            let notified = coord.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if coord.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(value) = check()? {
                return Ok(value);
            }

            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        if coord.is_cancelled() {
                            return Err(Error::Cancelled);
                        }
                        if let Some(value) = check()? {
                            return Ok(value);
                        }
                        log::debug!("[WAIT] {}: timed out after {:?}", coord.label, timeout);
                        return Err(Error::Timeout);
                    }
                }
            }
        }
    }
}

impl Drop for WaitClaim {
    fn drop(&mut self) {
        self.coordinator.state.lock().busy = false;
    }
}
