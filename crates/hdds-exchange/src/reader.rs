// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reader endpoint.
//!
//! # Architecture
//!
//! ```text
//! Writer::write()
//!     |
//!     v  (one call per matched reader)
//! ReaderInbox::deliver()
//!     +-- instance tracking (view_state NEW / NOT_NEW)
//!     +-- HistoryCache::push() (FIFO eviction at depth)
//!     +-- WaitCoordinator::notify()
//!
//! Reader::read()/take()  --> Samples<'_> (borrows the reader)
//! Reader::wait()         --> resolves when an unread sample exists
//! ```

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::data::{DynamicData, TypeSchema};
use crate::domain::EndpointLink;
use crate::endpoint::EndpointCore;
use crate::error::{Error, Result};
use crate::history::{DeliveryTicket, HistoryCache, HistoryDepth, Sample, Samples};
use crate::identity::{Guid, ENTITY_KIND_READER};
use crate::listener::{self, DataAvailable, ListenerHandle};
use crate::matching::{EndpointDescriptor, EndpointKind, MatchedEndpoint, MatchedStatus, Reliability};
use crate::participant::ParticipantState;
use crate::sample::{now_ns, InstanceHandle, InstanceState, SampleInfo, ViewState};
use crate::wait::WaitCoordinator;

struct InboxState {
    cache: HistoryCache<DynamicData>,
    /// Last known state per instance seen by this reader.
    instances: HashMap<InstanceHandle, InstanceState>,
    closed: bool,
}

/// Receiving side of a reader, shared with the writers matched to it.
pub(crate) struct ReaderInbox {
    guid: Guid,
    reliability: Reliability,
    coordinator: Arc<WaitCoordinator>,
    state: Mutex<InboxState>,
}

impl ReaderInbox {
    fn new(
        guid: Guid,
        reliability: Reliability,
        depth: HistoryDepth,
        coordinator: Arc<WaitCoordinator>,
    ) -> Self {
        Self {
            guid,
            reliability,
            coordinator,
            state: Mutex::new(InboxState {
                cache: HistoryCache::new(depth),
                instances: HashMap::new(),
                closed: false,
            }),
        }
    }

    pub(crate) fn reliability(&self) -> Reliability {
        self.reliability
    }

    /// Store one sample and wake the reader.
    ///
    /// `view_state` and `reception_timestamp` are filled in here.
    pub(crate) fn deliver(
        &self,
        data: Option<DynamicData>,
        mut info: SampleInfo,
        ticket: Option<DeliveryTicket>,
    ) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            let previous = state
                .instances
                .insert(info.instance_handle, info.instance_state);
            info.view_state = match previous {
                Some(prev) if prev.is_alive() => ViewState::NotNew,
                _ => ViewState::New,
            };
            info.reception_timestamp = now_ns();
            log::debug!(
                "[READER] {} <- seq={} valid={} view={:?}",
                self.guid,
                info.identity.sequence_number,
                info.valid_data,
                info.view_state
            );
            state.cache.push(data, info, ticket);
        }
        self.coordinator.notify();
    }

    pub(crate) fn read(&self) -> Vec<Sample<DynamicData>> {
        self.state.lock().cache.read()
    }

    pub(crate) fn take(&self) -> Vec<Sample<DynamicData>> {
        self.state.lock().cache.take()
    }

    pub(crate) fn take_where<F>(&self, pred: F) -> Vec<Sample<DynamicData>>
    where
        F: FnMut(&SampleInfo, Option<&DynamicData>) -> bool,
    {
        self.state.lock().cache.take_where(pred)
    }

    /// Remove the oldest entry matching `pred`, if any.
    pub(crate) fn take_first<F>(&self, mut pred: F) -> Option<Sample<DynamicData>>
    where
        F: FnMut(&SampleInfo) -> bool,
    {
        let mut found = false;
        self.state
            .lock()
            .cache
            .take_where(|info, _| {
                if !found && pred(info) {
                    found = true;
                    return true;
                }
                false
            })
            .into_iter()
            .next()
    }

    /// `(unread, total_received)` under one lock.
    pub(crate) fn activity(&self) -> (usize, u64) {
        let state = self.state.lock();
        (state.cache.unread_count(), state.cache.total_received())
    }

    fn has_unread(&self) -> bool {
        self.state.lock().cache.unread_count() > 0
    }

    fn stats(&self) -> HistoryStats {
        let state = self.state.lock();
        HistoryStats {
            len: state.cache.len(),
            unread: state.cache.unread_count(),
            total_received: state.cache.total_received(),
            evicted: state.cache.evicted(),
        }
    }

    /// Drop every cached sample (releasing delivery tickets) and refuse more.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.cache.clear();
        state.instances.clear();
    }
}

/// Snapshot of a reader's history counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryStats {
    /// Samples currently cached
    pub len: usize,
    /// Cached samples never returned by `read()`
    pub unread: usize,
    /// Samples received since creation
    pub total_received: u64,
    /// Samples dropped by depth enforcement
    pub evicted: u64,
}

/// Subscribing endpoint bound to one topic.
pub struct Reader {
    core: Arc<EndpointCore>,
    inbox: Arc<ReaderInbox>,
    schema: Option<Arc<TypeSchema>>,
}

impl Reader {
    pub(crate) fn create(
        participant: &Arc<ParticipantState>,
        name: Option<String>,
        binding: &EndpointConfig,
        schema: Option<Arc<TypeSchema>>,
    ) -> Result<Self> {
        participant.ensure_open()?;
        let depth = binding.depth()?;
        let guid = participant.next_guid(ENTITY_KIND_READER);
        let coordinator = WaitCoordinator::new(format!("reader {}", guid));
        let inbox = Arc::new(ReaderInbox::new(
            guid,
            binding.reliability,
            depth,
            Arc::clone(&coordinator),
        ));

        let descriptor = EndpointDescriptor {
            guid,
            kind: EndpointKind::Reader,
            topic: binding.topic.clone(),
            name,
            reliability: binding.reliability,
            enabled: binding.enabled,
        };
        let link = EndpointLink {
            coordinator: Arc::clone(&coordinator),
            inbox: Some(Arc::clone(&inbox)),
        };
        let core = EndpointCore::register(participant, descriptor, coordinator, link)?;

        log::info!(
            "[READER] created {} topic='{}' depth={:?} reliability={}",
            guid,
            binding.topic,
            depth,
            binding.reliability
        );
        Ok(Self {
            core,
            inbox,
            schema,
        })
    }

    pub fn guid(&self) -> Guid {
        self.core.guid()
    }

    pub fn name(&self) -> Option<&str> {
        self.core.name()
    }

    pub fn topic(&self) -> &str {
        self.core.topic()
    }

    pub fn reliability(&self) -> Reliability {
        self.core.descriptor().reliability
    }

    pub fn schema(&self) -> Option<&Arc<TypeSchema>> {
        self.schema.as_ref()
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    /// Every cached sample, oldest first; entries stay cached and become READ.
    ///
    /// The returned view borrows the reader, so it cannot outlive the next
    /// `read()`/`take()`.
    pub fn read(&mut self) -> Result<Samples<'_, DynamicData>> {
        self.core.ensure_open()?;
        Ok(Samples::new(self.inbox.read()))
    }

    /// Every cached sample, oldest first; the cache is emptied.
    pub fn take(&mut self) -> Result<Samples<'_, DynamicData>> {
        self.core.ensure_open()?;
        Ok(Samples::new(self.inbox.take()))
    }

    /// Take only the samples matching `pred`; others stay cached in order.
    pub fn take_where<F>(&mut self, pred: F) -> Result<Samples<'_, DynamicData>>
    where
        F: FnMut(&SampleInfo, Option<&DynamicData>) -> bool,
    {
        self.core.ensure_open()?;
        Ok(Samples::new(self.inbox.take_where(pred)))
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.inbox.stats()
    }

    // ------------------------------------------------------------------
    // Waits
    // ------------------------------------------------------------------

    /// Block until at least one unread sample is cached.
    ///
    /// # Errors
    ///
    /// `Timeout` when the bound elapses, `Concurrency` if another wait (or a
    /// listener) is active on this reader, `Cancelled` if the reader is closed
    /// meanwhile.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        self.core.ensure_open()?;
        let inbox = &self.inbox;
        self.core
            .coordinator()
            .wait_until(timeout, || Ok(inbox.has_unread().then_some(())))
    }

    #[cfg(feature = "async")]
    pub async fn wait_async(&self, timeout: Option<Duration>) -> Result<()> {
        self.core.ensure_open()?;
        let inbox = &self.inbox;
        self.core
            .coordinator()
            .wait_until_async(timeout, || Ok(inbox.has_unread().then_some(())))
            .await
    }

    /// Block until the set of matched writers changed; returns the net change.
    pub fn wait_for_publications(&self, timeout: Option<Duration>) -> Result<i32> {
        self.core.wait_for_matches(timeout)
    }

    #[cfg(feature = "async")]
    pub async fn wait_for_publications_async(&self, timeout: Option<Duration>) -> Result<i32> {
        self.core.wait_for_matches_async(timeout).await
    }

    /// Wait for a reply-like sample selected by `pred`, removing it.
    pub(crate) fn wait_take_first<F>(
        &self,
        timeout: Option<Duration>,
        mut pred: F,
    ) -> Result<Sample<DynamicData>>
    where
        F: FnMut(&SampleInfo) -> bool,
    {
        self.core.ensure_open()?;
        let inbox = &self.inbox;
        self.core
            .coordinator()
            .wait_until(timeout, || Ok(inbox.take_first(&mut pred)))
    }

    #[cfg(feature = "async")]
    pub(crate) async fn wait_take_first_async<F>(
        &self,
        timeout: Option<Duration>,
        mut pred: F,
    ) -> Result<Sample<DynamicData>>
    where
        F: FnMut(&SampleInfo) -> bool,
    {
        self.core.ensure_open()?;
        let inbox = &self.inbox;
        self.core
            .coordinator()
            .wait_until_async(timeout, || Ok(inbox.take_first(&mut pred)))
            .await
    }

    // ------------------------------------------------------------------
    // Matching and lifecycle
    // ------------------------------------------------------------------

    /// Writers currently matched (no side effect).
    pub fn matched_publications(&self) -> Result<Vec<MatchedEndpoint>> {
        self.core.current_matches()
    }

    /// Match counters; resets `current_count_change`.
    pub fn subscription_matched_status(&self) -> Result<MatchedStatus> {
        self.core.matched_status()
    }

    /// Make a reader configured with `enabled: false` matchable.
    pub fn enable(&self) -> Result<()> {
        self.core.enable()
    }

    /// Invoke `callback` each time new samples arrive, from a dispatcher
    /// thread, until the returned handle is dropped or the reader closes.
    ///
    /// While the listener is active, direct waits on this reader fail with
    /// `Error::Concurrency`.
    pub fn on_data_available<F>(&self, callback: F) -> Result<ListenerHandle>
    where
        F: FnMut(&mut DataAvailable<'_>) + Send + 'static,
    {
        self.core.ensure_open()?;
        listener::spawn(self.core.coordinator(), Arc::clone(&self.inbox), self.guid(), callback)
    }

    /// Cancel outstanding waits and unregister; cached samples are dropped.
    pub fn close(&self) {
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("guid", &self.guid())
            .field("name", &self.name())
            .field("topic", &self.topic())
            .finish()
    }
}

impl Sample<DynamicData> {
    /// Payload as JSON, `None` for samples without valid data.
    pub fn to_json(&self) -> Option<&Value> {
        self.data().map(DynamicData::to_json)
    }

    /// Deserialize the payload into a typed value.
    ///
    /// # Errors
    ///
    /// `Error::InvalidValue` for samples without valid data,
    /// `Error::Core` when the payload does not fit `D`.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D> {
        match self.data() {
            Some(data) => data.deserialize(),
            None => Err(Error::InvalidValue(format!(
                "sample {} carries no valid data ({:?})",
                self.info().identity,
                self.info().instance_state
            ))),
        }
    }
}
