// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer endpoint.
//!
//! A writer owns an editable instance ([`DynamicData`]) and a sequence number
//! generator. Each write stamps a [`SampleIdentity`] and pushes the sample into
//! the history cache of every matched reader; it never waits on readers.
//! Concurrent writes through a shared writer are serialized, so every reader
//! caches them in sequence-number order.
//!
//! Samples delivered to reliable readers are tracked until the reader consumes
//! or discards them; [`Writer::wait`] blocks until none are outstanding.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EndpointConfig;
use crate::data::{DynamicData, TypeSchema};
use crate::domain::EndpointLink;
use crate::endpoint::EndpointCore;
use crate::error::Result;
use crate::history::{Acknowledge, DeliveryTicket};
use crate::identity::{Guid, IdentityGenerator, SampleIdentity, ENTITY_KIND_WRITER};
use crate::matching::{EndpointDescriptor, EndpointKind, MatchedEndpoint, MatchedStatus, Reliability};
use crate::participant::ParticipantState;
use crate::sample::{
    now_ns, InstanceHandle, SampleInfo, SampleState, ViewState, WriteParams,
};
use crate::wait::WaitCoordinator;

/// Outstanding deliveries to reliable readers.
#[derive(Debug)]
struct AckTracker {
    pending: AtomicUsize,
    coordinator: Arc<WaitCoordinator>,
}

impl AckTracker {
    fn ticket(self: &Arc<Self>) -> DeliveryTicket {
        self.pending.fetch_add(1, Ordering::AcqRel);
        DeliveryTicket::new(Arc::clone(self) as Arc<dyn Acknowledge>)
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Acknowledge for AckTracker {
    fn acknowledge(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.coordinator.notify();
        }
    }
}

/// Publishing endpoint bound to one topic.
pub struct Writer {
    core: Arc<EndpointCore>,
    ids: IdentityGenerator,
    /// Held from identity assignment until every inbox has the sample.
    publish_lock: Mutex<()>,
    instance: DynamicData,
    schema: Option<Arc<TypeSchema>>,
    acks: Arc<AckTracker>,
}

impl Writer {
    pub(crate) fn create(
        participant: &Arc<ParticipantState>,
        name: Option<String>,
        binding: &EndpointConfig,
        schema: Option<Arc<TypeSchema>>,
    ) -> Result<Self> {
        participant.ensure_open()?;
        let guid = participant.next_guid(ENTITY_KIND_WRITER);
        let coordinator = WaitCoordinator::new(format!("writer {}", guid));
        let acks = Arc::new(AckTracker {
            pending: AtomicUsize::new(0),
            coordinator: Arc::clone(&coordinator),
        });

        let descriptor = EndpointDescriptor {
            guid,
            kind: EndpointKind::Writer,
            topic: binding.topic.clone(),
            name,
            reliability: binding.reliability,
            enabled: binding.enabled,
        };
        let link = EndpointLink {
            coordinator: Arc::clone(&coordinator),
            inbox: None,
        };
        let core = EndpointCore::register(participant, descriptor, coordinator, link)?;

        let instance = match &schema {
            Some(schema) => DynamicData::with_schema(Arc::clone(schema)),
            None => DynamicData::new(),
        };

        log::info!(
            "[WRITER] created {} topic='{}' reliability={}",
            guid,
            binding.topic,
            binding.reliability
        );
        Ok(Self {
            core,
            ids: IdentityGenerator::new(guid),
            publish_lock: Mutex::new(()),
            instance,
            schema,
            acks,
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
    // Instance editing
    // ------------------------------------------------------------------

    /// The record published by [`write`](Self::write).
    pub fn instance(&self) -> &DynamicData {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut DynamicData {
        &mut self.instance
    }

    /// Reset one member of the instance.
    pub fn clear_member(&mut self, path: &str) -> Result<()> {
        self.instance.clear_member(path)
    }

    /// Reset every member of the instance.
    pub fn clear_all(&mut self) {
        self.instance.clear_all();
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Publish the current instance.
    pub fn write(&self) -> Result<SampleIdentity> {
        self.publish(&self.instance, WriteParams::default())
    }

    /// Publish the current instance with explicit parameters.
    pub fn write_with(&self, params: WriteParams) -> Result<SampleIdentity> {
        self.publish(&self.instance, params)
    }

    /// Publish a separate record, checked against this writer's type.
    pub fn write_data(&self, data: &DynamicData, params: WriteParams) -> Result<SampleIdentity> {
        match &self.schema {
            Some(schema) if data.schema() != Some(schema) => {
                let checked = DynamicData::from_json(data.to_json().clone(), Some(Arc::clone(schema)))?;
                self.publish(&checked, params)
            }
            _ => self.publish(data, params),
        }
    }

    /// Publish a JSON object, checked against this writer's type.
    pub fn write_json(&self, value: &Value, params: WriteParams) -> Result<SampleIdentity> {
        let data = DynamicData::from_json(value.clone(), self.schema.clone())?;
        self.publish(&data, params)
    }

    /// Publish any serializable value.
    pub fn write_serialize<S: Serialize>(&self, payload: &S, params: WriteParams) -> Result<SampleIdentity> {
        let data = DynamicData::from_serialize(payload, self.schema.clone())?;
        self.publish(&data, params)
    }

    fn publish(&self, data: &DynamicData, params: WriteParams) -> Result<SampleIdentity> {
        self.core.ensure_open()?;

        // lock order: publish lock, then domain engine, then reader inbox
        let _serial = self.publish_lock.lock();
        let identity = params.identity.unwrap_or_else(|| self.ids.next());
        let instance_handle = self
            .schema
            .as_ref()
            .map_or(InstanceHandle::nil(), |s| s.instance_handle(data.to_json()));
        let now = now_ns();
        let info = SampleInfo {
            source_timestamp: params.source_timestamp.unwrap_or(now),
            reception_timestamp: now,
            identity,
            related_identity: params.related_identity,
            valid_data: params.action.carries_data(),
            view_state: ViewState::New,
            instance_state: params.action.instance_state(),
            sample_state: SampleState::NotRead,
            instance_handle,
        };
        let payload = params.action.carries_data().then(|| data.clone());

        let inboxes = self.core.domain().matched_inboxes(&self.core.guid());
        for inbox in &inboxes {
            let ticket = (inbox.reliability() == Reliability::Reliable).then(|| self.acks.ticket());
            inbox.deliver(payload.clone(), info.clone(), ticket);
        }

        log::debug!(
            "[WRITER] {} seq={} action={:?} -> {} reader(s)",
            self.core.guid(),
            identity.sequence_number,
            params.action,
            inboxes.len()
        );
        Ok(identity)
    }

    /// Samples issued so far by the identity generator.
    pub fn samples_written(&self) -> u64 {
        self.ids.issued()
    }

    // ------------------------------------------------------------------
    // Waits
    // ------------------------------------------------------------------

    /// Deliveries to reliable readers not yet consumed.
    pub fn unacknowledged(&self) -> usize {
        self.acks.pending()
    }

    /// Block until every sample delivered to a reliable reader has been read,
    /// taken or discarded by it.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        self.core.ensure_open()?;
        let acks = &self.acks;
        self.core
            .coordinator()
            .wait_until(timeout, || Ok((acks.pending() == 0).then_some(())))
    }

    #[cfg(feature = "async")]
    pub async fn wait_async(&self, timeout: Option<Duration>) -> Result<()> {
        self.core.ensure_open()?;
        let acks = &self.acks;
        self.core
            .coordinator()
            .wait_until_async(timeout, || Ok((acks.pending() == 0).then_some(())))
            .await
    }

    /// Block until the set of matched readers changed; returns the net change.
    pub fn wait_for_subscriptions(&self, timeout: Option<Duration>) -> Result<i32> {
        self.core.wait_for_matches(timeout)
    }

    #[cfg(feature = "async")]
    pub async fn wait_for_subscriptions_async(&self, timeout: Option<Duration>) -> Result<i32> {
        self.core.wait_for_matches_async(timeout).await
    }

    // ------------------------------------------------------------------
    // Matching and lifecycle
    // ------------------------------------------------------------------

    /// Readers currently matched (no side effect).
    pub fn matched_subscriptions(&self) -> Result<Vec<MatchedEndpoint>> {
        self.core.current_matches()
    }

    /// Match counters; resets `current_count_change`.
    pub fn publication_matched_status(&self) -> Result<MatchedStatus> {
        self.core.matched_status()
    }

    pub fn enable(&self) -> Result<()> {
        self.core.enable()
    }

    /// Cancel outstanding waits and unregister.
    pub fn close(&self) {
        self.core.close();
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("guid", &self.guid())
            .field("name", &self.name())
            .field("topic", &self.topic())
            .field("unacknowledged", &self.unacknowledged())
            .finish()
    }
}
