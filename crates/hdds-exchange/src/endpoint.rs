// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State shared by writers and readers: registration, lifecycle, match waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{DomainState, EndpointLink};
use crate::error::{Error, Result};
use crate::identity::Guid;
use crate::matching::{EndpointDescriptor, MatchedEndpoint, MatchedStatus};
use crate::participant::ParticipantState;
use crate::wait::WaitCoordinator;

pub(crate) struct EndpointCore {
    descriptor: EndpointDescriptor,
    domain: Arc<DomainState>,
    participant: Arc<ParticipantState>,
    coordinator: Arc<WaitCoordinator>,
    closed: AtomicBool,
}

impl EndpointCore {
    /// Register with the domain; the endpoint is matchable on return.
    pub(crate) fn register(
        participant: &Arc<ParticipantState>,
        descriptor: EndpointDescriptor,
        coordinator: Arc<WaitCoordinator>,
        link: EndpointLink,
    ) -> Result<Arc<Self>> {
        participant.ensure_open()?;
        let core = Arc::new(Self {
            descriptor: descriptor.clone(),
            domain: Arc::clone(participant.domain()),
            participant: Arc::clone(participant),
            coordinator,
            closed: AtomicBool::new(false),
        });
        participant.track(&core);
        core.domain.register(descriptor, link);
        Ok(core)
    }

    pub(crate) fn guid(&self) -> Guid {
        self.descriptor.guid
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.descriptor.name.as_deref()
    }

    pub(crate) fn topic(&self) -> &str {
        &self.descriptor.topic
    }

    pub(crate) fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub(crate) fn domain(&self) -> &Arc<DomainState> {
        &self.domain
    }

    pub(crate) fn coordinator(&self) -> &Arc<WaitCoordinator> {
        &self.coordinator
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.participant.is_closed()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed(format!(
                "{:?} {} on topic '{}'",
                self.descriptor.kind, self.descriptor.guid, self.descriptor.topic
            )));
        }
        Ok(())
    }

    pub(crate) fn enable(&self) -> Result<()> {
        self.ensure_open()?;
        self.domain.enable(&self.descriptor.guid);
        Ok(())
    }

    /// Cancel outstanding waits, then leave the domain.
    ///
    /// Idempotent; returns false if already closed.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.coordinator.cancel();
        if let Some(link) = self.domain.unregister(&self.descriptor.guid) {
            if let Some(inbox) = link.inbox {
                inbox.close();
            }
        }
        log::info!(
            "[PARTICIPANT] closed {:?} {} on topic '{}'",
            self.descriptor.kind,
            self.descriptor.guid,
            self.descriptor.topic
        );
        true
    }

    fn match_check(&self) -> impl FnMut() -> Result<Option<i32>> + '_ {
        move || {
            let delta = self.domain.pending_delta(&self.descriptor.guid);
            Ok((delta != 0).then_some(delta))
        }
    }

    /// Block until the net match delta is non-zero, then consume it.
    pub(crate) fn wait_for_matches(&self, timeout: Option<Duration>) -> Result<i32> {
        self.ensure_open()?;
        self.coordinator.wait_until(timeout, self.match_check())
    }

    #[cfg(feature = "async")]
    pub(crate) async fn wait_for_matches_async(&self, timeout: Option<Duration>) -> Result<i32> {
        self.ensure_open()?;
        self.coordinator
            .wait_until_async(timeout, self.match_check())
            .await
    }

    pub(crate) fn current_matches(&self) -> Result<Vec<MatchedEndpoint>> {
        self.ensure_open()?;
        Ok(self.domain.current_matches(&self.descriptor.guid))
    }

    pub(crate) fn matched_status(&self) -> Result<MatchedStatus> {
        self.ensure_open()?;
        Ok(self.domain.matched_status(&self.descriptor.guid))
    }
}

impl Drop for EndpointCore {
    fn drop(&mut self) {
        self.close();
    }
}
