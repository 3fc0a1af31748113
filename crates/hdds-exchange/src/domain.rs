// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain: the matching scope shared by a set of participants.
//!
//! # Architecture
//!
//! ```text
//! Domain (cheap to clone, passed explicitly to participants)
//! +-- id: DomainId
//! +-- config: Arc<ExchangeConfig>
//! +-- engine: Mutex<MatchEngine<EndpointLink>>
//!
//! EndpointLink
//! +-- coordinator: Arc<WaitCoordinator>   (woken on match changes)
//! +-- inbox: Option<Arc<ReaderInbox>>     (readers only, write fan-out target)
//! ```
//!
//! Endpoints in different domains never match. The engine lock is scoped to
//! one domain; there is no process-wide registry.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::ExchangeConfig;
use crate::identity::Guid;
use crate::matching::{EndpointDescriptor, MatchEngine, MatchedEndpoint, MatchedStatus};
use crate::reader::ReaderInbox;
use crate::wait::WaitCoordinator;

/// Domain ID type
pub type DomainId = u32;

/// What the match engine hands back for each endpoint.
#[derive(Clone)]
pub(crate) struct EndpointLink {
    pub(crate) coordinator: Arc<WaitCoordinator>,
    pub(crate) inbox: Option<Arc<ReaderInbox>>,
}

impl std::fmt::Debug for EndpointLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointLink")
            .field("coordinator", &self.coordinator.label())
            .field("has_inbox", &self.inbox.is_some())
            .finish()
    }
}

pub(crate) struct DomainState {
    id: DomainId,
    config: Arc<ExchangeConfig>,
    engine: Mutex<MatchEngine<EndpointLink>>,
}

impl DomainState {
    pub(crate) fn config(&self) -> &Arc<ExchangeConfig> {
        &self.config
    }

    pub(crate) fn id(&self) -> DomainId {
        self.id
    }

    /// Register and wake every endpoint whose match set changed.
    pub(crate) fn register(&self, descriptor: EndpointDescriptor, link: EndpointLink) {
        let affected = self.engine.lock().register(descriptor, link);
        wake(&affected);
    }

    pub(crate) fn enable(&self, guid: &Guid) {
        let affected = self.engine.lock().enable(guid);
        wake(&affected);
    }

    /// Unregister and wake the peers that lost a match.
    ///
    /// Returns the removed link, if the endpoint was registered.
    pub(crate) fn unregister(&self, guid: &Guid) -> Option<EndpointLink> {
        let removed = self.engine.lock().unregister(guid);
        removed.map(|(link, peers)| {
            wake(&peers);
            link
        })
    }

    pub(crate) fn pending_delta(&self, guid: &Guid) -> i32 {
        self.engine.lock().pending_delta(guid)
    }

    pub(crate) fn current_matches(&self, guid: &Guid) -> Vec<MatchedEndpoint> {
        self.engine.lock().current_matches(guid)
    }

    pub(crate) fn matched_status(&self, guid: &Guid) -> MatchedStatus {
        self.engine.lock().matched_status(guid)
    }

    /// Inboxes of the readers matched with writer `guid`.
    pub(crate) fn matched_inboxes(&self, guid: &Guid) -> Vec<Arc<ReaderInbox>> {
        self.engine
            .lock()
            .matched_links(guid)
            .into_iter()
            .filter_map(|link| link.inbox)
            .collect()
    }

    pub(crate) fn endpoint_count(&self) -> usize {
        self.engine.lock().len()
    }
}

fn wake(links: &[EndpointLink]) {
    for link in links {
        link.coordinator.notify();
    }
}

/// Shared matching scope.
///
/// # Example
///
/// ```rust
/// use hdds_exchange::{Domain, ExchangeConfig};
/// use std::sync::Arc;
///
/// let domain = Domain::new(0, Arc::new(ExchangeConfig::new()));
/// assert_eq!(domain.id(), 0);
/// assert_eq!(domain.endpoint_count(), 0);
/// ```
#[derive(Clone)]
pub struct Domain {
    state: Arc<DomainState>,
}

impl Domain {
    pub fn new(id: DomainId, config: Arc<ExchangeConfig>) -> Self {
        log::info!("[PARTICIPANT] domain {} created", id);
        Self {
            state: Arc::new(DomainState {
                id,
                config,
                engine: Mutex::new(MatchEngine::new()),
            }),
        }
    }

    /// Domain with an empty configuration (programmatic endpoints only).
    pub fn standalone(id: DomainId) -> Self {
        Self::new(id, Arc::new(ExchangeConfig::new()))
    }

    pub fn id(&self) -> DomainId {
        self.state.id
    }

    pub fn config(&self) -> &Arc<ExchangeConfig> {
        &self.state.config
    }

    /// Endpoints currently registered (all participants).
    pub fn endpoint_count(&self) -> usize {
        self.state.endpoint_count()
    }

    pub(crate) fn state(&self) -> &Arc<DomainState> {
        &self.state
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.state.id)
            .field("endpoints", &self.endpoint_count())
            .finish()
    }
}
