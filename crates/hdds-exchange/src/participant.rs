// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Participant
//!
//! A [`Participant`] groups writers and readers inside a [`Domain`] and owns
//! their lifecycle: closing (or dropping) it cancels every outstanding wait of
//! its endpoints and unregisters them.
//!
//! ## Example
//!
//! ```rust
//! use hdds_exchange::{Domain, EndpointConfig, Participant};
//!
//! # fn main() -> hdds_exchange::Result<()> {
//! let domain = Domain::standalone(0);
//! let participant = Participant::new(&domain, "shapes")?;
//!
//! let mut writer = participant.create_writer_with(Some("W"), &EndpointConfig::new("Square"))?;
//! let mut reader = participant.create_reader_with(None, &EndpointConfig::new("Square"))?;
//!
//! writer.instance_mut().set_number("x", 1.0)?;
//! writer.write()?;
//! assert_eq!(reader.take()?.len(), 1);
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::config::{EndpointConfig, ParticipantConfig};
use crate::domain::{Domain, DomainState};
use crate::endpoint::EndpointCore;
use crate::error::{Error, Result};
use crate::identity::{generate_guid_prefix, Guid, ENTITY_KIND_PARTICIPANT};
use crate::reader::Reader;
use crate::writer::Writer;

pub(crate) struct ParticipantState {
    name: String,
    guid: Guid,
    domain: Arc<DomainState>,
    bindings: Option<ParticipantConfig>,
    next_entity: AtomicU32,
    closed: AtomicBool,
    endpoints: Mutex<Vec<Weak<EndpointCore>>>,
}

impl ParticipantState {
    pub(crate) fn domain(&self) -> &Arc<DomainState> {
        &self.domain
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed(format!("participant '{}'", self.name)));
        }
        Ok(())
    }

    /// GUID for the next endpoint of kind `kind`.
    pub(crate) fn next_guid(&self, kind: u8) -> Guid {
        let index = self.next_entity.fetch_add(1, Ordering::Relaxed);
        self.guid.with_entity(index, kind)
    }

    pub(crate) fn track(&self, core: &Arc<EndpointCore>) {
        let mut endpoints = self.endpoints.lock();
        endpoints.retain(|weak| weak.strong_count() > 0);
        endpoints.push(Arc::downgrade(core));
    }

    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let endpoints: Vec<Arc<EndpointCore>> = self
            .endpoints
            .lock()
            .drain(..)
            .filter_map(|weak| weak.upgrade())
            .collect();
        for core in &endpoints {
            core.close();
        }
        log::info!(
            "[PARTICIPANT] '{}' closed ({} endpoint(s))",
            self.name,
            endpoints.len()
        );
        true
    }
}

/// Lightweight grouping of endpoints.
pub struct Participant {
    state: Arc<ParticipantState>,
}

impl Participant {
    /// Participant without configured bindings; endpoints are created with
    /// [`create_writer_with`](Self::create_writer_with) /
    /// [`create_reader_with`](Self::create_reader_with).
    pub fn new(domain: &Domain, name: impl Into<String>) -> Result<Self> {
        Ok(Self::build(domain, name.into(), None))
    }

    /// Participant bound to `"Library::Participant"` from the domain's
    /// configuration.
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if the name does not resolve.
    pub fn from_config(domain: &Domain, qualified: &str) -> Result<Self> {
        let bindings = domain.config().participant(qualified)?.clone();
        Ok(Self::build(domain, qualified.to_string(), Some(bindings)))
    }

    fn build(domain: &Domain, name: String, bindings: Option<ParticipantConfig>) -> Self {
        let guid = Guid::new(generate_guid_prefix(), [0, 0, 1, ENTITY_KIND_PARTICIPANT]);
        log::info!(
            "[PARTICIPANT] '{}' joined domain {} as {}",
            name,
            domain.id(),
            guid
        );
        Self {
            state: Arc::new(ParticipantState {
                name,
                guid,
                domain: Arc::clone(domain.state()),
                bindings,
                next_entity: AtomicU32::new(1),
                closed: AtomicBool::new(false),
                endpoints: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn guid(&self) -> Guid {
        self.state.guid
    }

    pub fn domain_id(&self) -> u32 {
        self.state.domain.id()
    }

    fn binding(&self, name: &str, writer: bool) -> Result<&EndpointConfig> {
        let bindings = self.state.bindings.as_ref().ok_or_else(|| {
            Error::Configuration(format!(
                "participant '{}' has no configured endpoints (looking up '{}')",
                self.state.name, name
            ))
        })?;
        if writer {
            bindings.writer(name)
        } else {
            bindings.reader(name)
        }
    }

    /// Create the writer configured as `name` (`"Group::Writer"`).
    pub fn create_writer(&self, name: &str) -> Result<Writer> {
        let binding = self.binding(name, true)?.clone();
        self.create_writer_with(Some(name), &binding)
    }

    /// Create the reader configured as `name` (`"Group::Reader"`).
    pub fn create_reader(&self, name: &str) -> Result<Reader> {
        let binding = self.binding(name, false)?.clone();
        self.create_reader_with(Some(name), &binding)
    }

    /// Create a writer from an explicit binding. `name` is what peers see.
    pub fn create_writer_with(&self, name: Option<&str>, binding: &EndpointConfig) -> Result<Writer> {
        let schema = self.state.domain.config().schema_for(binding)?;
        Writer::create(&self.state, name.map(str::to_string), binding, schema)
    }

    /// Create a reader from an explicit binding. `name` is what peers see.
    pub fn create_reader_with(&self, name: Option<&str>, binding: &EndpointConfig) -> Result<Reader> {
        let schema = self.state.domain.config().schema_for(binding)?;
        Reader::create(&self.state, name.map(str::to_string), binding, schema)
    }

    /// Names of the writers and readers this participant may create.
    pub fn configured_endpoints(&self) -> (Vec<&str>, Vec<&str>) {
        match &self.state.bindings {
            Some(b) => (
                b.writers.keys().map(String::as_str).collect(),
                b.readers.keys().map(String::as_str).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Cancel every outstanding wait of this participant's endpoints and
    /// unregister them. Later operations on them fail with `Error::Closed`.
    pub fn close(&self) {
        self.state.close();
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

impl Drop for Participant {
    fn drop(&mut self) {
        self.state.close();
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.state.name)
            .field("guid", &self.state.guid)
            .field("closed", &self.is_closed())
            .finish()
    }
}
