// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Requester: sends requests and waits for the matching reply.

use serde_json::Value;
use std::time::Duration;

use super::{reply_topic, request_topic};
use crate::config::EndpointConfig;
use crate::data::DynamicData;
use crate::error::Result;
use crate::history::Sample;
use crate::identity::{Guid, SampleIdentity};
use crate::matching::MatchedEndpoint;
use crate::participant::Participant;
use crate::reader::Reader;
use crate::sample::WriteParams;
use crate::writer::Writer;

/// Client side of a service.
///
/// # Example
///
/// ```rust
/// use hdds_exchange::rpc::{Replier, Requester};
/// use hdds_exchange::{Domain, Participant};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # fn main() -> hdds_exchange::Result<()> {
/// let domain = Domain::standalone(0);
/// let participant = Participant::new(&domain, "rpc")?;
/// let mut requester = Requester::new(&participant, "Echo")?;
/// let mut replier = Replier::new(&participant, "Echo")?;
///
/// let id = requester.send_request(&json!({ "text": "hi" }))?;
/// for request in replier.receive_requests(Some(Duration::from_secs(1)))? {
///     if let Some(body) = request.to_json() {
///         replier.send_reply(&request.info().identity, body)?;
///     }
/// }
///
/// let reply = requester.receive_reply(&id, Some(Duration::from_secs(1)))?;
/// assert_eq!(reply.to_json(), Some(&json!({ "text": "hi" })));
/// # Ok(())
/// # }
/// ```
pub struct Requester {
    service: String,
    writer: Writer,
    reader: Reader,
}

impl Requester {
    /// Schemaless requester for `service`.
    pub fn new(participant: &Participant, service: &str) -> Result<Self> {
        Self::with_types(participant, service, None, None)
    }

    /// Requester whose request and reply payloads are checked against types
    /// declared in the domain configuration.
    pub fn with_types(
        participant: &Participant,
        service: &str,
        request_type: Option<&str>,
        reply_type: Option<&str>,
    ) -> Result<Self> {
        let mut request = EndpointConfig::new(request_topic(service));
        request.type_name = request_type.map(str::to_string);
        let mut reply = EndpointConfig::new(reply_topic(service));
        reply.type_name = reply_type.map(str::to_string);

        let name = format!("{}::Requester", service);
        let writer = participant.create_writer_with(Some(&name), &request)?;
        let reader = participant.create_reader_with(Some(&name), &reply)?;
        log::info!("[RPC] requester for '{}' ready ({})", service, writer.guid());
        Ok(Self {
            service: service.to_string(),
            writer,
            reader,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// GUID stamped on every request this requester sends.
    pub fn guid(&self) -> Guid {
        self.writer.guid()
    }

    /// Send a request; the returned identity correlates its reply.
    pub fn send_request(&self, payload: &Value) -> Result<SampleIdentity> {
        let id = self.writer.write_json(payload, WriteParams::default())?;
        log::debug!("[RPC] '{}' request {}", self.service, id);
        Ok(id)
    }

    pub fn send_request_data(&self, payload: &DynamicData) -> Result<SampleIdentity> {
        self.writer.write_data(payload, WriteParams::default())
    }

    /// Wait for and take the reply to `request`.
    ///
    /// Replies to other requests of this requester stay cached; replies meant
    /// for other requesters are discarded.
    pub fn receive_reply(
        &mut self,
        request: &SampleIdentity,
        timeout: Option<Duration>,
    ) -> Result<Sample<DynamicData>> {
        self.discard_foreign_replies()?;
        self.reader
            .wait_take_first(timeout, |info| info.related_identity.as_ref() == Some(request))
    }

    #[cfg(feature = "async")]
    pub async fn receive_reply_async(
        &mut self,
        request: &SampleIdentity,
        timeout: Option<Duration>,
    ) -> Result<Sample<DynamicData>> {
        self.discard_foreign_replies()?;
        self.reader
            .wait_take_first_async(timeout, |info| info.related_identity.as_ref() == Some(request))
            .await
    }

    fn discard_foreign_replies(&mut self) -> Result<()> {
        let own = self.writer.guid();
        let dropped = self
            .reader
            .take_where(|info, _| info.related_identity.map_or(true, |r| r.writer_guid != own))?
            .len();
        if dropped > 0 {
            log::debug!(
                "[RPC] '{}' discarded {} reply(ies) for other requesters",
                self.service,
                dropped
            );
        }
        Ok(())
    }

    /// Block until the set of matched repliers changed.
    pub fn wait_for_service(&self, timeout: Option<Duration>) -> Result<i32> {
        self.writer.wait_for_subscriptions(timeout)
    }

    /// Repliers currently reachable.
    pub fn matched_repliers(&self) -> Result<Vec<MatchedEndpoint>> {
        self.writer.matched_subscriptions()
    }

    pub fn close(&self) {
        self.writer.close();
        self.reader.close();
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("service", &self.service)
            .field("guid", &self.writer.guid())
            .finish()
    }
}
