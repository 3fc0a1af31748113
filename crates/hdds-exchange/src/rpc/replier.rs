// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Replier: receives requests and answers them.

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

/// Server side of a service.
pub struct Replier {
    service: String,
    reader: Reader,
    writer: Writer,
}

impl Replier {
    pub fn new(participant: &Participant, service: &str) -> Result<Self> {
        Self::with_types(participant, service, None, None)
    }

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

        let name = format!("{}::Replier", service);
        let reader = participant.create_reader_with(Some(&name), &request)?;
        let writer = participant.create_writer_with(Some(&name), &reply)?;
        log::info!("[RPC] replier for '{}' ready ({})", service, writer.guid());
        Ok(Self {
            service: service.to_string(),
            reader,
            writer,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn guid(&self) -> Guid {
        self.writer.guid()
    }

    /// Wait for pending requests and take them all, oldest first.
    ///
    /// Each sample's `info().identity` is what [`send_reply`](Self::send_reply)
    /// needs.
    pub fn receive_requests(&mut self, timeout: Option<Duration>) -> Result<Vec<Sample<DynamicData>>> {
        self.reader.wait(timeout)?;
        Ok(self.reader.take()?.into_vec())
    }

    #[cfg(feature = "async")]
    pub async fn receive_requests_async(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Vec<Sample<DynamicData>>> {
        self.reader.wait_async(timeout).await?;
        Ok(self.reader.take()?.into_vec())
    }

    /// Answer the request identified by `request`.
    pub fn send_reply(&self, request: &SampleIdentity, payload: &Value) -> Result<SampleIdentity> {
        let id = self
            .writer
            .write_json(payload, WriteParams::new().related_identity(*request))?;
        log::debug!("[RPC] '{}' reply {} -> request {}", self.service, id, request);
        Ok(id)
    }

    pub fn send_reply_data(&self, request: &SampleIdentity, payload: &DynamicData) -> Result<SampleIdentity> {
        self.writer
            .write_data(payload, WriteParams::new().related_identity(*request))
    }

    /// Block until the set of matched requesters changed.
    pub fn wait_for_requesters(&self, timeout: Option<Duration>) -> Result<i32> {
        self.reader.wait_for_publications(timeout)
    }

    pub fn matched_requesters(&self) -> Result<Vec<MatchedEndpoint>> {
        self.reader.matched_publications()
    }

    pub fn close(&self) {
        self.reader.close();
        self.writer.close();
    }
}

impl std::fmt::Debug for Replier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replier")
            .field("service", &self.service)
            .field("guid", &self.writer.guid())
            .finish()
    }
}
