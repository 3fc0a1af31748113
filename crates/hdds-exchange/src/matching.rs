// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer/reader match registry.
//!
//! # Architecture
//!
//! ```text
//! MatchEngine<L>
//! +-- endpoints: HashMap<Guid, Entry<L>>
//!       +-- descriptor (kind, topic, name, reliability, enabled)
//!       +-- link: L             (payload handed back to callers)
//!       +-- peers: BTreeSet<Guid>
//!       +-- pending_delta: i32  (net matches - unmatches, consumed by waits)
//!       +-- status: MatchedStatus
//! ```
//!
//! The engine holds no locks; the owning domain serializes access. Operations
//! that change matches return the links of every affected endpoint so the caller
//! can wake their waits after releasing its lock.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::identity::Guid;

/// Delivery guarantee requested (readers) or offered (writers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    #[default]
    Reliable,
    BestEffort,
}

impl fmt::Display for Reliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reliability::Reliable => f.write_str("reliable"),
            Reliability::BestEffort => f.write_str("best_effort"),
        }
    }
}

/// Check QoS compatibility between writer and reader
///
/// - Reliable writer -> any reader: compatible
/// - BestEffort writer + BestEffort reader: compatible
/// - BestEffort writer + Reliable reader: INCOMPATIBLE
pub fn qos_compatible(writer: Reliability, reader: Reliability) -> bool {
    match (writer, reader) {
        (Reliability::Reliable, _) => true,
        (Reliability::BestEffort, Reliability::BestEffort) => true,
        (Reliability::BestEffort, Reliability::Reliable) => false,
    }
}

/// Kind of endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Reader,
    Writer,
}

impl EndpointKind {
    fn opposite(self) -> Self {
        match self {
            EndpointKind::Reader => EndpointKind::Writer,
            EndpointKind::Writer => EndpointKind::Reader,
        }
    }
}

/// What the engine needs to know about an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub guid: Guid,
    pub kind: EndpointKind,
    pub topic: String,
    pub name: Option<String>,
    pub reliability: Reliability,
    pub enabled: bool,
}

/// Peer as reported by `current_matches`.
///
/// Unnamed peers serialize with `"name": null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchedEndpoint {
    pub name: Option<String>,
    pub guid: Guid,
}

/// Cumulative match counters for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatchedStatus {
    /// Matches ever established
    pub total_count: u32,
    /// Matches alive right now
    pub current_count: u32,
    /// Change of `current_count` since the status was last retrieved
    pub current_count_change: i32,
}

#[derive(Debug)]
struct Entry<L> {
    descriptor: EndpointDescriptor,
    link: L,
    peers: BTreeSet<Guid>,
    pending_delta: i32,
    status: MatchedStatus,
}

impl<L> Entry<L> {
    fn matched(&mut self, peer: Guid) {
        if self.peers.insert(peer) {
            self.pending_delta += 1;
            self.status.total_count += 1;
            self.status.current_count += 1;
            self.status.current_count_change += 1;
        }
    }

    fn unmatched(&mut self, peer: &Guid) {
        if self.peers.remove(peer) {
            self.pending_delta -= 1;
            self.status.current_count = self.status.current_count.saturating_sub(1);
            self.status.current_count_change -= 1;
        }
    }
}

/// Registry of endpoints and their current matches.
#[derive(Debug)]
pub struct MatchEngine<L> {
    endpoints: HashMap<Guid, Entry<L>>,
}

impl<L> Default for MatchEngine<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> MatchEngine<L> {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn contains(&self, guid: &Guid) -> bool {
        self.endpoints.contains_key(guid)
    }

    pub fn descriptor(&self, guid: &Guid) -> Option<&EndpointDescriptor> {
        self.endpoints.get(guid).map(|e| &e.descriptor)
    }

    /// Net change since the last call; resets to 0.
    pub fn pending_delta(&mut self, guid: &Guid) -> i32 {
        self.endpoints
            .get_mut(guid)
            .map_or(0, |e| std::mem::take(&mut e.pending_delta))
    }

    /// Net change without consuming it.
    pub fn peek_pending_delta(&self, guid: &Guid) -> i32 {
        self.endpoints.get(guid).map_or(0, |e| e.pending_delta)
    }

    /// Current status; resets `current_count_change`.
    pub fn matched_status(&mut self, guid: &Guid) -> MatchedStatus {
        match self.endpoints.get_mut(guid) {
            Some(entry) => {
                let status = entry.status;
                entry.status.current_count_change = 0;
                status
            }
            None => MatchedStatus::default(),
        }
    }

    /// Descriptors of the peers currently matched with `guid`.
    pub fn current_matches(&self, guid: &Guid) -> Vec<MatchedEndpoint> {
        let Some(entry) = self.endpoints.get(guid) else {
            return Vec::new();
        };
        entry
            .peers
            .iter()
            .filter_map(|peer| self.endpoints.get(peer))
            .map(|peer| MatchedEndpoint {
                name: peer.descriptor.name.clone(),
                guid: peer.descriptor.guid,
            })
            .collect()
    }

    fn is_match(a: &EndpointDescriptor, b: &EndpointDescriptor) -> bool {
        if a.kind == b.kind || a.topic != b.topic || !a.enabled || !b.enabled {
            return false;
        }
        let (writer, reader) = match a.kind {
            EndpointKind::Writer => (a, b),
            EndpointKind::Reader => (b, a),
        };
        if !qos_compatible(writer.reliability, reader.reliability) {
            log::debug!(
                "[MATCH] Skipping bind: writer {} ({}) incompatible with reader {} ({})",
                writer.guid,
                writer.reliability,
                reader.guid,
                reader.reliability
            );
            return false;
        }
        true
    }

    /// Pair `guid` with every compatible peer it is not yet matched with.
    fn bind(&mut self, guid: Guid) -> Vec<Guid> {
        let Some(entry) = self.endpoints.get(&guid) else {
            return Vec::new();
        };
        let descriptor = entry.descriptor.clone();
        let wanted = descriptor.kind.opposite();

        let new_peers: Vec<Guid> = self
            .endpoints
            .values()
            .filter(|peer| peer.descriptor.kind == wanted)
            .filter(|peer| !peer.peers.contains(&guid))
            .filter(|peer| Self::is_match(&descriptor, &peer.descriptor))
            .map(|peer| peer.descriptor.guid)
            .collect();

        for peer in &new_peers {
            if let Some(p) = self.endpoints.get_mut(peer) {
                p.matched(guid);
            }
            if let Some(me) = self.endpoints.get_mut(&guid) {
                me.matched(*peer);
            }
            log::debug!(
                "[MATCH] {} <-> {} on topic '{}'",
                guid,
                peer,
                descriptor.topic
            );
        }
        new_peers
    }

    fn links_of(&self, guids: &[Guid]) -> Vec<L>
    where
        L: Clone,
    {
        guids
            .iter()
            .filter_map(|g| self.endpoints.get(g))
            .map(|e| e.link.clone())
            .collect()
    }

    /// Add an endpoint and match it against compatible peers.
    ///
    /// Returns the links of the peers that gained a match (the new endpoint is
    /// first when it matched anything).
    pub fn register(&mut self, descriptor: EndpointDescriptor, link: L) -> Vec<L>
    where
        L: Clone,
    {
        let guid = descriptor.guid;
        log::debug!(
            "[MATCH] register {:?} {} topic='{}' enabled={}",
            descriptor.kind,
            guid,
            descriptor.topic,
            descriptor.enabled
        );
        self.endpoints.insert(
            guid,
            Entry {
                descriptor,
                link,
                peers: BTreeSet::new(),
                pending_delta: 0,
                status: MatchedStatus::default(),
            },
        );
        self.notify_set(guid)
    }

    /// Mark an endpoint enabled and match it. No-op if already enabled.
    pub fn enable(&mut self, guid: &Guid) -> Vec<L>
    where
        L: Clone,
    {
        match self.endpoints.get_mut(guid) {
            Some(entry) if !entry.descriptor.enabled => entry.descriptor.enabled = true,
            _ => return Vec::new(),
        }
        self.notify_set(*guid)
    }

    fn notify_set(&mut self, guid: Guid) -> Vec<L>
    where
        L: Clone,
    {
        let peers = self.bind(guid);
        if peers.is_empty() {
            return Vec::new();
        }
        let mut affected = Vec::with_capacity(peers.len() + 1);
        affected.push(guid);
        affected.extend(peers);
        self.links_of(&affected)
    }

    /// Remove an endpoint, unmatching it from all peers.
    ///
    /// Returns the removed link and the links of the peers that lost a match.
    pub fn unregister(&mut self, guid: &Guid) -> Option<(L, Vec<L>)>
    where
        L: Clone,
    {
        let entry = self.endpoints.remove(guid)?;
        let peers: Vec<Guid> = entry.peers.iter().copied().collect();
        for peer in &peers {
            if let Some(p) = self.endpoints.get_mut(peer) {
                p.unmatched(guid);
            }
        }
        log::debug!(
            "[MATCH] unregister {} ({} peer(s) unmatched)",
            guid,
            peers.len()
        );
        Some((entry.link, self.links_of(&peers)))
    }

    /// Links of the peers currently matched with `guid`, in GUID order.
    pub fn matched_links(&self, guid: &Guid) -> Vec<L>
    where
        L: Clone,
    {
        match self.endpoints.get(guid) {
            Some(entry) => entry
                .peers
                .iter()
                .filter_map(|p| self.endpoints.get(p))
                .map(|p| p.link.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every registered descriptor (unordered).
    pub fn descriptors(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.values().map(|e| &e.descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ENTITY_KIND_READER, ENTITY_KIND_WRITER};

    fn desc(index: u32, kind: EndpointKind, topic: &str, name: Option<&str>) -> EndpointDescriptor {
        let entity = match kind {
            EndpointKind::Writer => ENTITY_KIND_WRITER,
            EndpointKind::Reader => ENTITY_KIND_READER,
        };
        EndpointDescriptor {
            guid: Guid::new([7; 12], [0; 4]).with_entity(index, entity),
            kind,
            topic: topic.to_string(),
            name: name.map(str::to_string),
            reliability: Reliability::Reliable,
            enabled: true,
        }
    }

    #[test]
    fn match_is_symmetric_and_counts_both_sides() {
        let mut engine = MatchEngine::new();
        let w = desc(1, EndpointKind::Writer, "Square", Some("W"));
        let r = desc(2, EndpointKind::Reader, "Square", None);

        assert!(engine.register(w.clone(), "w").is_empty());
        let affected = engine.register(r.clone(), "r");
        assert_eq!(affected, vec!["r", "w"]);

        assert_eq!(engine.pending_delta(&w.guid), 1);
        assert_eq!(engine.pending_delta(&w.guid), 0);
        assert_eq!(engine.pending_delta(&r.guid), 1);

        let seen_by_w = engine.current_matches(&w.guid);
        assert_eq!(seen_by_w, vec![MatchedEndpoint { name: None, guid: r.guid }]);
        let seen_by_r = engine.current_matches(&r.guid);
        assert_eq!(seen_by_r[0].name.as_deref(), Some("W"));
    }

    #[test]
    fn different_topics_do_not_match() {
        let mut engine = MatchEngine::new();
        let w = desc(1, EndpointKind::Writer, "Square", None);
        let r = desc(2, EndpointKind::Reader, "Circle", None);
        engine.register(w.clone(), ());
        engine.register(r, ());
        assert!(engine.current_matches(&w.guid).is_empty());
        assert_eq!(engine.peek_pending_delta(&w.guid), 0);
    }

    #[test]
    fn best_effort_writer_does_not_match_reliable_reader() {
        let mut engine = MatchEngine::new();
        let mut w = desc(1, EndpointKind::Writer, "T", None);
        w.reliability = Reliability::BestEffort;
        let r = desc(2, EndpointKind::Reader, "T", None);
        let mut r2 = desc(3, EndpointKind::Reader, "T", None);
        r2.reliability = Reliability::BestEffort;

        engine.register(w.clone(), ());
        engine.register(r, ());
        engine.register(r2.clone(), ());
        assert_eq!(
            engine.current_matches(&w.guid),
            vec![MatchedEndpoint { name: None, guid: r2.guid }]
        );
    }

    #[test]
    fn match_and_unmatch_coalesce_into_net_delta() {
        let mut engine = MatchEngine::new();
        let r = desc(1, EndpointKind::Reader, "T", None);
        let w1 = desc(2, EndpointKind::Writer, "T", None);
        let w2 = desc(3, EndpointKind::Writer, "T", None);

        engine.register(r.clone(), ());
        engine.register(w1.clone(), ());
        engine.register(w2.clone(), ());
        engine.unregister(&w1.guid);
        assert_eq!(engine.pending_delta(&r.guid), 1);

        engine.unregister(&w2.guid);
        assert_eq!(engine.pending_delta(&r.guid), -1);

        let status = engine.matched_status(&r.guid);
        assert_eq!(status.total_count, 2);
        assert_eq!(status.current_count, 0);
        assert_eq!(status.current_count_change, 0);
    }

    #[test]
    fn disabled_endpoint_matches_after_enable() {
        let mut engine = MatchEngine::new();
        let mut r = desc(1, EndpointKind::Reader, "T", None);
        r.enabled = false;
        let w = desc(2, EndpointKind::Writer, "T", None);

        engine.register(r.clone(), 1);
        engine.register(w.clone(), 2);
        assert!(engine.matched_links(&w.guid).is_empty());

        let affected = engine.enable(&r.guid);
        assert_eq!(affected, vec![1, 2]);
        assert_eq!(engine.matched_links(&w.guid), vec![1]);
        assert!(engine.enable(&r.guid).is_empty());
    }

    #[test]
    fn unregister_reports_lost_peers() {
        let mut engine = MatchEngine::new();
        let w = desc(1, EndpointKind::Writer, "T", None);
        let r = desc(2, EndpointKind::Reader, "T", None);
        engine.register(w.clone(), "w");
        engine.register(r.clone(), "r");

        let (link, peers) = engine.unregister(&w.guid).expect("registered");
        assert_eq!(link, "w");
        assert_eq!(peers, vec!["r"]);
        assert!(engine.unregister(&w.guid).is_none());

        let status = engine.matched_status(&r.guid);
        assert_eq!(status.current_count, 0);
        assert_eq!(status.current_count_change, 0);
        assert_eq!(status.total_count, 1);
    }
}
