// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reader history cache with read/take semantics.
//!
//! # Architecture
//!
//! ```text
//! Buffer: [S0][S1][S2][S3][S4]   (insertion order = delivery order)
//!          ^                 ^
//!        oldest            newest
//!
//! push()  -> append; at depth, evict S0 first
//! read()  -> copy all, flip NOT_READ -> READ, keep entries
//! take()  -> move all out, buffer becomes empty
//! ```
//!
//! Each entry may hold a [`DeliveryTicket`]. The ticket is released the first
//! time the sample is consumed (read or taken) or when it is discarded
//! (evicted, cleared, cache dropped), which is how writers learn that their
//! samples were acknowledged.

use crate::sample::{SampleInfo, SampleState};
use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Maximum number of samples a cache keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryDepth {
    #[default]
    Unbounded,
    /// Keep the newest `n` samples, evicting the oldest first.
    KeepLast(NonZeroUsize),
}

impl HistoryDepth {
    /// `KeepLast(n)`, or `None` when `n == 0`.
    pub fn keep_last(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(HistoryDepth::KeepLast)
    }

    fn limit(self) -> Option<usize> {
        match self {
            HistoryDepth::Unbounded => None,
            HistoryDepth::KeepLast(n) => Some(n.get()),
        }
    }
}

/// Receiver side of a delivery ticket.
pub trait Acknowledge: Send + Sync {
    fn acknowledge(&self);
}

/// Released exactly once, when the sample is consumed or discarded.
pub struct DeliveryTicket(Arc<dyn Acknowledge>);

impl DeliveryTicket {
    pub fn new(target: Arc<dyn Acknowledge>) -> Self {
        Self(target)
    }
}

impl Drop for DeliveryTicket {
    fn drop(&mut self) {
        self.0.acknowledge();
    }
}

impl fmt::Debug for DeliveryTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeliveryTicket")
    }
}

/// One sample as handed to the application.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    data: Option<T>,
    info: SampleInfo,
}

impl<T> Sample<T> {
    pub fn new(data: Option<T>, info: SampleInfo) -> Self {
        Self { data, info }
    }

    /// Payload, `None` when `info.valid_data` is false.
    pub fn data(&self) -> Option<&T> {
        if self.info.valid_data {
            self.data.as_ref()
        } else {
            None
        }
    }

    pub fn info(&self) -> &SampleInfo {
        &self.info
    }

    pub fn is_valid(&self) -> bool {
        self.info.valid_data
    }

    pub fn into_parts(self) -> (Option<T>, SampleInfo) {
        (self.data, self.info)
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    data: Option<T>,
    info: SampleInfo,
    ticket: Option<DeliveryTicket>,
}

/// Bounded, insertion-ordered buffer of `(data, SampleInfo)` pairs.
#[derive(Debug)]
pub struct HistoryCache<T> {
    entries: VecDeque<CacheEntry<T>>,
    depth: HistoryDepth,
    total_received: u64,
    evicted: u64,
}

impl<T> HistoryCache<T> {
    pub fn new(depth: HistoryDepth) -> Self {
        let capacity = depth.limit().unwrap_or(16).min(1024);
        Self {
            entries: VecDeque::with_capacity(capacity),
            depth,
            total_received: 0,
            evicted: 0,
        }
    }

    pub fn depth(&self) -> HistoryDepth {
        self.depth
    }

    /// Append a sample, evicting the oldest one if the cache is full.
    ///
    /// Returns `true` when an entry was evicted.
    pub fn push(&mut self, data: Option<T>, info: SampleInfo, ticket: Option<DeliveryTicket>) -> bool {
        let mut evicted = false;
        if let Some(limit) = self.depth.limit() {
            while self.entries.len() >= limit {
                if let Some(old) = self.entries.pop_front() {
                    log::warn!(
                        "[HISTORY] depth {} reached, evicting seq={}",
                        limit,
                        old.info.identity.sequence_number
                    );
                    self.evicted += 1;
                    evicted = true;
                }
            }
        }

        self.entries.push_back(CacheEntry { data, info, ticket });
        self.total_received += 1;
        evicted
    }

    /// Remove and return every entry, oldest first.
    pub fn take(&mut self) -> Vec<Sample<T>> {
        self.entries
            .drain(..)
            .map(|entry| Sample::new(entry.data, entry.info))
            .collect()
    }

    /// Remove and return the entries matching `pred`, keeping the rest in order.
    pub fn take_where<F>(&mut self, mut pred: F) -> Vec<Sample<T>>
    where
        F: FnMut(&SampleInfo, Option<&T>) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if pred(&entry.info, entry.data.as_ref()) {
                taken.push(Sample::new(entry.data, entry.info));
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        taken
    }

    /// True if some entry matches `pred` (no state change).
    pub fn contains_where<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&SampleInfo, Option<&T>) -> bool,
    {
        self.entries
            .iter()
            .any(|entry| pred(&entry.info, entry.data.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries never returned by `read()`.
    pub fn unread_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.info.sample_state == SampleState::NotRead)
            .count()
    }

    /// Samples pushed since creation (including evicted ones).
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// Samples dropped by depth enforcement.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Discard every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> HistoryCache<T> {
    /// Copy every entry, oldest first, then mark them READ.
    ///
    /// The returned infos carry the state they had before this call.
    pub fn read(&mut self) -> Vec<Sample<T>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            out.push(Sample::new(entry.data.clone(), entry.info.clone()));
            entry.info.sample_state = SampleState::Read;
            entry.ticket = None;
        }
        out
    }
}

/// Snapshot returned by `read()`/`take()`.
///
/// Borrows its reader so the next `read()`/`take()` on the same reader can
/// only happen once this view is gone.
#[derive(Debug)]
pub struct Samples<'a, T> {
    entries: Vec<Sample<T>>,
    _reader: PhantomData<&'a mut ()>,
}

impl<'a, T> Samples<'a, T> {
    pub(crate) fn new(entries: Vec<Sample<T>>) -> Self {
        Self {
            entries,
            _reader: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample<T>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample<T>> {
        self.entries.iter()
    }

    /// Single-pass iterator over the samples with `valid_data == true`.
    pub fn valid_data(&self) -> ValidData<'_, T> {
        ValidData {
            inner: self.entries.iter(),
        }
    }

    /// Detach the samples from the reader borrow.
    pub fn into_vec(self) -> Vec<Sample<T>> {
        self.entries
    }
}

impl<'s, 'a, T> IntoIterator for &'s Samples<'a, T> {
    type Item = &'s Sample<T>;
    type IntoIter = std::slice::Iter<'s, Sample<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'a, T> std::ops::Index<usize> for Samples<'a, T> {
    type Output = Sample<T>;

    fn index(&self, index: usize) -> &Sample<T> {
        &self.entries[index]
    }
}

/// Lazy filter over a snapshot, skipping samples without valid data.
#[derive(Debug, Clone)]
pub struct ValidData<'s, T> {
    inner: std::slice::Iter<'s, Sample<T>>,
}

impl<'s, T> Iterator for ValidData<'s, T> {
    type Item = &'s Sample<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.by_ref().find(|s| s.is_valid())
    }
}

impl<T> FusedIterator for ValidData<'_, T> {}
