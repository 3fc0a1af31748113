// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint GUIDs and sample identities.
//!
//! A [`SampleIdentity`] stamps every written sample with the writer's GUID and
//! a per-writer sequence number. Replies carry the request's identity as their
//! `related_identity`, which is how request/reply correlation works.
//!
//! # GUID Layout
//!
//! ```text
//! +------------------------------+-------------+
//! | prefix (12 bytes)            | entity (4)  |
//! | time(8) | pid^counter(4)     | kind+index  |
//! +------------------------------+-------------+
//! ```

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Entity kind byte for user writers (last byte of the entity id).
pub const ENTITY_KIND_WRITER: u8 = 0x02;
/// Entity kind byte for user readers (last byte of the entity id).
pub const ENTITY_KIND_READER: u8 = 0x07;
/// Entity kind byte for participants.
pub const ENTITY_KIND_PARTICIPANT: u8 = 0xC1;

/// Opaque 16-byte endpoint identifier.
///
/// # Display Format
/// Hex with dots: "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.02"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct Guid {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl Guid {
    /// Create GUID from separate prefix and entity ID.
    pub const fn new(prefix: [u8; 12], entity_id: [u8; 4]) -> Self {
        Self { prefix, entity_id }
    }

    /// Create GUID from raw bytes (16 bytes total).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut prefix = [0u8; 12];
        let mut entity_id = [0u8; 4];
        prefix.copy_from_slice(&bytes[0..12]);
        entity_id.copy_from_slice(&bytes[12..16]);
        Self { prefix, entity_id }
    }

    /// Convert GUID to 16-byte array.
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// All-zero GUID (placeholder).
    pub const fn zero() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    /// Check if GUID is zero.
    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }

    /// Derive the GUID of an entity living under this GUID's prefix.
    pub fn with_entity(&self, index: u32, kind: u8) -> Self {
        let idx = index.to_be_bytes();
        Self {
            prefix: self.prefix,
            entity_id: [idx[1], idx[2], idx[3], kind],
        }
    }

    /// Entity kind byte (see `ENTITY_KIND_*`).
    pub fn entity_kind(&self) -> u8 {
        self.entity_id[3]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Generate a fresh participant GUID prefix.
///
/// Timestamp + process id, mixed with a process-local counter so two
/// participants created in the same nanosecond still differ.
pub fn generate_guid_prefix() -> [u8; 12] {
    static COUNTER: AtomicU32 = AtomicU32::new(1);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let salt = std::process::id() ^ COUNTER.fetch_add(1, Ordering::Relaxed).rotate_left(16);

    let mut prefix = [0u8; 12];
    prefix[0..8].copy_from_slice(&nanos.to_be_bytes());
    prefix[8..12].copy_from_slice(&salt.to_be_bytes());
    prefix
}

/// Unique identifier of one written sample: writer GUID + sequence number.
///
/// Equality is structural: both fields must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SampleIdentity {
    /// GUID of the writer that produced the sample
    pub writer_guid: Guid,
    /// Sequence number assigned by the writer (starts at 0)
    pub sequence_number: u64,
}

impl SampleIdentity {
    /// Create a new SampleIdentity.
    pub const fn new(writer_guid: Guid, sequence_number: u64) -> Self {
        Self {
            writer_guid,
            sequence_number,
        }
    }
}

impl fmt::Display for SampleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.writer_guid, self.sequence_number)
    }
}

/// Per-writer identity source.
///
/// The counter starts at 0 and never resets while the generator exists.
#[derive(Debug)]
pub struct IdentityGenerator {
    writer_guid: Guid,
    counter: AtomicU64,
}

impl IdentityGenerator {
    pub fn new(writer_guid: Guid) -> Self {
        Self {
            writer_guid,
            counter: AtomicU64::new(0),
        }
    }

    /// Stamp the next identity.
    pub fn next(&self) -> SampleIdentity {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        SampleIdentity::new(self.writer_guid, seq)
    }

    /// Number of identities handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn writer_guid(&self) -> Guid {
        self.writer_guid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generator_starts_at_zero_and_increments() {
        let guid = Guid::new([7; 12], [0, 0, 1, ENTITY_KIND_WRITER]);
        let gen = IdentityGenerator::new(guid);

        let a = gen.next();
        let b = gen.next();
        assert_eq!(a.sequence_number, 0);
        assert_eq!(b.sequence_number, 1);
        assert_eq!(a.writer_guid, guid);
        assert_eq!(gen.issued(), 2);
    }

    #[test]
    fn identity_equality_is_structural() {
        let g1 = Guid::new([1; 12], [0, 0, 1, 2]);
        let g2 = Guid::new([2; 12], [0, 0, 1, 2]);

        assert_eq!(SampleIdentity::new(g1, 5), SampleIdentity::new(g1, 5));
        assert_ne!(SampleIdentity::new(g1, 5), SampleIdentity::new(g1, 6));
        assert_ne!(SampleIdentity::new(g1, 5), SampleIdentity::new(g2, 5));

        let mut set = HashSet::new();
        set.insert(SampleIdentity::new(g1, 5));
        assert!(set.contains(&SampleIdentity::new(g1, 5)));
    }

    #[test]
    fn guid_display_and_bytes() {
        let guid = Guid::from_bytes([1, 15, 172, 16, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 2]);
        assert_eq!(guid.to_string(), "01.0f.ac.10.00.00.00.00.00.00.00.01.00.00.01.02");
        assert_eq!(Guid::from_bytes(guid.as_bytes()), guid);
        assert!(Guid::zero().is_zero());
    }

    #[test]
    fn prefixes_are_unique() {
        let a = generate_guid_prefix();
        let b = generate_guid_prefix();
        assert_ne!(a, b);
    }

    #[test]
    fn with_entity_keeps_prefix() {
        let participant = Guid::new([9; 12], [0, 0, 0, ENTITY_KIND_PARTICIPANT]);
        let writer = participant.with_entity(3, ENTITY_KIND_WRITER);
        assert_eq!(writer.prefix, participant.prefix);
        assert_eq!(writer.entity_id, [0, 0, 3, ENTITY_KIND_WRITER]);
        assert_eq!(writer.entity_kind(), ENTITY_KIND_WRITER);
    }
}
