// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-sample metadata and write parameters.

use crate::error::{Error, Result};
use crate::identity::SampleIdentity;
use serde::Serialize;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

/// Whether the reader has seen this instance before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewState {
    New,
    NotNew,
}

/// Lifecycle of the instance a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Alive,
    Disposed,
    NoWriters,
}

impl InstanceState {
    pub fn is_alive(self) -> bool {
        self == InstanceState::Alive
    }
}

/// Sample state (NOT_READ until a `read()` returns it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SampleState {
    Read,
    NotRead,
}

/// What a write call does to its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    #[default]
    Write,
    Dispose,
    Unregister,
}

impl WriteAction {
    /// Only plain writes carry data.
    pub fn carries_data(self) -> bool {
        self == WriteAction::Write
    }

    pub fn instance_state(self) -> InstanceState {
        match self {
            WriteAction::Write => InstanceState::Alive,
            WriteAction::Dispose => InstanceState::Disposed,
            WriteAction::Unregister => InstanceState::NoWriters,
        }
    }
}

impl FromStr for WriteAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "write" => Ok(WriteAction::Write),
            "dispose" => Ok(WriteAction::Dispose),
            "unregister" => Ok(WriteAction::Unregister),
            other => Err(Error::InvalidValue(format!(
                "unknown write action '{}' (expected write, dispose or unregister)",
                other
            ))),
        }
    }
}

/// 16-byte instance handle (MD5 of the key fields, all zeros for keyless types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstanceHandle(pub [u8; 16]);

impl InstanceHandle {
    pub const fn nil() -> Self {
        Self([0u8; 16])
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl Serialize for InstanceHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let hex: String = self.0.iter().map(|b| format!("{:02x}", b)).collect();
        serializer.serialize_str(&hex)
    }
}

/// Metadata attached to every cached sample.
///
/// Created together with the sample; afterwards only `sample_state` changes
/// (NOT_READ -> READ on `read()`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleInfo {
    pub source_timestamp: i64,
    pub reception_timestamp: i64,
    pub identity: SampleIdentity,
    /// Identity of the sample this one answers (replies), `null` otherwise.
    pub related_identity: Option<SampleIdentity>,
    pub valid_data: bool,
    pub view_state: ViewState,
    pub instance_state: InstanceState,
    pub sample_state: SampleState,
    pub instance_handle: InstanceHandle,
}

/// Optional overrides for a single write call.
///
/// # Example
///
/// ```rust
/// use hdds_exchange::{WriteAction, WriteParams};
///
/// let params = WriteParams::new()
///     .action(WriteAction::Dispose)
///     .source_timestamp(1_000);
/// assert_eq!(params.action, WriteAction::Dispose);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteParams {
    pub action: WriteAction,
    /// Defaults to the current time.
    pub source_timestamp: Option<i64>,
    /// Defaults to a freshly generated identity.
    pub identity: Option<SampleIdentity>,
    pub related_identity: Option<SampleIdentity>,
}

impl WriteParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn action(mut self, action: WriteAction) -> Self {
        self.action = action;
        self
    }

    #[must_use]
    pub fn source_timestamp(mut self, ns: i64) -> Self {
        self.source_timestamp = Some(ns);
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: SampleIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn related_identity(mut self, identity: SampleIdentity) -> Self {
        self.related_identity = Some(identity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_maps_to_instance_state() {
        assert_eq!(WriteAction::Write.instance_state(), InstanceState::Alive);
        assert_eq!(WriteAction::Dispose.instance_state(), InstanceState::Disposed);
        assert_eq!(WriteAction::Unregister.instance_state(), InstanceState::NoWriters);
        assert!(WriteAction::Write.carries_data());
        assert!(!WriteAction::Dispose.carries_data());
    }

    #[test]
    fn action_parses_from_str() {
        assert_eq!("dispose".parse::<WriteAction>().ok(), Some(WriteAction::Dispose));
        assert!(matches!(
            "explode".parse::<WriteAction>(),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn info_serializes_absent_related_identity_as_null() {
        let info = SampleInfo {
            source_timestamp: 1,
            reception_timestamp: 2,
            identity: SampleIdentity::default(),
            related_identity: None,
            valid_data: true,
            view_state: ViewState::New,
            instance_state: InstanceState::Alive,
            sample_state: SampleState::NotRead,
            instance_handle: InstanceHandle::nil(),
        };
        let json = serde_json::to_value(&info).expect("serialize");
        assert!(json["related_identity"].is_null());
        assert_eq!(json["sample_state"], "NOT_READ");
        assert_eq!(json["instance_state"], "ALIVE");
    }
}
