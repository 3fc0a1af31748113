// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Exchange - in-process sample exchange core
//!
//! Writers and readers bound to topics, matched inside a [`Domain`], exchanging
//! structured samples through per-reader history caches, with single-flight
//! waits and identity-based request/reply correlation.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_exchange::{Domain, EndpointConfig, Participant, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let domain = Domain::standalone(0);
//!     let participant = Participant::new(&domain, "shapes")?;
//!
//!     let mut writer = participant.create_writer_with(None, &EndpointConfig::new("Square"))?;
//!     let mut reader = participant.create_reader_with(None, &EndpointConfig::new("Square"))?;
//!
//!     writer.instance_mut().set_number("x", 1.0)?;
//!     writer.write()?;
//!     writer.instance_mut().set_number("x", 2.0)?;
//!     writer.write()?;
//!
//!     reader.wait(Some(Duration::from_secs(1)))?;
//!     let samples = reader.take()?;
//!     assert_eq!(samples.len(), 2);
//!     assert_eq!(samples[1].info().identity.sequence_number, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Participant -> Writer / Reader        rpc::Requester/Replier |
//! +---------------------------------------------------------------+
//! |  WaitCoordinator (single-flight, timeout, cancel-on-close)    |
//! +---------------------------------------------------------------+
//! |  Domain: MatchEngine (topic + reliability, net match deltas)  |
//! +---------------------------------------------------------------+
//! |  HistoryCache (read/take, FIFO eviction) | SampleInfo | Guid  |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExchangeConfig`] | Types and named endpoint bindings (YAML/JSON) |
//! | [`Domain`] | Matching scope shared by participants |
//! | [`Participant`] | Groups endpoints, owns their lifecycle |
//! | [`Writer`] | Publishes [`DynamicData`] samples |
//! | [`Reader`] | Caches and returns samples with [`SampleInfo`] |
//! | [`rpc::Requester`] / [`rpc::Replier`] | Request/reply over `rq/`/`rr/` topics |
//!
//! ## Features
//!
//! - `async` (default): `*_async` wait variants built on `tokio`.

pub mod config;
pub mod data;
pub mod domain;
mod endpoint;
pub mod error;
pub mod history;
pub mod identity;
pub mod listener;
pub mod matching;
pub mod participant;
pub mod reader;
pub mod rpc;
pub mod sample;
pub mod wait;
pub mod writer;

pub use config::{EndpointConfig, ExchangeConfig, ParticipantConfig};
pub use data::{DynamicData, FieldKind, FieldPath, StructSchema, TypeSchema};
pub use domain::{Domain, DomainId};
pub use error::{Error, Result};
pub use history::{HistoryCache, HistoryDepth, Sample, Samples, ValidData};
pub use identity::{Guid, IdentityGenerator, SampleIdentity};
pub use listener::{DataAvailable, ListenerHandle};
pub use matching::{EndpointKind, MatchEngine, MatchedEndpoint, MatchedStatus, Reliability};
pub use participant::Participant;
pub use reader::{HistoryStats, Reader};
pub use sample::{
    InstanceHandle, InstanceState, SampleInfo, SampleState, ViewState, WriteAction, WriteParams,
};
pub use writer::Writer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
