// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Exchange configuration document.
//!
//! Declares the data types and, per participant, the named writers and readers
//! an application may create. Loaded once and shared by `Arc`.
//!
//! # Example YAML
//!
//! ```yaml
//! types:
//!   ShapeType:
//!     key: [color]
//!     fields:
//!       color: string
//!       x: integer
//!       y: integer
//!
//! participant_libraries:
//!   ShapesLibrary:
//!     Publisher:
//!       writers:
//!         ShapePublisher::SquareWriter:
//!           topic: Square
//!           type: ShapeType
//!     Subscriber:
//!       readers:
//!         ShapeSubscriber::SquareReader:
//!           topic: Square
//!           type: ShapeType
//!           reliability: best_effort
//!           history_depth: 16
//! ```
//!
//! Files ending in `.json` are parsed as JSON, anything else as YAML.

use crate::data::{StructSchema, TypeSchema};
use crate::error::{Error, Result};
use crate::history::HistoryDepth;
use crate::matching::Reliability;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// One named writer or reader binding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub topic: String,

    /// Name of an entry under `types:`; absent means schemaless payloads.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,

    #[serde(default)]
    pub reliability: Reliability,

    /// Absent means unbounded.
    #[serde(default)]
    pub history_depth: Option<usize>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl EndpointConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            type_name: None,
            reliability: Reliability::default(),
            history_depth: None,
            enabled: true,
        }
    }

    #[must_use]
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    #[must_use]
    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn depth(&self) -> Result<HistoryDepth> {
        match self.history_depth {
            None => Ok(HistoryDepth::Unbounded),
            Some(n) => HistoryDepth::keep_last(n).ok_or_else(|| {
                Error::Configuration(format!(
                    "topic '{}': history_depth must be at least 1",
                    self.topic
                ))
            }),
        }
    }
}

/// Writers and readers declared for one participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    #[serde(default)]
    pub writers: BTreeMap<String, EndpointConfig>,
    #[serde(default)]
    pub readers: BTreeMap<String, EndpointConfig>,
}

impl ParticipantConfig {
    pub fn writer(&self, name: &str) -> Result<&EndpointConfig> {
        self.writers
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("unknown writer '{}'", name)))
    }

    pub fn reader(&self, name: &str) -> Result<&EndpointConfig> {
        self.readers
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("unknown reader '{}'", name)))
    }

    #[must_use]
    pub fn with_writer(mut self, name: impl Into<String>, endpoint: EndpointConfig) -> Self {
        self.writers.insert(name.into(), endpoint);
        self
    }

    #[must_use]
    pub fn with_reader(mut self, name: impl Into<String>, endpoint: EndpointConfig) -> Self {
        self.readers.insert(name.into(), endpoint);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    #[serde(default)]
    key: Vec<String>,
    #[serde(default)]
    fields: StructSchema,
}

/// Root document structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    types: BTreeMap<String, RawType>,
    #[serde(default)]
    participant_libraries: BTreeMap<String, BTreeMap<String, ParticipantConfig>>,
}

/// Validated, immutable configuration.
#[derive(Debug, Clone, Default)]
pub struct ExchangeConfig {
    types: BTreeMap<String, Arc<TypeSchema>>,
    libraries: BTreeMap<String, BTreeMap<String, ParticipantConfig>>,
}

impl ExchangeConfig {
    /// Empty configuration (no types, no participants).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML or JSON file (by extension).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read '{}': {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        log::debug!("[CONFIG] loading {}", path.display());
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("YAML parse error: {}", e)))?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("JSON parse error: {}", e)))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let mut config = Self::new();
        for (name, ty) in raw.types {
            let schema = TypeSchema::new(name, ty.fields).with_key(ty.key);
            config = config.with_type(schema)?;
        }
        config.libraries = raw.participant_libraries;
        config.validate()?;
        log::info!(
            "[CONFIG] loaded {} type(s), {} participant(s)",
            config.types.len(),
            config.participant_names().len()
        );
        Ok(config)
    }

    /// Add a type definition.
    pub fn with_type(mut self, schema: TypeSchema) -> Result<Self> {
        schema.validate()?;
        self.types.insert(schema.name.clone(), Arc::new(schema));
        Ok(self)
    }

    /// Add a participant under `"Library::Participant"`.
    pub fn with_participant(mut self, qualified: &str, participant: ParticipantConfig) -> Result<Self> {
        let (library, name) = split_qualified(qualified)?;
        self.libraries
            .entry(library.to_string())
            .or_default()
            .insert(name.to_string(), participant);
        self.validate()?;
        Ok(self)
    }

    /// Every endpoint must reference a declared type and a usable depth.
    pub fn validate(&self) -> Result<()> {
        for (library, participants) in &self.libraries {
            for (participant, config) in participants {
                let endpoints = config.writers.iter().chain(config.readers.iter());
                for (endpoint, binding) in endpoints {
                    if binding.topic.is_empty() {
                        return Err(Error::Configuration(format!(
                            "{}::{}: endpoint '{}' has an empty topic",
                            library, participant, endpoint
                        )));
                    }
                    if let Some(type_name) = &binding.type_name {
                        if !self.types.contains_key(type_name) {
                            return Err(Error::Configuration(format!(
                                "{}::{}: endpoint '{}' references unknown type '{}'",
                                library, participant, endpoint, type_name
                            )));
                        }
                    }
                    binding.depth()?;
                }
            }
        }
        Ok(())
    }

    /// Resolve `"Library::Participant"`.
    pub fn participant(&self, qualified: &str) -> Result<&ParticipantConfig> {
        let (library, name) = split_qualified(qualified)?;
        self.libraries
            .get(library)
            .ok_or_else(|| Error::Configuration(format!("unknown participant library '{}'", library)))?
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("unknown participant '{}'", qualified)))
    }

    /// Qualified names of every declared participant, sorted.
    pub fn participant_names(&self) -> Vec<String> {
        self.libraries
            .iter()
            .flat_map(|(library, participants)| {
                participants
                    .keys()
                    .map(move |name| format!("{}::{}", library, name))
            })
            .collect()
    }

    pub fn type_schema(&self, name: &str) -> Result<Arc<TypeSchema>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("unknown type '{}'", name)))
    }

    /// Schema for an endpoint binding (`None` when it declares no type).
    pub fn schema_for(&self, binding: &EndpointConfig) -> Result<Option<Arc<TypeSchema>>> {
        binding
            .type_name
            .as_deref()
            .map(|name| self.type_schema(name))
            .transpose()
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeSchema>> {
        self.types.values()
    }
}

fn split_qualified(qualified: &str) -> Result<(&str, &str)> {
    match qualified.split_once("::") {
        Some((library, name)) if !library.is_empty() && !name.is_empty() => Ok((library, name)),
        _ => Err(Error::Configuration(format!(
            "participant name '{}' must be 'Library::Participant'",
            qualified
        ))),
    }
}
