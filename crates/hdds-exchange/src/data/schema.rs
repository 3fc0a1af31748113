// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural type descriptions used to validate payloads.
//!
//! # Example YAML
//!
//! ```yaml
//! ShapeType:
//!   key: [color]
//!   fields:
//!     color: string
//!     x: integer
//!     tags: { sequence: string }
//!     origin: { struct: { lat: number, lon: number } }
//! ```

use super::path::{display_segments, Segment};
use crate::error::{Error, Result};
use crate::sample::InstanceHandle;
use md5::{Digest, Md5};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a single member.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawKind")]
pub enum FieldKind {
    /// Any JSON number.
    Number,
    /// Whole number (i64/u64 range).
    Integer,
    String,
    Boolean,
    /// Unchecked value.
    Any,
    Sequence(Box<FieldKind>),
    Struct(StructSchema),
}

/// Ordered member set of a struct.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct StructSchema {
    pub members: BTreeMap<String, FieldKind>,
}

/// Named top-level type with optional key members.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    pub name: String,
    pub key: Vec<String>,
    pub root: StructSchema,
}

static ANY_KIND: FieldKind = FieldKind::Any;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKind {
    Simple(String),
    Sequence { sequence: Box<RawKind> },
    Struct {
        #[serde(rename = "struct")]
        members: BTreeMap<String, RawKind>,
    },
}

impl TryFrom<RawKind> for FieldKind {
    type Error = String;

    fn try_from(raw: RawKind) -> std::result::Result<Self, String> {
        match raw {
            RawKind::Simple(name) => match name.as_str() {
                "number" | "double" | "float" => Ok(FieldKind::Number),
                "integer" | "long" | "int" => Ok(FieldKind::Integer),
                "string" => Ok(FieldKind::String),
                "boolean" | "bool" => Ok(FieldKind::Boolean),
                "any" => Ok(FieldKind::Any),
                other => Err(format!("unknown field kind '{}'", other)),
            },
            RawKind::Sequence { sequence } => {
                Ok(FieldKind::Sequence(Box::new(FieldKind::try_from(*sequence)?)))
            }
            RawKind::Struct { members } => {
                let mut out = BTreeMap::new();
                for (name, kind) in members {
                    out.insert(name, FieldKind::try_from(kind)?);
                }
                Ok(FieldKind::Struct(StructSchema { members: out }))
            }
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Number => write!(f, "number"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::String => write!(f, "string"),
            FieldKind::Boolean => write!(f, "boolean"),
            FieldKind::Any => write!(f, "any"),
            FieldKind::Sequence(inner) => write!(f, "sequence<{}>", inner),
            FieldKind::Struct(_) => write!(f, "struct"),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "struct",
    }
}

impl FieldKind {
    /// Value a member takes when it is cleared or absent.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Number | FieldKind::Integer => Value::from(0),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::Any => Value::Null,
            FieldKind::Sequence(_) => Value::Array(Vec::new()),
            FieldKind::Struct(schema) => schema.default_value(),
        }
    }

    /// Check `value` against this kind and fill absent struct members with defaults.
    pub(crate) fn normalize(&self, value: &Value, at: &[Segment]) -> Result<Value> {
        let mismatch = || {
            Error::TypeMismatch(format!(
                "field '{}' expects {}, got {}",
                display_segments(at),
                self,
                json_kind(value)
            ))
        };

        match (self, value) {
            (FieldKind::Any, v) => Ok(v.clone()),
            (FieldKind::Number, Value::Number(_)) => Ok(value.clone()),
            (FieldKind::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Ok(value.clone())
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(Value::from(f as i64))
                        }
                        _ => Err(mismatch()),
                    }
                }
            }
            (FieldKind::String, Value::String(_)) => Ok(value.clone()),
            (FieldKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (FieldKind::Sequence(inner), Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                let mut path = at.to_vec();
                for (i, item) in items.iter().enumerate() {
                    path.push(Segment::Index(i));
                    out.push(inner.normalize(item, &path)?);
                    path.pop();
                }
                Ok(Value::Array(out))
            }
            (FieldKind::Struct(schema), Value::Object(map)) => schema.normalize_object(map, at),
            _ => Err(mismatch()),
        }
    }
}

impl StructSchema {
    pub fn default_value(&self) -> Value {
        let map: Map<String, Value> = self
            .members
            .iter()
            .map(|(name, kind)| (name.clone(), kind.default_value()))
            .collect();
        Value::Object(map)
    }

    fn normalize_object(&self, map: &Map<String, Value>, at: &[Segment]) -> Result<Value> {
        let mut path = at.to_vec();
        for name in map.keys() {
            if !self.members.contains_key(name) {
                path.push(Segment::Member(name.clone()));
                return Err(Error::InvalidValue(format!(
                    "unknown member '{}'",
                    display_segments(&path)
                )));
            }
        }

        let mut out = Map::new();
        for (name, kind) in &self.members {
            let normalized = match map.get(name) {
                Some(v) => {
                    path.push(Segment::Member(name.clone()));
                    let n = kind.normalize(v, &path)?;
                    path.pop();
                    n
                }
                None => kind.default_value(),
            };
            out.insert(name.clone(), normalized);
        }
        Ok(Value::Object(out))
    }

    /// Kinds reached after each segment of `segments`.
    ///
    /// Unknown members are `InvalidValue`; indexing a non-sequence or
    /// descending into a non-struct is `TypeMismatch`.
    pub(crate) fn resolve<'a>(&'a self, segments: &[Segment]) -> Result<Vec<&'a FieldKind>> {
        let mut chain: Vec<&'a FieldKind> = Vec::with_capacity(segments.len());
        let mut current: Option<&'a FieldKind> = None;

        for (i, seg) in segments.iter().enumerate() {
            let next = match (current, seg) {
                (None, Segment::Member(name)) => self.member(name, &segments[..=i])?,
                (Some(FieldKind::Struct(inner)), Segment::Member(name)) => {
                    inner.member(name, &segments[..=i])?
                }
                (Some(FieldKind::Sequence(elem)), Segment::Index(_)) => elem.as_ref(),
                (Some(FieldKind::Any), _) => &ANY_KIND,
                (Some(kind), _) => {
                    return Err(Error::TypeMismatch(format!(
                        "field '{}' is a {}, cannot access '{}'",
                        display_segments(&segments[..i]),
                        kind,
                        display_segments(&segments[..=i])
                    )))
                }
                (None, Segment::Index(_)) => {
                    return Err(Error::InvalidValue("path cannot start with an index".into()))
                }
            };
            chain.push(next);
            current = Some(next);
        }

        Ok(chain)
    }

    fn member<'a>(&'a self, name: &str, at: &[Segment]) -> Result<&'a FieldKind> {
        self.members.get(name).ok_or_else(|| {
            Error::InvalidValue(format!("unknown member '{}'", display_segments(at)))
        })
    }
}

impl TypeSchema {
    pub fn new(name: impl Into<String>, root: StructSchema) -> Self {
        Self {
            name: name.into(),
            key: Vec::new(),
            root,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: Vec<String>) -> Self {
        self.key = key;
        self
    }

    /// Check key members exist.
    pub fn validate(&self) -> Result<()> {
        for key in &self.key {
            if !self.root.members.contains_key(key) {
                return Err(Error::Configuration(format!(
                    "type '{}' declares key '{}' which is not a member",
                    self.name, key
                )));
            }
        }
        Ok(())
    }

    pub fn default_value(&self) -> Value {
        self.root.default_value()
    }

    /// Validate a whole payload and fill absent members with defaults.
    pub fn normalize(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => self.root.normalize_object(map, &[]),
            other => Err(Error::TypeMismatch(format!(
                "payload of type '{}' must be a struct, got {}",
                self.name,
                json_kind(other)
            ))),
        }
    }

    /// Instance handle from the key members (nil when keyless).
    pub fn instance_handle(&self, value: &Value) -> InstanceHandle {
        if self.key.is_empty() {
            return InstanceHandle::nil();
        }
        let mut hasher = Md5::new();
        for key in &self.key {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            let member = value.get(key).unwrap_or(&Value::Null);
            hasher.update(member.to_string().as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        InstanceHandle(bytes)
    }
}
