// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured sample payload with field-level access.
//!
//! A [`DynamicData`] is a record of named members (numbers, strings, booleans,
//! nested records, sequences) stored as a JSON value. When bound to a
//! [`TypeSchema`] every mutation is checked against it.

use super::path::{display_segments, FieldPath, Segment};
use super::schema::TypeSchema;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::sync::Arc;

/// Structured payload (a JSON object), optionally schema-checked.
///
/// # Example
///
/// ```rust
/// use hdds_exchange::DynamicData;
///
/// let mut data = DynamicData::new();
/// data.set_number("x", 10.0)?;
/// data.set_string("color", "BLUE")?;
/// data.set_number("path[1]", 3.0)?;
/// assert_eq!(data.get_number("x")?, Some(10.0));
/// assert_eq!(data.to_json()["path"], serde_json::json!([null, 3]));
/// # Ok::<(), hdds_exchange::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DynamicData {
    value: Value,
    schema: Option<Arc<TypeSchema>>,
}

impl Default for DynamicData {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DynamicData {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Serialize for DynamicData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl DynamicData {
    /// Empty schemaless record.
    pub fn new() -> Self {
        Self {
            value: Value::Object(Map::new()),
            schema: None,
        }
    }

    /// Record holding every member of `schema` at its default value.
    pub fn with_schema(schema: Arc<TypeSchema>) -> Self {
        Self {
            value: schema.default_value(),
            schema: Some(schema),
        }
    }

    /// Build from a JSON object, validating against `schema` when given.
    pub fn from_json(value: Value, schema: Option<Arc<TypeSchema>>) -> Result<Self> {
        let value = match (&schema, value) {
            (Some(schema), value) => schema.normalize(&value)?,
            (None, value @ Value::Object(_)) => value,
            (None, other) => {
                return Err(Error::TypeMismatch(format!(
                    "payload must be a struct (JSON object), got {}",
                    other
                )))
            }
        };
        Ok(Self { value, schema })
    }

    /// Serialize any `serde` value into a record.
    pub fn from_serialize<S: Serialize>(
        payload: &S,
        schema: Option<Arc<TypeSchema>>,
    ) -> Result<Self> {
        let value = serde_json::to_value(payload)?;
        Self::from_json(value, schema)
    }

    pub fn schema(&self) -> Option<&Arc<TypeSchema>> {
        self.schema.as_ref()
    }

    pub fn to_json(&self) -> &Value {
        &self.value
    }

    pub fn into_json(self) -> Value {
        self.value
    }

    /// Deserialize the record into a typed value.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D> {
        serde_json::from_value(self.value.clone()).map_err(Error::from)
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    /// Value at `path`, `None` when absent.
    pub fn get(&self, path: &str) -> Result<Option<&Value>> {
        let path = FieldPath::parse(path)?;
        if let Some(schema) = &self.schema {
            schema.root.resolve(path.segments())?;
        }

        let mut cur = &self.value;
        for seg in path.segments() {
            let next = match (seg, cur) {
                (Segment::Member(name), Value::Object(map)) => map.get(name),
                (Segment::Index(i), Value::Array(items)) => items.get(*i),
                _ => None,
            };
            match next {
                Some(v) => cur = v,
                None => return Ok(None),
            }
        }
        Ok(Some(cur))
    }

    pub fn get_number(&self, path: &str) -> Result<Option<f64>> {
        match self.get(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(kind_error(path, "number", other)),
        }
    }

    pub fn get_string(&self, path: &str) -> Result<Option<String>> {
        match self.get(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(kind_error(path, "string", other)),
        }
    }

    pub fn get_boolean(&self, path: &str) -> Result<Option<bool>> {
        match self.get(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(kind_error(path, "boolean", other)),
        }
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Set the member at `path`, creating intermediate records and growing
    /// sequences as needed.
    ///
    /// Indices at or above [`MAX_SEQUENCE_LEN`] are rejected with
    /// `InvalidValue` and leave the value untouched.
    pub fn set_value(&mut self, path: &str, value: Value) -> Result<()> {
        let path = FieldPath::parse(path)?;
        let (value, fillers) = match &self.schema {
            Some(schema) => {
                let chain = schema.root.resolve(path.segments())?;
                let leaf = chain
                    .last()
                    .copied()
                    .ok_or_else(|| Error::InvalidValue("empty field name".into()))?;
                let value = leaf.normalize(&value, path.segments())?;
                let fillers: Vec<Value> = chain.iter().map(|k| k.default_value()).collect();
                (value, Some(fillers))
            }
            None => (value, None),
        };

        let slot = slot_mut(&mut self.value, path.segments(), fillers.as_deref())?;
        *slot = value;
        Ok(())
    }

    pub fn set_number(&mut self, path: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidValue(format!(
                "field '{}' cannot hold non-finite number {}",
                path, value
            )));
        }
        let number = if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Number::from(value as i64)
        } else {
            Number::from_f64(value)
                .ok_or_else(|| Error::InvalidValue(format!("unrepresentable number {}", value)))?
        };
        self.set_value(path, Value::Number(number))
    }

    pub fn set_string(&mut self, path: &str, value: impl Into<String>) -> Result<()> {
        self.set_value(path, Value::String(value.into()))
    }

    pub fn set_boolean(&mut self, path: &str, value: bool) -> Result<()> {
        self.set_value(path, Value::Bool(value))
    }

    /// Merge the members of a JSON object into this record.
    ///
    /// Members not mentioned keep their current value.
    pub fn set_from_json(&mut self, value: &Value) -> Result<()> {
        let map = value.as_object().ok_or_else(|| {
            Error::TypeMismatch(format!("expected a JSON object, got {}", value))
        })?;

        let mut merged = self.value.clone();
        merge_into(&mut merged, map);
        let merged = match &self.schema {
            Some(schema) => schema.normalize(&merged)?,
            None => merged,
        };
        self.value = merged;
        Ok(())
    }

    /// Reset one member: to its default with a schema, removed without one.
    pub fn clear_member(&mut self, path: &str) -> Result<()> {
        let parsed = FieldPath::parse(path)?;

        if let Some(schema) = &self.schema {
            let chain = schema.root.resolve(parsed.segments())?;
            let fillers: Vec<Value> = chain.iter().map(|k| k.default_value()).collect();
            let default = fillers.last().cloned().unwrap_or(Value::Null);
            let slot = slot_mut(&mut self.value, parsed.segments(), Some(&fillers))?;
            *slot = default;
            return Ok(());
        }

        let Some((parent_path, last)) = parsed.split_last() else {
            return Ok(());
        };
        let mut parent = &mut self.value;
        for seg in parent_path {
            let next = match (seg, parent) {
                (Segment::Member(name), Value::Object(map)) => map.get_mut(name),
                (Segment::Index(i), Value::Array(items)) => items.get_mut(*i),
                _ => None,
            };
            match next {
                Some(v) => parent = v,
                None => return Ok(()),
            }
        }
        match (last, parent) {
            (Segment::Member(name), Value::Object(map)) => {
                map.remove(name);
            }
            (Segment::Index(i), Value::Array(items)) => {
                if let Some(item) = items.get_mut(*i) {
                    *item = Value::Null;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Reset every member.
    pub fn clear_all(&mut self) {
        self.value = match &self.schema {
            Some(schema) => schema.default_value(),
            None => Value::Object(Map::new()),
        };
    }

    /// Full check against the bound schema (no-op when schemaless).
    pub fn validate(&self) -> Result<()> {
        if let Some(schema) = &self.schema {
            schema.normalize(&self.value)?;
        }
        Ok(())
    }
}

fn kind_error(path: &str, expected: &str, got: &Value) -> Error {
    Error::TypeMismatch(format!("field '{}' is not a {}: {}", path, expected, got))
}

/// Largest sequence length reachable by writing past the end.
pub const MAX_SEQUENCE_LEN: usize = 1 << 16;

/// Mutable slot at `segments`, created on demand.
///
/// `fillers[i]` is the default for the value reached after segment `i`; it is
/// used for new intermediate records and to pad grown sequences.
fn slot_mut<'a>(
    root: &'a mut Value,
    segments: &[Segment],
    fillers: Option<&[Value]>,
) -> Result<&'a mut Value> {
    // checked up front so a rejected path leaves `root` as it was
    for (i, seg) in segments.iter().enumerate() {
        if let Segment::Index(idx) = seg {
            if *idx >= MAX_SEQUENCE_LEN {
                return Err(Error::InvalidValue(format!(
                    "index {} of '{}' exceeds the sequence limit of {}",
                    idx,
                    display_segments(&segments[..i]),
                    MAX_SEQUENCE_LEN
                )));
            }
        }
    }

    let mut cur = root;
    for (i, seg) in segments.iter().enumerate() {
        let filler = fillers
            .and_then(|f| f.get(i))
            .cloned()
            .unwrap_or(Value::Null);

        cur = match seg {
            Segment::Member(name) => {
                if cur.is_null() {
                    *cur = Value::Object(Map::new());
                }
                let Some(map) = cur.as_object_mut() else {
                    return Err(Error::TypeMismatch(format!(
                        "field '{}' is not a struct",
                        display_segments(&segments[..i])
                    )));
                };
                map.entry(name.clone()).or_insert(filler)
            }
            Segment::Index(idx) => {
                if cur.is_null() {
                    *cur = Value::Array(Vec::new());
                }
                let Some(items) = cur.as_array_mut() else {
                    return Err(Error::TypeMismatch(format!(
                        "field '{}' is not a sequence",
                        display_segments(&segments[..i])
                    )));
                };
                while items.len() <= *idx {
                    items.push(filler.clone());
                }
                &mut items[*idx]
            }
        };
    }
    Ok(cur)
}

fn merge_into(target: &mut Value, patch: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if let (Some(existing), Value::Object(inner)) = (map.get_mut(key), value) {
                if existing.is_object() {
                    merge_into(existing, inner);
                    continue;
                }
            }
            map.insert(key.clone(), value.clone());
        }
    }
}
