// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structured payloads: field paths, type schemas and [`DynamicData`].

mod path;
mod schema;
mod value;

pub use path::{FieldPath, Segment};
pub use schema::{FieldKind, StructSchema, TypeSchema};
pub use value::{DynamicData, MAX_SEQUENCE_LEN};
