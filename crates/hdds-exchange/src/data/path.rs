// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field path parsing: `member.nested[0].leaf`.
//!
//! Indices are 0-based.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Member(String),
    Index(usize),
}

/// Parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path such as `"origin.lat"` or `"tags[2]"`.
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::InvalidValue("empty field name".into()));
        }

        let mut segments = Vec::new();
        let mut chars = input.char_indices().peekable();
        let mut member = String::new();
        // true right after ']' : only '.', '[' or end may follow
        let mut after_index = false;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if member.is_empty() && !after_index {
                        return Err(bad_path(input, pos, "empty member name"));
                    }
                    if !member.is_empty() {
                        segments.push(Segment::Member(std::mem::take(&mut member)));
                    }
                    after_index = false;
                    if chars.peek().is_none() {
                        return Err(bad_path(input, pos, "trailing '.'"));
                    }
                }
                '[' => {
                    if !member.is_empty() {
                        segments.push(Segment::Member(std::mem::take(&mut member)));
                    } else if segments.is_empty() {
                        return Err(bad_path(input, pos, "index without a member"));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, d) in chars.by_ref() {
                        if d == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(d);
                    }
                    if !closed {
                        return Err(bad_path(input, pos, "unterminated '['"));
                    }
                    let index = digits.trim().parse::<usize>().map_err(|_| {
                        bad_path(input, pos, "index must be a non-negative integer")
                    })?;
                    segments.push(Segment::Index(index));
                    after_index = true;
                }
                ']' => return Err(bad_path(input, pos, "unbalanced ']'")),
                c if c.is_whitespace() => {
                    return Err(bad_path(input, pos, "whitespace in field name"))
                }
                c => {
                    if after_index {
                        return Err(bad_path(input, pos, "expected '.' or '[' after index"));
                    }
                    member.push(c);
                }
            }
        }

        if !member.is_empty() {
            segments.push(Segment::Member(member));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Path without its last segment, plus that segment.
    pub fn split_last(&self) -> Option<(&[Segment], &Segment)> {
        self.segments.split_last().map(|(last, rest)| (rest, last))
    }
}

fn bad_path(input: &str, pos: usize, why: &str) -> Error {
    Error::InvalidValue(format!("invalid field name '{}' at {}: {}", input, pos, why))
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_segments(&self.segments, f)
    }
}

/// Render a segment slice the way it would be written.
pub(crate) fn display_segments(segments: &[Segment]) -> String {
    struct Show<'a>(&'a [Segment]);
    impl fmt::Display for Show<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            fmt_segments(self.0, f)
        }
    }
    Show(segments).to_string()
}

fn fmt_segments(segments: &[Segment], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            Segment::Member(name) if i == 0 => write!(f, "{}", name)?,
            Segment::Member(name) => write!(f, ".{}", name)?,
            Segment::Index(idx) => write!(f, "[{}]", idx)?,
        }
    }
    Ok(())
}
