//! Dot/bracket path mini-language for locating a descendant node.
//!
//! Grammar: parts separated by `.`; a part is a bare member name or an
//! indexer `[N]` / `(N)` with `N` a non-negative decimal integer. An indexer
//! may follow a name or another indexer without a dot; a dot immediately
//! before an indexer is a parse error, as are empty parts and malformed
//! indexers.
//!
//! Evaluation is strict or lenient: lenient lookups return `None` (the
//! missing-sentinel) for absent members, out-of-range indexes, and kind
//! mismatches; strict evaluation raises `NoMatch` / `IndexOutOfRange`.
//! Grammar errors surface from [`Path::parse`] regardless of mode.

use crate::error::{ArborError, Result};
use crate::scalar::NodeKind;
use crate::tree::{JsonTree, NodeId};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Member(String),
    Index(usize),
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

fn parse_err(column: usize, message: impl Into<String>) -> ArborError {
    ArborError::Parse {
        line: 1,
        column: column + 1,
        message: message.into(),
    }
}

impl Path {
    /// Parse a path expression. An empty path selects the evaluation root.
    pub fn parse(text: &str) -> Result<Path> {
        let bytes = text.as_bytes();
        let n = bytes.len();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < n {
            match bytes[i] {
                b'[' | b'(' => {
                    let close = if bytes[i] == b'[' { b']' } else { b')' };
                    let start = i + 1;
                    let mut j = start;
                    while j < n && bytes[j] != close {
                        j += 1;
                    }
                    if j >= n {
                        return Err(parse_err(i, "unterminated indexer"));
                    }
                    let digits = &text[start..j];
                    if digits.is_empty() {
                        return Err(parse_err(start, "empty indexer"));
                    }
                    if !digits.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(parse_err(
                            start,
                            "indexer must be a non-negative decimal integer",
                        ));
                    }
                    let index: usize = digits
                        .parse()
                        .map_err(|_| parse_err(start, "indexer out of range"))?;
                    segments.push(Segment::Index(index));
                    i = j + 1;
                    if i < n {
                        match bytes[i] {
                            b'.' => i = consume_dot(bytes, i)?,
                            b'[' | b'(' => {}
                            _ => {
                                return Err(parse_err(i, "unexpected character after indexer"));
                            }
                        }
                    }
                }
                b'.' => {
                    return Err(parse_err(i, "empty path part"));
                }
                _ => {
                    let start = i;
                    while i < n && bytes[i] != b'.' && bytes[i] != b'[' && bytes[i] != b'(' {
                        i += 1;
                    }
                    segments.push(Segment::Member(text[start..i].to_string()));
                    if i < n && bytes[i] == b'.' {
                        i = consume_dot(bytes, i)?;
                    }
                }
            }
        }
        Ok(Path { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk the path from `root`.
    ///
    /// Returns the matched node, `None` when a lenient lookup misses, or an
    /// error when `strict` and a segment fails to match.
    pub fn evaluate(
        &self,
        tree: &JsonTree,
        root: NodeId,
        strict: bool,
    ) -> Result<Option<NodeId>> {
        let mut cur = root;
        for segment in &self.segments {
            match segment {
                Segment::Member(name) => {
                    if tree.kind(cur) != NodeKind::Object {
                        if strict {
                            return Err(ArborError::NoMatch(format!(
                                "property '{name}' requires an object, found {}",
                                tree.kind(cur)
                            )));
                        }
                        return Ok(None);
                    }
                    match tree.get(cur, name) {
                        Some(value) => cur = value,
                        None => {
                            if strict {
                                return Err(ArborError::NoMatch(format!(
                                    "object has no property '{name}'"
                                )));
                            }
                            return Ok(None);
                        }
                    }
                }
                Segment::Index(index) => {
                    if tree.kind(cur) != NodeKind::Array {
                        if strict {
                            return Err(ArborError::NoMatch(format!(
                                "index {index} requires an array, found {}",
                                tree.kind(cur)
                            )));
                        }
                        return Ok(None);
                    }
                    match tree.get_item(cur, *index) {
                        Some(item) => cur = item,
                        None => {
                            if strict {
                                return Err(ArborError::IndexOutOfRange {
                                    index: *index,
                                    len: tree.len(cur),
                                });
                            }
                            return Ok(None);
                        }
                    }
                }
            }
        }
        Ok(Some(cur))
    }
}

/// Consume a `.` separator; the next character must start a member name.
fn consume_dot(bytes: &[u8], dot: usize) -> Result<usize> {
    let next = dot + 1;
    if next >= bytes.len() {
        return Err(parse_err(next, "path ends with a dot"));
    }
    if bytes[next] == b'[' || bytes[next] == b'(' {
        return Err(parse_err(next, "indexer must not follow a dot"));
    }
    if bytes[next] == b'.' {
        return Err(parse_err(next, "empty path part"));
    }
    Ok(next)
}

/// Parse and evaluate a path in one step.
pub fn select(
    tree: &JsonTree,
    root: NodeId,
    path: &str,
    strict: bool,
) -> Result<Option<NodeId>> {
    Path::parse(path)?.evaluate(tree, root, strict)
}
