// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! The operation vocabulary and its pure semantics.
//!
//! An [`Operation`] is an [`Op`] (what to do) plus a [`Stamp`] (when and by
//! whom). The stamp never changes what an operation does to a document; it is
//! only read when two concurrent inserts land on the same position and a
//! winner has to be picked.
//!
//! Positions and lengths count chars, not bytes:
//! - Insert: splice `content` at `position`
//! - Delete: remove `[position, position + length)`
//! - Retain / Format: leave plain text untouched
//! - Set / Unset: reserved for structured documents, rejected by [`apply`]

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::Error;
use crate::error::Result;
use super::primitives::text::byte_offset;
use super::primitives::text::byte_range;
use super::primitives::text::char_len;
use super::primitives::text::char_slice;

/// Rich-text attributes. A `BTreeMap` so equality ignores insertion order.
pub type Attributes = BTreeMap<String, Value>;

/// Key path into a structured document.
pub type Path = SmallVec<[String; 4]>;

/// The variant tag of an [`Op`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Insert,
    Delete,
    Retain,
    Format,
    Set,
    Unset,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Insert => "insert",
            OpKind::Delete => "delete",
            OpKind::Retain => "retain",
            OpKind::Format => "format",
            OpKind::Set => "set",
            OpKind::Unset => "unset",
        };
        return f.write_str(name);
    }
}

/// An edit, without its stamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Op {
    Insert {
        position: usize,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Delete {
        position: usize,
        length: usize,
    },
    /// Placeholder that moves a rich-text cursor without editing.
    Retain {
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<Attributes>,
    },
    Format {
        position: usize,
        length: usize,
        attributes: Attributes,
    },
    Set {
        path: Path,
        value: Value,
    },
    Unset {
        path: Path,
    },
}

impl Op {
    pub fn kind(&self) -> OpKind {
        return match self {
            Op::Insert { .. } => OpKind::Insert,
            Op::Delete { .. } => OpKind::Delete,
            Op::Retain { .. } => OpKind::Retain,
            Op::Format { .. } => OpKind::Format,
            Op::Set { .. } => OpKind::Set,
            Op::Unset { .. } => OpKind::Unset,
        };
    }
}

/// Logical submission time and origin of an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    /// Lamport time assigned on submission; 0 means not yet stamped.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Stamp {
    /// The identifier compared when two inserts tie on position.
    pub fn priority(&self) -> &str {
        return self
            .client_id
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("");
    }

    /// Keep the origin but forget the timestamp.
    fn origin(&self) -> Stamp {
        return Stamp {
            timestamp: 0,
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
        };
    }
}

/// A stamped operation.
///
/// Equality compares the [`Op`] only; two operations that do the same thing
/// are equal regardless of who sent them or when.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    #[serde(flatten)]
    pub op: Op,
    #[serde(flatten)]
    pub stamp: Stamp,
}

impl Operation {
    /// Wrap an op with an empty stamp, without validating it.
    pub fn new(op: Op) -> Operation {
        return Operation { op, stamp: Stamp::default() };
    }

    pub fn kind(&self) -> OpKind {
        return self.op.kind();
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Operation {
        self.stamp.client_id = Some(client_id.into());
        return self;
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Operation {
        self.stamp.user_id = Some(user_id.into());
        return self;
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Operation {
        self.stamp.timestamp = timestamp;
        return self;
    }

    /// Same stamp, different op.
    pub(crate) fn with_op(&self, op: Op) -> Operation {
        return Operation { op, stamp: self.stamp.clone() };
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        return equals(self, other);
    }
}

/// Canonical document state for the plain-text model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentState {
    pub content: String,
    pub version: u64,
}

impl DocumentState {
    pub fn new(content: impl Into<String>) -> DocumentState {
        return DocumentState { content: content.into(), version: 0 };
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        return char_len(&self.content);
    }

    pub fn is_empty(&self) -> bool {
        return self.content.is_empty();
    }
}

// =============================================================================
// Constructors
// =============================================================================

pub fn insert(position: usize, content: impl Into<String>) -> Result<Operation> {
    return checked(Op::Insert { position, content: content.into(), attributes: None });
}

pub fn insert_with(position: usize, content: impl Into<String>, attributes: Attributes) -> Result<Operation> {
    return checked(Op::Insert { position, content: content.into(), attributes: Some(attributes) });
}

pub fn delete(position: usize, length: usize) -> Result<Operation> {
    return checked(Op::Delete { position, length });
}

pub fn retain(length: usize) -> Result<Operation> {
    return checked(Op::Retain { length, attributes: None });
}

pub fn retain_with(length: usize, attributes: Attributes) -> Result<Operation> {
    return checked(Op::Retain { length, attributes: Some(attributes) });
}

pub fn format(position: usize, length: usize, attributes: Attributes) -> Result<Operation> {
    return checked(Op::Format { position, length, attributes });
}

pub fn set<I, S>(path: I, value: Value) -> Result<Operation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let path = path.into_iter().map(Into::into).collect();
    return checked(Op::Set { path, value });
}

pub fn unset<I, S>(path: I) -> Result<Operation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let path = path.into_iter().map(Into::into).collect();
    return checked(Op::Unset { path });
}

fn checked(op: Op) -> Result<Operation> {
    let operation = Operation::new(op);
    check(&operation)?;
    return Ok(operation);
}

// =============================================================================
// Validation and inspection
// =============================================================================

/// Report the first structural problem with `operation`.
pub fn check(operation: &Operation) -> Result<()> {
    let kind = operation.kind();
    return match &operation.op {
        Op::Insert { content, .. } if content.is_empty() => Err(Error::EmptyContent),
        Op::Delete { length: 0, .. }
        | Op::Retain { length: 0, .. }
        | Op::Format { length: 0, .. } => Err(Error::ZeroLength { kind }),
        Op::Set { path, .. } | Op::Unset { path } if path.is_empty() => Err(Error::EmptyPath { kind }),
        _ => Ok(()),
    };
}

pub fn validate(operation: &Operation) -> bool {
    return check(operation).is_ok();
}

/// Deep comparison of the ops, ignoring stamps.
pub fn equals(a: &Operation, b: &Operation) -> bool {
    return a.op == b.op;
}

/// Content or span length by variant; 0 for Set/Unset.
pub fn length(operation: &Operation) -> usize {
    return match &operation.op {
        Op::Insert { content, .. } => char_len(content),
        Op::Delete { length, .. } | Op::Retain { length, .. } | Op::Format { length, .. } => *length,
        Op::Set { .. } | Op::Unset { .. } => 0,
    };
}

// =============================================================================
// Semantics
// =============================================================================

/// Apply `operation` to `state`, producing the next state.
pub fn apply(operation: &Operation, state: &DocumentState) -> Result<DocumentState> {
    let content = match &operation.op {
        Op::Insert { position, content, .. } => {
            let Some(at) = byte_offset(&state.content, *position) else {
                return Err(Error::InsertOutOfBounds { position: *position, len: state.len() });
            };
            let mut next = String::with_capacity(state.content.len() + content.len());
            next.push_str(&state.content[..at]);
            next.push_str(content);
            next.push_str(&state.content[at..]);
            next
        }
        Op::Delete { position, length } => {
            let Some(range) = byte_range(&state.content, *position, *length) else {
                return Err(Error::RangeOutOfBounds {
                    kind: OpKind::Delete,
                    position: *position,
                    length: *length,
                    len: state.len(),
                });
            };
            let mut next = String::with_capacity(state.content.len() - range.len());
            next.push_str(&state.content[..range.start]);
            next.push_str(&state.content[range.end..]);
            next
        }
        Op::Retain { .. } | Op::Format { .. } => state.content.clone(),
        Op::Set { .. } | Op::Unset { .. } => {
            return Err(Error::Unsupported { kind: operation.kind() });
        }
    };
    return Ok(DocumentState { content, version: state.version + 1 });
}

/// The operation that undoes `operation`, given the state it was applied to.
///
/// Format inverts to a format that clears attributes; the previous values
/// are not recoverable. Unset inverts to setting `null` for the same reason.
pub fn invert(operation: &Operation, state: &DocumentState) -> Result<Operation> {
    let op = match &operation.op {
        Op::Insert { position, content, .. } => {
            delete(*position, char_len(content))?.op
        }
        Op::Delete { position, length } => {
            let Some(removed) = char_slice(&state.content, *position, *length) else {
                return Err(Error::RangeOutOfBounds {
                    kind: OpKind::Delete,
                    position: *position,
                    length: *length,
                    len: state.len(),
                });
            };
            insert(*position, removed)?.op
        }
        Op::Retain { .. } => operation.op.clone(),
        Op::Format { position, length, .. } => Op::Format {
            position: *position,
            length: *length,
            attributes: Attributes::new(),
        },
        Op::Set { path, .. } => Op::Unset { path: path.clone() },
        Op::Unset { path } => Op::Set { path: path.clone(), value: Value::Null },
    };
    return Ok(Operation { op, stamp: operation.stamp.origin() });
}

/// Merge two sequential operations into one, when they line up.
///
/// This is a storage optimization; `None` just means "keep both".
pub fn compose(first: &Operation, second: &Operation) -> Option<Operation> {
    let op = match (&first.op, &second.op) {
        (
            Op::Insert { position: p1, content: c1, attributes },
            Op::Insert { position: p2, content: c2, .. },
        ) if *p2 == p1 + char_len(c1) => Op::Insert {
            position: *p1,
            content: format!("{c1}{c2}"),
            attributes: attributes.clone(),
        },
        (
            Op::Delete { position: p1, length: l1 },
            Op::Delete { position: p2, length: l2 },
        ) if p1 == p2 => Op::Delete { position: *p1, length: l1 + l2 },
        (Op::Retain { length: l1, .. }, Op::Retain { length: l2, .. }) => Op::Retain {
            length: l1 + l2,
            attributes: None,
        },
        _ => return None,
    };
    return Some(first.with_op(op));
}
