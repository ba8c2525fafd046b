// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Errors produced by the operation model, the transform layer and the engine.

use thiserror::Error;

use crate::ot::op::OpKind;

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation itself is malformed.
    Validation,
    /// The operation does not fit the current document.
    Apply,
    /// A batch stopped part way through.
    Transform,
    /// The operation is not defined for plain text.
    Unsupported,
    /// The operations needed to rebase are no longer held.
    History,
    /// A checkpoint failed verification.
    Checkpoint,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("insert content cannot be empty")]
    EmptyContent,

    #[error("{kind} length must be positive")]
    ZeroLength { kind: OpKind },

    #[error("{kind} path cannot be empty")]
    EmptyPath { kind: OpKind },

    #[error("base version {base} is ahead of document version {current}")]
    FutureBase { base: u64, current: u64 },

    #[error("client {client} already has {limit} pending operations")]
    PendingLimit { client: String, limit: usize },

    #[error("insert position {position} exceeds document length {len}")]
    InsertOutOfBounds { position: usize, len: usize },

    #[error("{kind} range {position}..{} exceeds document length {len}", .position.saturating_add(*.length))]
    RangeOutOfBounds {
        kind: OpKind,
        position: usize,
        length: usize,
        len: usize,
    },

    #[error("{kind} operations are not supported for plain text documents")]
    Unsupported { kind: OpKind },

    #[error("batch aborted at operation {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("base version {base} is not available in retained history (oldest {oldest})")]
    HistoryUnavailable { base: u64, oldest: u64 },

    #[error("checkpoint digest does not match its contents")]
    CheckpointCorrupt,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        return match self {
            Error::EmptyContent
            | Error::ZeroLength { .. }
            | Error::EmptyPath { .. }
            | Error::FutureBase { .. }
            | Error::PendingLimit { .. } => ErrorKind::Validation,
            Error::InsertOutOfBounds { .. } | Error::RangeOutOfBounds { .. } => ErrorKind::Apply,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Batch { .. } => ErrorKind::Transform,
            Error::HistoryUnavailable { .. } => ErrorKind::History,
            Error::CheckpointCorrupt => ErrorKind::Checkpoint,
        };
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
