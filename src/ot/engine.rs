// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! The server side of the Jupiter protocol for one document.
//!
//! An [`Engine`] owns the canonical [`DocumentState`], the [`History`] of
//! applied operations, and bookkeeping for every client it has heard from.
//! Clients submit an operation together with the version they wrote it
//! against. If the document has moved on since then, the engine rebases the
//! operation over the entries the client missed before applying it:
//!
//! ```text
//! base ──h[base]──h[base+1]── … ──> version
//!    \
//!     op  ──transform_against_sequence──>  op'  (applied at version)
//! ```
//!
//! Submissions never panic and never leave the document half-changed. A
//! rejected submission comes back as [`Rejected`] with the state untouched.
//!
//! The engine is a plain `&mut self` state machine. Share it between threads
//! through [`Session`](super::session::Session), which puts the whole engine
//! behind one lock.

use std::time::Instant;

use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::error::Result;
use super::checkpoint::Checkpoint;
use super::history::History;
use super::op::apply;
use super::op::check;
use super::op::DocumentState;
use super::op::Operation;
use super::primitives::LamportClock;
use super::transform::transform_against_sequence;

/// What the engine knows about one client.
#[derive(Clone, Debug)]
pub struct ClientState {
    pub client_id: String,
    /// Version reached by the client's last accepted submission.
    pub version: u64,
    /// Operations queued by the client but not yet submitted.
    pub pending_ops: Vec<Operation>,
    pub last_seen: Instant,
}

impl ClientState {
    fn new(client_id: &str, version: u64, now: Instant) -> ClientState {
        return ClientState {
            client_id: client_id.to_string(),
            version,
            pending_ops: Vec::new(),
            last_seen: now,
        };
    }
}

/// An accepted submission: the operation as applied and the new version.
#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub operation: Operation,
    pub version: u64,
}

/// A refused submission. The document is unchanged and still at `version`.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("{error}")]
pub struct Rejected {
    pub operation: Operation,
    pub version: u64,
    #[source]
    pub error: Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchApplied {
    pub operations: Vec<Operation>,
    pub version: u64,
}

/// A batch that stopped early. `operations` were applied and stay applied.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("{error}")]
pub struct BatchRejected {
    pub operations: Vec<Operation>,
    pub version: u64,
    #[source]
    pub error: Error,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub version: u64,
    /// In chars.
    pub content_length: usize,
    pub history_length: usize,
    pub pending: usize,
    pub clients: usize,
}

/// The outcome of one maintenance pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub evicted: Vec<String>,
    pub compacted: usize,
}

pub struct Engine {
    state: DocumentState,
    history: History,
    clients: FxHashMap<String, ClientState>,
    clock: LamportClock,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine at version 0 with the default configuration.
    pub fn new(content: impl Into<String>) -> Engine {
        return Engine::with_config(content, EngineConfig::default());
    }

    pub fn with_config(content: impl Into<String>, config: EngineConfig) -> Engine {
        return Engine {
            state: DocumentState::new(content),
            history: History::new(0),
            clients: FxHashMap::default(),
            clock: LamportClock::new(),
            config,
        };
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> DocumentState {
        return self.state.clone();
    }

    pub fn version(&self) -> u64 {
        return self.state.version;
    }

    pub fn content(&self) -> &str {
        return &self.state.content;
    }

    pub fn config(&self) -> &EngineConfig {
        return &self.config;
    }

    pub fn history(&self) -> &History {
        return &self.history;
    }

    pub fn client(&self, client_id: &str) -> Option<&ClientState> {
        return self.clients.get(client_id);
    }

    /// All registered clients, ordered by id.
    pub fn clients(&self) -> Vec<&ClientState> {
        let mut clients: Vec<_> = self.clients.values().collect();
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        return clients;
    }

    pub fn stats(&self) -> Stats {
        return Stats {
            version: self.state.version,
            content_length: self.state.len(),
            history_length: self.history.len(),
            pending: self.clients.values().map(|c| c.pending_ops.len()).sum(),
            clients: self.clients.len(),
        };
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// Start tracking `client_id` at the current version. No-op if known.
    pub fn register_client(&mut self, client_id: &str) {
        self.register_client_at(client_id, Instant::now());
    }

    fn register_client_at(&mut self, client_id: &str, now: Instant) -> &mut ClientState {
        let version = self.state.version;
        return self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientState::new(client_id, version, now));
    }

    /// Stop tracking `client_id`. Returns false if it was not registered.
    pub fn unregister_client(&mut self, client_id: &str) -> bool {
        return self.clients.remove(client_id).is_some();
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Rebase `operation` from `base_version` to the current version and
    /// apply it.
    pub fn submit(&mut self, operation: Operation, client_id: &str, base_version: u64) -> Result<Applied, Rejected> {
        let now = Instant::now();
        if let Err(error) = check(&operation) {
            return Err(self.reject(operation, client_id, error));
        }
        self.register_client_at(client_id, now);

        let mut operation = operation;
        if operation.stamp.client_id.is_none() {
            operation.stamp.client_id = Some(client_id.to_string());
        }

        let mut rebased = match self.rebase(&operation, base_version) {
            Ok(rebased) => rebased,
            Err(error) => return Err(self.reject(operation, client_id, error)),
        };

        let next = match apply(&rebased, &self.state) {
            Ok(next) => next,
            Err(error) => return Err(self.reject(rebased, client_id, error)),
        };

        rebased.stamp.timestamp = self.clock.stamp(rebased.stamp.timestamp);
        self.state = next;
        self.history.push(rebased.clone());

        let version = self.state.version;
        if let Some(client) = self.clients.get_mut(client_id) {
            client.version = version;
            client.last_seen = now;
        }
        debug!(client = client_id, base = base_version, version, kind = %rebased.kind(), "applied operation");

        self.trim_history();
        return Ok(Applied { operation: rebased, version });
    }

    /// Submit `operations` in order, each against the version the previous
    /// one produced.
    ///
    /// Stops at the first failure. Operations applied before it are not
    /// rolled back; the caller should treat the batch as partially committed
    /// and catch up with [`operations_since`](Self::operations_since).
    pub fn submit_batch(
        &mut self,
        operations: Vec<Operation>,
        client_id: &str,
        base_version: u64,
    ) -> Result<BatchApplied, BatchRejected> {
        let mut applied = Vec::with_capacity(operations.len());
        let mut base = base_version;

        for (index, operation) in operations.into_iter().enumerate() {
            match self.submit(operation, client_id, base) {
                Ok(Applied { operation, version }) => {
                    applied.push(operation);
                    base = version;
                }
                Err(rejected) => {
                    return Err(BatchRejected {
                        operations: applied,
                        version: self.state.version,
                        error: Error::Batch { index, source: Box::new(rejected.error) },
                    });
                }
            }
        }

        return Ok(BatchApplied { operations: applied, version: self.state.version });
    }

    fn rebase(&self, operation: &Operation, base_version: u64) -> Result<Operation> {
        let current = self.state.version;
        if base_version > current {
            return Err(Error::FutureBase { base: base_version, current });
        }
        if base_version == current {
            return Ok(operation.clone());
        }
        let missed = self.history.since(base_version)?;
        trace!(base = base_version, current, missed = missed.len(), "catching up");
        return Ok(transform_against_sequence(operation, missed.iter().map(|entry| &entry.operation)));
    }

    fn reject(&self, operation: Operation, client_id: &str, error: Error) -> Rejected {
        warn!(client = client_id, version = self.state.version, %error, "rejected operation");
        return Rejected { operation, version: self.state.version, error };
    }

    fn trim_history(&mut self) {
        let dropped = self.history.trim(self.config.history_limit, self.config.retained());
        if dropped == 0 {
            return;
        }
        let start = self.history.start();
        let behind = self.clients.values().filter(|c| c.version < start).count();
        info!(dropped, start, behind, "trimmed history");
    }

    /// Operations applied since `version`, for a client to replay locally.
    pub fn operations_since(&self, version: u64) -> Result<Vec<Operation>> {
        if version >= self.state.version {
            return Ok(Vec::new());
        }
        let entries = self.history.since(version)?;
        return Ok(entries.iter().map(|entry| entry.operation.clone()).collect());
    }

    /// Rebase a client's unacknowledged `pending` edit over `server_ops`.
    ///
    /// Needs no engine state; clients holding only the operations from
    /// [`operations_since`](Self::operations_since) can call it directly.
    pub fn transform_pending(pending: &Operation, server_ops: &[Operation]) -> Operation {
        return transform_against_sequence(pending, server_ops);
    }

    // =========================================================================
    // Pending queues
    // =========================================================================

    /// Queue `operation` for `client_id` without applying it.
    pub fn enqueue(&mut self, client_id: &str, operation: Operation) -> Result<()> {
        check(&operation)?;
        let limit = self.config.max_pending_ops;
        let client = self.register_client_at(client_id, Instant::now());
        if client.pending_ops.len() >= limit {
            return Err(Error::PendingLimit { client: client_id.to_string(), limit });
        }
        client.pending_ops.push(operation);
        return Ok(());
    }

    pub fn pending(&self, client_id: &str) -> &[Operation] {
        return self.clients.get(client_id).map(|client| client.pending_ops.as_slice()).unwrap_or(&[]);
    }

    /// Drop and return everything queued for `client_id`.
    pub fn clear_pending(&mut self, client_id: &str) -> Vec<Operation> {
        return self
            .clients
            .get_mut(client_id)
            .map(|client| std::mem::take(&mut client.pending_ops))
            .unwrap_or_default();
    }

    /// Submit everything queued for `client_id` as one batch. The queue is
    /// emptied whether or not the batch succeeds.
    pub fn flush_pending(&mut self, client_id: &str, base_version: u64) -> Result<BatchApplied, BatchRejected> {
        let queued = self.clear_pending(client_id);
        return self.submit_batch(queued, client_id, base_version);
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Compose adjacent history entries that every registered client has
    /// already moved past. Returns the number of entries removed.
    pub fn optimize_history(&mut self) -> usize {
        let watermark = self
            .clients
            .values()
            .map(|client| client.version)
            .min()
            .unwrap_or(self.state.version);
        let compacted = self.history.compact(watermark);
        if compacted > 0 {
            debug!(compacted, watermark, "compacted history");
        }
        return compacted;
    }

    /// Evict clients not seen within the stale timeout.
    pub fn check_stale_clients(&mut self) -> Vec<String> {
        return self.check_stale_clients_at(Instant::now());
    }

    /// Like [`check_stale_clients`](Self::check_stale_clients), measured
    /// against `now`.
    pub fn check_stale_clients_at(&mut self, now: Instant) -> Vec<String> {
        let timeout = self.config.stale_timeout();
        let mut evicted: Vec<String> = self
            .clients
            .values()
            .filter(|client| now.saturating_duration_since(client.last_seen) > timeout)
            .map(|client| client.client_id.clone())
            .collect();
        evicted.sort();
        for client_id in &evicted {
            self.clients.remove(client_id);
            info!(client = %client_id, "evicted stale client");
        }
        return evicted;
    }

    /// One maintenance tick: evict stale clients, then compact history.
    pub fn run_maintenance(&mut self) -> MaintenanceReport {
        let evicted = self.check_stale_clients();
        let compacted = self.optimize_history();
        return MaintenanceReport { evicted, compacted };
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn checkpoint(&self) -> Checkpoint {
        return Checkpoint::new(self.state.clone());
    }

    /// Return to `checkpoint`.
    ///
    /// History and pending queues are discarded. Clients stay registered, but
    /// any submission based on a version other than the restored one fails
    /// with [`Error::HistoryUnavailable`] or [`Error::FutureBase`], so those
    /// clients have to resynchronize from [`state`](Self::state).
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if !checkpoint.verify() {
            warn!(version = checkpoint.version(), "refused corrupt checkpoint");
            return Err(Error::CheckpointCorrupt);
        }
        self.state = checkpoint.state.clone();
        self.history.clear(checkpoint.version());
        for client in self.clients.values_mut() {
            client.pending_ops.clear();
        }
        info!(version = checkpoint.version(), "restored checkpoint");
        return Ok(());
    }

    /// Start over from `content` at `version`, forgetting every client.
    pub fn reset(&mut self, content: impl Into<String>, version: u64) {
        self.state = DocumentState { content: content.into(), version };
        self.history.clear(version);
        self.clients.clear();
        info!(version, "reset document");
    }
}

impl Default for Engine {
    fn default() -> Self {
        return Engine::new("");
    }
}
