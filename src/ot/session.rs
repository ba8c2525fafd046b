// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! A shareable handle to an [`Engine`] and its background maintenance.
//!
//! The engine is serialized behind a single mutex, so submissions from
//! different threads are applied one at a time in lock order.

use std::io;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crossbeam::channel;
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use tracing::debug;

use super::engine::Applied;
use super::engine::BatchApplied;
use super::engine::BatchRejected;
use super::engine::Engine;
use super::engine::Rejected;
use super::op::Operation;

#[derive(Clone)]
pub struct Session {
    engine: Arc<Mutex<Engine>>,
}

impl Session {
    pub fn new(engine: Engine) -> Session {
        return Session { engine: Arc::new(Mutex::new(engine)) };
    }

    /// Exclusive access to the engine until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        return self.engine.lock();
    }

    pub fn submit(&self, operation: Operation, client_id: &str, base_version: u64) -> Result<Applied, Rejected> {
        return self.engine.lock().submit(operation, client_id, base_version);
    }

    pub fn submit_batch(
        &self,
        operations: Vec<Operation>,
        client_id: &str,
        base_version: u64,
    ) -> Result<BatchApplied, BatchRejected> {
        return self.engine.lock().submit_batch(operations, client_id, base_version);
    }

    /// Spawn a thread that runs [`Engine::run_maintenance`] every
    /// `check_interval`. It stops when the returned handle is stopped or
    /// dropped.
    pub fn start_maintenance(&self) -> io::Result<Maintenance> {
        let interval = self.engine.lock().config().check_interval();
        let engine = Arc::clone(&self.engine);
        let (shutdown, stopped) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("converge-maintenance".into())
            .spawn(move || {
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => {
                            let report = engine.lock().run_maintenance();
                            if !report.evicted.is_empty() || report.compacted > 0 {
                                debug!(evicted = report.evicted.len(), compacted = report.compacted, "maintenance");
                            }
                        }
                        recv(stopped) -> _ => break,
                    }
                }
            })?;

        return Ok(Maintenance { shutdown: Some(shutdown), handle: Some(handle) });
    }
}

/// Handle to the maintenance thread.
pub struct Maintenance {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Maintenance {
    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        // Dropping the sender disconnects the channel, which wakes the loop.
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Maintenance {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
