//! [`ActionOrchestrator`] – promise tracking for actuator dispatch.
//!
//! `promise()` fans sanitized commands out to their connectors, one spawned
//! task per command kind so same-kind ordering is preserved (sequential
//! dispatch to the same connector) while different kinds run concurrently.
//! Every dispatch carries an explicit timeout; a connector that errors or
//! times out resolves its promise as failure without touching siblings.
//!
//! `flush_promises()` is called once per tick by the scheduler and is
//! non-blocking: it drains the result channel against the pending
//! side-table and returns only what has already resolved.  Resolutions are
//! read exactly once; the orchestrator never retries a command.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use cortex_types::{Command, Promise, Resolution};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::connector::Connector;

struct DispatchResult {
    id: Uuid,
    resolution: Resolution,
}

/// Dispatches commands and tracks each as a [`Promise`] until its
/// resolution is consumed.
pub struct ActionOrchestrator {
    connectors: HashMap<String, Arc<dyn Connector>>,
    dispatch_timeout: Duration,
    pending: Mutex<HashMap<Uuid, Promise>>,
    results_tx: mpsc::UnboundedSender<DispatchResult>,
    results_rx: Mutex<mpsc::UnboundedReceiver<DispatchResult>>,
}

impl ActionOrchestrator {
    /// `dispatch_timeout` bounds every single `execute` call; a stuck
    /// actuator resolves as failure instead of stalling the scheduler.
    pub fn new(connectors: Vec<Arc<dyn Connector>>, dispatch_timeout: Duration) -> Self {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.kind().to_string(), c))
            .collect();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            connectors,
            dispatch_timeout,
            pending: Mutex::new(HashMap::new()),
            results_tx,
            results_rx: Mutex::new(results_rx),
        }
    }

    /// Dispatch `commands`, tracking each as a pending promise.
    ///
    /// Unknown kinds are logged and dropped (not fatal, not tracked).
    /// Same-kind commands are dispatched sequentially in list order;
    /// different kinds are dispatched concurrently with no cross-kind
    /// ordering guarantee.
    pub fn promise(&self, commands: &[Command]) {
        // Group by kind, preserving first-appearance and in-group order.
        let mut groups: Vec<(String, Vec<(Uuid, Command)>)> = Vec::new();
        for command in commands {
            let kind = command.kind().to_string();
            if !self.connectors.contains_key(&kind) {
                warn!(kind = %kind, "no connector registered; command dropped");
                continue;
            }
            let id = Uuid::new_v4();
            self.pending.lock().expect("pending mutex poisoned").insert(
                id,
                Promise {
                    id,
                    command: command.clone(),
                    dispatched_at: Utc::now(),
                    resolution: Resolution::Pending,
                },
            );
            match groups.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, list)) => list.push((id, command.clone())),
                None => groups.push((kind, vec![(id, command.clone())])),
            }
        }

        for (kind, list) in groups {
            let connector = Arc::clone(&self.connectors[&kind]);
            let tx = self.results_tx.clone();
            let timeout = self.dispatch_timeout;
            tokio::spawn(async move {
                for (id, command) in list {
                    let resolution =
                        match tokio::time::timeout(timeout, connector.execute(&command)).await {
                            Ok(Ok(detail)) => Resolution::Success { detail },
                            Ok(Err(e)) => {
                                warn!(kind = %kind, error = %e, "connector failed");
                                Resolution::Failure {
                                    detail: e.to_string(),
                                }
                            }
                            Err(_) => {
                                warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "dispatch timed out");
                                Resolution::Failure {
                                    detail: format!("timed out after {timeout:?}"),
                                }
                            }
                        };
                    // Receiver dropped means the orchestrator is gone;
                    // nothing left to report to.
                    if tx.send(DispatchResult { id, resolution }).is_err() {
                        break;
                    }
                }
            });
        }
    }

    /// Drain everything that has resolved since the last call.
    ///
    /// Non-blocking by contract: returns the resolved promises plus the
    /// number still pending.  Each resolution is returned exactly once.
    pub fn flush_promises(&self) -> (Vec<Promise>, usize) {
        let mut resolved = Vec::new();
        {
            let mut rx = self.results_rx.lock().expect("results mutex poisoned");
            let mut pending = self.pending.lock().expect("pending mutex poisoned");
            while let Ok(result) = rx.try_recv() {
                match pending.remove(&result.id) {
                    Some(mut promise) => {
                        promise.resolution = result.resolution;
                        resolved.push(promise);
                    }
                    None => {
                        debug!(id = %result.id, "resolution for unknown promise; dropped");
                    }
                }
            }
        }
        let still_pending = self.pending.lock().expect("pending mutex poisoned").len();
        (resolved, still_pending)
    }

    /// Kinds with a registered connector, for the action catalogue.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.connectors.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
