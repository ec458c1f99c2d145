//! The [`Connector`] trait for actuator backends.
//!
//! Speech synthesis, gesture players, and movement drivers implement this
//! trait and register with the
//! [`ConnectorRegistry`][crate::registry::ConnectorRegistry].  Dispatch is
//! fire-and-forget with at-most-once semantics: the orchestrator never
//! retries, so an `execute` that partially applied must be safe to leave
//! as-is.

use async_trait::async_trait;
use cortex_types::{Command, CortexError};
use tracing::info;

/// A pluggable actuator backend handling one command kind.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The command kind this connector handles, e.g. `"speak"`.
    fn kind(&self) -> &str;

    /// Execute `command`, optionally returning a completion detail
    /// (e.g. "speech finished").  May suspend for the duration of the
    /// physical action.
    ///
    /// # Errors
    ///
    /// Returns [`CortexError::Dispatch`] when the backend cannot apply the
    /// command; the orchestrator records the failure and moves on.
    async fn execute(&self, command: &Command) -> Result<Option<String>, CortexError>;
}

/// Built-in connector that logs each command at `info` level – the actuator
/// stand-in for demo configurations and dry runs.
pub struct LogConnector {
    kind: String,
}

impl LogConnector {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[async_trait]
impl Connector for LogConnector {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, command: &Command) -> Result<Option<String>, CortexError> {
        info!(kind = %self.kind, command = ?command, "actuator (log)");
        Ok(Some("logged".to_string()))
    }
}

/// Built-in connector that silently accepts every command.
pub struct NullConnector {
    kind: String,
}

impl NullConnector {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[async_trait]
impl Connector for NullConnector {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, _command: &Command) -> Result<Option<String>, CortexError> {
        Ok(None)
    }
}
