//! [`ConnectorRegistry`] – config-driven connector construction.
//!
//! The actuator twin of the source registry: a string type-name resolves to
//! a constructor closure, populated once at startup.  The `kind` the
//! connector will serve comes from the
//! [`ActionSpec`][cortex_types::ActionSpec], so the same implementation can
//! back several command kinds (one instance each).

use std::collections::HashMap;
use std::sync::Arc;

use cortex_types::{ActionSpec, CortexError};

use crate::connector::{Connector, LogConnector, NullConnector};

type ConnectorFactory =
    Box<dyn Fn(&ActionSpec) -> Result<Arc<dyn Connector>, CortexError> + Send + Sync>;

/// Compile-time registration table for connector implementations.
pub struct ConnectorRegistry {
    factories: HashMap<String, ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in implementations: `"log"` and
    /// `"null"`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", |spec| {
            Ok(Arc::new(LogConnector::new(spec.kind.clone())) as Arc<dyn Connector>)
        });
        registry.register("null", |spec| {
            Ok(Arc::new(NullConnector::new(spec.kind.clone())) as Arc<dyn Connector>)
        });
        registry
    }

    /// Register `factory` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ActionSpec) -> Result<Arc<dyn Connector>, CortexError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Construct the connector described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`CortexError::Config`] for an unknown implementation name.
    pub fn build(&self, spec: &ActionSpec) -> Result<Arc<dyn Connector>, CortexError> {
        match self.factories.get(&spec.connector) {
            Some(factory) => factory(spec),
            None => Err(CortexError::Config(format!(
                "unknown connector implementation '{}'",
                spec.connector
            ))),
        }
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
