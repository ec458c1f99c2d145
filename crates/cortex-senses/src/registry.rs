//! [`SourceRegistry`] – config-driven source construction.
//!
//! Maps a string type-name (the `kind` field of a
//! [`SourceSpec`][cortex_types::SourceSpec]) to a constructor closure.  The
//! table is populated once at startup – built-ins plus whatever the embedding
//! binary registers – and resolved when the configuration is loaded.  No
//! reflection, no dynamic loading.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cortex_types::{CortexError, SourceSpec};

use crate::channel::{ChannelFeed, ChannelSource};
use crate::scripted::ScriptedSource;
use crate::source::InputSource;

/// A constructed source plus, for channel-backed kinds, the feed handle the
/// embedding binary uses to inject readings.
pub struct BuiltSource {
    pub source: Arc<dyn InputSource>,
    pub feed: Option<ChannelFeed>,
}

type SourceFactory = Box<dyn Fn(&SourceSpec) -> Result<BuiltSource, CortexError> + Send + Sync>;

/// Compile-time registration table for input source implementations.
pub struct SourceRegistry {
    factories: HashMap<String, SourceFactory>,
}

impl SourceRegistry {
    /// An empty registry, for embedders that want full control.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in kinds: `"channel"` and
    /// `"scripted"`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("channel", |spec| {
            let (source, feed) = ChannelSource::new(
                spec.name.clone(),
                spec.modality,
                Duration::from_millis(spec.poll_interval_ms),
                spec.capacity,
                spec.language.clone(),
            );
            Ok(BuiltSource {
                source: Arc::new(source),
                feed: Some(feed),
            })
        });
        registry.register("scripted", |spec| {
            let script = spec.script.clone().ok_or_else(|| {
                CortexError::Config(format!(
                    "scripted source '{}' requires a script list",
                    spec.name
                ))
            })?;
            Ok(BuiltSource {
                source: Arc::new(ScriptedSource::new(
                    spec.name.clone(),
                    spec.modality,
                    Duration::from_millis(spec.poll_interval_ms),
                    spec.capacity,
                    script,
                )),
                feed: None,
            })
        });
        registry
    }

    /// Register `factory` under `kind`, replacing any previous registration.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&SourceSpec) -> Result<BuiltSource, CortexError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_string(), Box::new(factory));
    }

    /// Construct the source described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`CortexError::Config`] for an unknown type-name or a spec
    /// the factory rejects.
    pub fn build(&self, spec: &SourceSpec) -> Result<BuiltSource, CortexError> {
        match self.factories.get(&spec.kind) {
            Some(factory) => factory(spec),
            None => Err(CortexError::Config(format!(
                "unknown input source kind '{}'",
                spec.kind
            ))),
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
