//! `cortex-types` – Shared data model for the Cortex runtime.
//!
//! Every crate in the workspace speaks these types: the messages buffered by
//! input sources, the commands decoded from the language model, the promises
//! tracking in-flight actuator dispatches, the events routed over the bus,
//! and the global [`CortexError`].

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Sentinel payload the model emits when it decides no action is warranted.
/// Speak commands whose payload normalizes to this string are dropped before
/// dispatch.
pub const NO_ACTION_SENTINEL: &str = "no action";

/// The sensing channel an input source belongs to.
///
/// Template selection in the prompt composer keys off which modalities are
/// present in a tick, so every source must declare exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Transcribed speech.
    Voice,
    /// Scene/person descriptions from a camera pipeline.
    Vision,
    /// Badge or ID reader detections.
    Badge,
    /// Machine telemetry readings.
    Telemetry,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Voice => write!(f, "voice"),
            Modality::Vision => write!(f, "vision"),
            Modality::Badge => write!(f, "badge"),
            Modality::Telemetry => write!(f, "telemetry"),
        }
    }
}

/// A single timestamped text reading produced by an input source.
///
/// Immutable once created; appended by the source's polling task and read by
/// the prompt composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl Message {
    /// Stamp `text` with the current wall-clock time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

/// Strict definition of the actuator instructions the model is allowed to
/// request.  The connector registry routes each variant by its
/// [`kind`][Command::kind] string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Speak a sentence through the speech-synthesis connector.
    Speak {
        text: String,
        /// BCP-47-ish language tag, e.g. "en" or "es".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// Play a named gesture animation.
    Gesture { name: String },
    /// Drive toward a heading for a bounded distance.
    Move {
        heading_deg: f32,
        distance_m: f32,
    },
}

impl Command {
    /// The string key connectors register under.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Speak { .. } => "speak",
            Command::Gesture { .. } => "gesture",
            Command::Move { .. } => "move",
        }
    }
}

/// The model's full response: a list of commands to dispatch this tick.
///
/// This is the schema injected into the model request's `response_format`,
/// so the decoder never has to guess at free-form output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CommandBatch {
    pub commands: Vec<Command>,
}

/// Terminal states of a dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// Dispatched, connector has not reported back yet.
    Pending,
    /// The connector completed, optionally with a result payload
    /// (e.g. "speech finished").
    Success { detail: Option<String> },
    /// The connector failed, timed out, or its task died.
    Failure { detail: String },
}

impl Resolution {
    pub fn is_pending(&self) -> bool {
        matches!(self, Resolution::Pending)
    }
}

/// An in-flight record of a dispatched actuator command.
///
/// Owned by the action orchestrator until resolved; the resolution is read
/// exactly once by the next scheduler tick, then discarded.  Promises are
/// never retried automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promise {
    pub id: Uuid,
    pub command: Command,
    pub dispatched_at: DateTime<Utc>,
    pub resolution: Resolution,
}

/// Unified wrapper for traffic on the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "cortex-senses::mic"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Build a freshly stamped event.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// A fresh reading appended to a source buffer.
    Percept {
        source: String,
        modality: Modality,
        text: String,
    },
    /// A sanitized command fanned out by the scheduler; simulators and
    /// background observers subscribe to these.
    CommandIssued(Command),
    /// An operator- or fault-level notification.
    Alert { component: String, message: String },
}

/// Configuration entry for one input source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Registry type-name, e.g. "channel" or "scripted".
    pub kind: String,
    /// Unique instance name, e.g. "mic" or "lobby-cam".
    pub name: String,
    pub modality: Modality,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum buffered messages before the oldest is discarded.
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
    /// Language tag the driver reports for voice readings, when fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Canned readings for the "scripted" source kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<Vec<String>>,
}

fn default_poll_interval_ms() -> u64 {
    250
}
fn default_buffer_capacity() -> usize {
    16
}

/// Configuration entry for one actuator connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Command kind this connector handles, e.g. "speak".
    pub kind: String,
    /// Registry type-name of the connector implementation, e.g. "log".
    pub connector: String,
}

/// Single persistent back-pressure flag shared between input sources and the
/// cadence controller.
///
/// Raising an already-raised flag is a no-op (flag, not queue); consuming it
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct SkipFlag(Arc<AtomicBool>);

impl SkipFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the next cadence wait be skipped.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Atomically read and clear the flag.
    pub fn consume(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Global error type spanning source failures, model-call failures, and
/// actuator dispatch failures.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum CortexError {
    #[error("Source '{source_name}' unavailable: {details}")]
    SourceUnavailable {
        #[serde(rename = "source")]
        source_name: String,
        details: String,
    },

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Dispatch failed for '{kind}': {details}")]
    Dispatch { kind: String, details: String },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
