//! [`Blackboard`] – process-wide, concurrency-safe key/value state.
//!
//! The store is partitioned into logical field groups (inputs, prompt,
//! response, ticks), each guarded by its own mutex.  Every accessor is its
//! own critical section; callers must not assume atomicity across two
//! separate reads or writes.  No mutex is ever held across a suspension
//! point – all accessors are synchronous and short.
//!
//! The blackboard is constructed explicitly and dependency-injected, never
//! reached through a global.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Field groups
// ────────────────────────────────────────────────────────────────────────────

/// Latest formatted reading recorded by one input source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PromptGroup {
    /// The assembled static context, recorded once at composer
    /// construction.
    static_context: Option<String>,
    /// The last prompt actually sent to the model.  Written only by the
    /// scheduler, after the duplicate check passes.
    last_sent: Option<String>,
    /// The last prompt the composer fused, sent or not.
    last_fused: Option<String>,
    fuse_started_at: Option<DateTime<Utc>>,
    fuse_ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ResponseGroup {
    last_response: Option<String>,
    received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct TickGroup {
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    count: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Blackboard
// ────────────────────────────────────────────────────────────────────────────

/// The shared telemetry store.
///
/// Mutated from every source polling task, the scheduler, and the prompt
/// composer; read by external diagnostics through [`Blackboard::snapshot`].
#[derive(Debug, Default)]
pub struct Blackboard {
    inputs: Mutex<HashMap<String, InputRecord>>,
    prompt: Mutex<PromptGroup>,
    response: Mutex<ResponseGroup>,
    ticks: Mutex<TickGroup>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    // ── inputs ────────────────────────────────────────────────────────────

    /// Record the latest formatted reading for `source`.
    pub fn record_input(&self, source: &str, text: &str) {
        let mut inputs = self.inputs.lock().expect("inputs mutex poisoned");
        inputs.insert(
            source.to_string(),
            InputRecord {
                text: text.to_string(),
                recorded_at: Utc::now(),
            },
        );
    }

    /// Latest recorded reading for `source`, if any.
    pub fn input(&self, source: &str) -> Option<InputRecord> {
        self.inputs
            .lock()
            .expect("inputs mutex poisoned")
            .get(source)
            .cloned()
    }

    // ── prompt ────────────────────────────────────────────────────────────

    /// Record the one-time static context for the diagnostics surface.
    pub fn record_static_context(&self, text: &str) {
        self.prompt
            .lock()
            .expect("prompt mutex poisoned")
            .static_context = Some(text.to_string());
    }

    /// Record the composer's fuse trace: the fused prompt plus its start and
    /// end stamps.
    pub fn record_fuse(
        &self,
        prompt: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) {
        let mut group = self.prompt.lock().expect("prompt mutex poisoned");
        group.last_fused = Some(prompt.to_string());
        group.fuse_started_at = Some(started_at);
        group.fuse_ended_at = Some(ended_at);
    }

    /// The last prompt actually sent to the model.
    pub fn last_sent_prompt(&self) -> Option<String> {
        self.prompt
            .lock()
            .expect("prompt mutex poisoned")
            .last_sent
            .clone()
    }

    /// Mark `prompt` as sent.  Called by the scheduler alone, after the
    /// duplicate check passes.
    pub fn record_sent_prompt(&self, prompt: &str) {
        self.prompt
            .lock()
            .expect("prompt mutex poisoned")
            .last_sent = Some(prompt.to_string());
    }

    // ── response ──────────────────────────────────────────────────────────

    /// Record the model's raw response for diagnostics.
    pub fn record_response(&self, response: &str) {
        let mut group = self.response.lock().expect("response mutex poisoned");
        group.last_response = Some(response.to_string());
        group.received_at = Some(Utc::now());
    }

    // ── ticks ─────────────────────────────────────────────────────────────

    pub fn tick_started(&self) {
        let mut group = self.ticks.lock().expect("ticks mutex poisoned");
        group.started_at = Some(Utc::now());
        group.count += 1;
    }

    pub fn tick_ended(&self) {
        self.ticks.lock().expect("ticks mutex poisoned").ended_at = Some(Utc::now());
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.lock().expect("ticks mutex poisoned").count
    }

    // ── read surface ──────────────────────────────────────────────────────

    /// A consistent-per-group, read-only copy of the store for external
    /// diagnostics.  Intended for logging and operator inspection, not for
    /// control flow.
    pub fn snapshot(&self) -> BlackboardSnapshot {
        let inputs = self
            .inputs
            .lock()
            .expect("inputs mutex poisoned")
            .clone();
        let (static_context, last_sent, last_fused, fuse_started_at, fuse_ended_at) = {
            let group = self.prompt.lock().expect("prompt mutex poisoned");
            (
                group.static_context.clone(),
                group.last_sent.clone(),
                group.last_fused.clone(),
                group.fuse_started_at,
                group.fuse_ended_at,
            )
        };
        let (last_response, response_at) = {
            let group = self.response.lock().expect("response mutex poisoned");
            (group.last_response.clone(), group.received_at)
        };
        let (tick_started_at, tick_ended_at, tick_count) = {
            let group = self.ticks.lock().expect("ticks mutex poisoned");
            (group.started_at, group.ended_at, group.count)
        };
        BlackboardSnapshot {
            inputs,
            static_context,
            last_prompt: last_sent,
            last_fused,
            fuse_started_at,
            fuse_ended_at,
            last_response,
            response_at,
            tick_started_at,
            tick_ended_at,
            tick_count,
        }
    }
}

/// Read-only view of the blackboard, serializable for diagnostics surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackboardSnapshot {
    pub inputs: HashMap<String, InputRecord>,
    pub static_context: Option<String>,
    pub last_prompt: Option<String>,
    pub last_fused: Option<String>,
    pub fuse_started_at: Option<DateTime<Utc>>,
    pub fuse_ended_at: Option<DateTime<Utc>>,
    pub last_response: Option<String>,
    pub response_at: Option<DateTime<Utc>>,
    pub tick_started_at: Option<DateTime<Utc>>,
    pub tick_ended_at: Option<DateTime<Utc>>,
    pub tick_count: u64,
}
