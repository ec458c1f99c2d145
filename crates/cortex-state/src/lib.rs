//! `cortex-state` – The shared telemetry store.
//!
//! A single [`Blackboard`][blackboard::Blackboard] instance is constructed at
//! startup and handed by `Arc` to every component that needs it: source
//! polling tasks record their latest readings, the prompt composer records
//! its fuse trace, the scheduler records prompts/responses and tick marks,
//! and external diagnostics read a consistent [`BlackboardSnapshot`]
//! [blackboard::BlackboardSnapshot].  Observability and duplicate detection
//! only; no business logic lives here.

pub mod blackboard;

pub use blackboard::{Blackboard, BlackboardSnapshot, InputRecord};
