//! `cortex-fuser` – The prompt composer.
//!
//! Builds the immutable static system context once, and on every tick fuses
//! whatever input buffers are currently non-empty into one small dynamic
//! prompt, selecting a response-shaping template from the modalities
//! present.  This crate never talks to the model client – it only builds
//! text.
//!
//! # Modules
//!
//! - [`context`] – [`StaticContext`][context::StaticContext]: persona,
//!   rules, examples, action catalogue, and optional knowledge text,
//!   assembled exactly once and shared by `Arc` for the process lifetime.
//! - [`greeting`] – [`GreetingLedger`][greeting::GreetingLedger]: the
//!   proactive-greeting state machine (greeted/not-yet-greeted with a timed
//!   reset edge) plus the person-presence memory window.
//! - [`fuser`] – [`Fuser`][fuser::Fuser]: the per-tick fuse algorithm –
//!   concatenate buffers, classify modalities by their structural markers,
//!   track the spoken language, pick one of the mutually exclusive
//!   templates, and record the trace on the blackboard.

pub mod context;
pub mod fuser;
pub mod greeting;

pub use context::StaticContext;
pub use fuser::{FusedPrompt, Fuser, FuserConfig, GreetingPolicy};
pub use greeting::GreetingLedger;
