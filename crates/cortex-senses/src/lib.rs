//! `cortex-senses` – The sensing layer.
//!
//! Everything between raw hardware/service readings and the text buffers the
//! prompt composer fuses: the [`InputSource`] plugin trait, the bounded
//! per-source message buffer, the modality markers that formatted buffers
//! carry, the string-keyed source registry, and the orchestrator that polls
//! every configured source concurrently.
//!
//! # Modules
//!
//! - [`source`] – [`InputSource`][source::InputSource]: the plugin trait
//!   every modality driver implements (poll raw, convert to text, format
//!   the latest buffer).
//! - [`buffer`] – [`MessageBuffer`][buffer::MessageBuffer]: bounded FIFO of
//!   timestamped readings, oldest-out on overflow.
//! - [`marker`] – structural markers (`[voice …]`, `[vision]`, `[badge]`)
//!   the composer uses to classify which modalities are present.
//! - [`channel`] – [`ChannelSource`][channel::ChannelSource]: an in-process
//!   source fed over an mpsc channel; the operator REPL and the test
//!   harness speak to the runtime through it.
//! - [`scripted`] – [`ScriptedSource`][scripted::ScriptedSource]: replays a
//!   fixed list of readings, one per poll.
//! - [`registry`] – [`SourceRegistry`][registry::SourceRegistry]: maps a
//!   config type-name to a constructor, resolved once at startup.
//! - [`orchestrator`] – [`InputOrchestrator`][orchestrator::InputOrchestrator]:
//!   one independent polling task per source, degraded mode after repeated
//!   unavailability, skip-flag raising on fresh data.

pub mod buffer;
pub mod channel;
pub mod marker;
pub mod orchestrator;
pub mod registry;
pub mod scripted;
pub mod source;

pub use buffer::MessageBuffer;
pub use channel::{ChannelFeed, ChannelSource};
pub use orchestrator::InputOrchestrator;
pub use registry::{BuiltSource, SourceRegistry};
pub use scripted::ScriptedSource;
pub use source::{InputSource, RawReading};
