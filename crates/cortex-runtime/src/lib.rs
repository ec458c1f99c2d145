//! `cortex-runtime` – The control loop engine.
//!
//! The sense–think–act cycle that every concrete robot/kiosk configuration
//! plugs into.  Each tick: harvest resolved promises, fuse the current
//! input buffers into one prompt, suppress duplicates, ask the model,
//! sanitize its commands, fan them out, and clear the consumed buffers.
//!
//! # Modules
//!
//! - [`pacer`] – [`Pacer`][pacer::Pacer]: the cadence controller.  Sleeps
//!   `1/rate` between ticks unless the persistent skip flag was raised by a
//!   source with buffered data (back-pressure relief).
//! - [`model`] – [`ModelClient`][model::ModelClient] +
//!   [`ChatModelClient`][model::ChatModelClient]: an OpenAI-compatible
//!   chat-completions driver.  The [`CommandBatch`][cortex_types::CommandBatch]
//!   JSON Schema is injected via `response_format` to force strictly typed
//!   output, and every request carries an explicit timeout.
//! - [`scheduler`] – [`Cortex`][scheduler::Cortex]: the runtime scheduler.
//!   A single perpetual loop whose tick body runs strictly sequentially;
//!   any tick failure is caught, logged, and treated as a no-op tick.  The
//!   agent falling silent is the explicit safe degraded mode.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter
//!   (set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export).

pub mod model;
pub mod pacer;
pub mod scheduler;
pub mod telemetry;

pub use model::{ChatModelClient, ModelClient, ModelError};
pub use pacer::Pacer;
pub use scheduler::{Cortex, TickOutcome, sanitize_commands};
pub use telemetry::{TracerProviderGuard, init_tracing};
