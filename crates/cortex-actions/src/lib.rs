//! `cortex-actions` – The acting layer.
//!
//! Takes the sanitized command list the scheduler decided on and turns it
//! into tracked actuator dispatches: every command becomes a promise that
//! resolves to success or failure, read exactly once by the next tick.  One
//! failing actuator never blocks or kills a sibling dispatch.
//!
//! # Modules
//!
//! - [`connector`] – [`Connector`][connector::Connector]: the plugin trait
//!   every actuator backend implements, plus the built-in
//!   [`LogConnector`][connector::LogConnector] and
//!   [`NullConnector`][connector::NullConnector].
//! - [`registry`] – [`ConnectorRegistry`][registry::ConnectorRegistry]:
//!   maps a config type-name to a connector constructor, resolved once at
//!   startup.
//! - [`orchestrator`] – [`ActionOrchestrator`][orchestrator::ActionOrchestrator]:
//!   the promise table + result channel; per-kind sequential dispatch with
//!   explicit timeouts and non-blocking `flush_promises`.
//! - [`sink`] – [`CommandSink`][sink::CommandSink]: the scheduler's fan-out
//!   seam, with [`BusMirror`][sink::BusMirror] publishing every issued
//!   command onto the bus for simulators and background observers.

pub mod connector;
pub mod orchestrator;
pub mod registry;
pub mod sink;

pub use connector::{Connector, LogConnector, NullConnector};
pub use orchestrator::ActionOrchestrator;
pub use registry::ConnectorRegistry;
pub use sink::{BusMirror, CommandSink};
