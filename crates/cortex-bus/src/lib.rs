//! `cortex-bus` – Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  The runtime scheduler fans sanitized commands out over the
//! [`Topic::Commands`] lane, which is how simulators and other background
//! observers watch the agent act without touching the actuator path.
//!
//! # Modules
//!
//! - [`bus`] – [`EventBus`][bus::EventBus]: per-topic broadcast channels
//!   with non-blocking publish and lag-tolerant receivers.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
