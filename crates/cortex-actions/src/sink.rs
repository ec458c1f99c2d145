//! [`CommandSink`] – the scheduler's fan-out seam.
//!
//! The scheduler does not know who consumes a tick's sanitized commands; it
//! hands the list to every registered sink.  The actuator orchestrator is
//! the primary sink; [`BusMirror`] publishes each command onto the bus so
//! simulators and background observers can follow along.  Sinks are
//! independent fan-outs, not a pipeline: a failure in one never reaches the
//! others.

use cortex_bus::{EventBus, Topic};
use cortex_types::{Command, Event, EventPayload};

use crate::orchestrator::ActionOrchestrator;

/// A parallel consumer of the tick's sanitized command list.
///
/// `accept` must not block the scheduler: implementations hand work off to
/// their own tasks and return.
pub trait CommandSink: Send + Sync {
    /// Short label used in dispatch logging.
    fn label(&self) -> &str;

    fn accept(&self, commands: &[Command]);
}

impl CommandSink for ActionOrchestrator {
    fn label(&self) -> &str {
        "actuators"
    }

    fn accept(&self, commands: &[Command]) {
        self.promise(commands);
    }
}

/// Mirrors every issued command onto the bus [`Topic::Commands`] lane.
pub struct BusMirror {
    bus: EventBus,
    source: String,
}

impl BusMirror {
    pub fn new(bus: EventBus, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }
}

impl CommandSink for BusMirror {
    fn label(&self) -> &str {
        "bus-mirror"
    }

    fn accept(&self, commands: &[Command]) {
        for command in commands {
            // No subscribers is a normal condition for the mirror lane.
            let _ = self.bus.publish_to(
                Topic::Commands,
                Event::new(
                    self.source.clone(),
                    EventPayload::CommandIssued(command.clone()),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_mirror_publishes_each_command() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Commands);
        let mirror = BusMirror::new(bus.clone(), "cortex-runtime::scheduler");

        let commands = vec![
            Command::Speak {
                text: "Hello".to_string(),
                language: None,
            },
            Command::Gesture {
                name: "wave".to_string(),
            },
        ];
        mirror.accept(&commands);

        let mut seen = Vec::new();
        while let Some(event) = rx.try_recv() {
            if let EventPayload::CommandIssued(cmd) = event.payload {
                seen.push(cmd);
            }
        }
        assert_eq!(seen, commands);
    }

    #[test]
    fn bus_mirror_without_subscribers_is_silent() {
        let bus = EventBus::default();
        let mirror = BusMirror::new(bus, "cortex-runtime::scheduler");
        // Must not panic or error outward.
        mirror.accept(&[Command::Gesture {
            name: "nod".to_string(),
        }]);
    }
}
