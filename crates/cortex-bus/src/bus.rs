//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Traffic is partitioned into three [`Topic`] lanes so components only
//! receive the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Percepts`] | Fresh readings appended to source buffers |
//! | [`Topic::Commands`] | Sanitized commands fanned out each tick |
//! | [`Topic::Alerts`] | Operator halts, source faults, degraded-mode notices |

use cortex_types::{CortexError, Event};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Fresh readings from input sources.
    Percepts,
    /// Sanitized commands issued by the scheduler; the observation lane for
    /// simulators and background orchestrators.
    Commands,
    /// Operator- and fault-level notifications.
    Alerts,
}

/// Shared event bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    percepts: broadcast::Sender<Event>,
    commands: broadcast::Sender<Event>,
    alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given per-topic channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (percepts, _) = broadcast::channel(capacity);
        let (commands, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self {
            percepts,
            commands,
            alerts,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    ///
    /// # Errors
    ///
    /// Returns [`CortexError::Channel`] when no subscriber is currently
    /// listening on the topic.  Publishers that treat an unobserved event as
    /// normal (the common case) ignore this error.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, CortexError> {
        self.topic_sender(topic).send(event).map_err(|_| {
            CortexError::Channel(format!("no subscribers for topic {topic:?}"))
        })
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Percepts => &self.percepts,
            Topic::Commands => &self.commands,
            Topic::Alerts => &self.alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// A lagged subscriber logs the dropped count and keeps receiving;
    /// `None` means the bus has shut down.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`][Self::recv]: returns whatever is
    /// already buffered, skipping over lag gaps.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_types::{Command, EventPayload, Modality};

    fn percept(source: &str) -> Event {
        Event::new(
            format!("cortex-senses::{source}"),
            EventPayload::Percept {
                source: source.to_string(),
                modality: Modality::Voice,
                text: "hello".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn publish_and_receive_on_topic() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Percepts);

        let event = percept("mic");
        bus.publish_to(Topic::Percepts, event.clone()).unwrap();

        let received = rx.recv().await.expect("event expected");
        assert_eq!(received.id, event.id);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::Alerts);
        let _percepts = bus.subscribe_to(Topic::Percepts);

        bus.publish_to(Topic::Percepts, percept("mic")).unwrap();

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "alerts lane must not see percept traffic");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe_to(Topic::Commands);
        let mut rx2 = bus.subscribe_to(Topic::Commands);

        let event = Event::new(
            "cortex-runtime::scheduler",
            EventPayload::CommandIssued(Command::Gesture {
                name: "wave".to_string(),
            }),
        );
        bus.publish_to(Topic::Commands, event.clone()).unwrap();

        assert_eq!(rx1.recv().await.unwrap().id, event.id);
        assert_eq!(rx2.recv().await.unwrap().id, event.id);
    }

    #[test]
    fn publish_without_subscribers_returns_channel_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Alerts, percept("mic"));
        assert!(matches!(result, Err(CortexError::Channel(_))));
    }

    #[test]
    fn try_recv_drains_buffered_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Percepts);
        bus.publish_to(Topic::Percepts, percept("mic")).unwrap();
        bus.publish_to(Topic::Percepts, percept("cam")).unwrap();

        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn slow_subscriber_lags_without_panicking() {
        let bus = EventBus::new(8);
        let mut slow = bus.subscribe_to(Topic::Percepts);

        for _ in 0..1_000 {
            let _ = bus.publish_to(Topic::Percepts, percept("flood"));
        }

        // The receiver skips over the lag gap and still yields an event.
        assert!(slow.recv().await.is_some());
    }
}
