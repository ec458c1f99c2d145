//! [`InputOrchestrator`] – one independent polling task per source.
//!
//! Each configured [`InputSource`] gets its own tokio task running the same
//! loop: poll the raw reading (which may suspend on a hardware or network
//! round trip), convert it to text, append it to the source's buffer, record
//! it on the blackboard, publish a percept on the bus, and raise the
//! cadence skip flag so the scheduler does not sleep on buffered input.
//! A slow vision poll never delays voice transcription – the tasks share
//! nothing but the blackboard and the bus.
//!
//! # Failure policy
//!
//! A failing poll is logged and retried after a fixed multiple of the
//! source's poll interval.  Three consecutive unavailable polls put the
//! source into degraded mode: it keeps being polled, but only to probe
//! availability, and an alert is published.  The first successful poll
//! re-enables it.  The orchestrator itself never terminates on a source
//! failure.

use std::sync::Arc;

use cortex_bus::{EventBus, Topic};
use cortex_state::Blackboard;
use cortex_types::{CortexError, Event, EventPayload, SkipFlag};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::source::InputSource;

/// Consecutive unavailable polls before a source degrades.
const UNAVAILABLE_THRESHOLD: u32 = 3;
/// Backoff multiplier applied to the poll interval after a failed poll.
const RETRY_MULTIPLIER: u32 = 2;

/// Owns the configured sources and runs their polling tasks.
pub struct InputOrchestrator {
    sources: Vec<Arc<dyn InputSource>>,
    blackboard: Arc<Blackboard>,
    bus: EventBus,
    skip: SkipFlag,
}

impl InputOrchestrator {
    pub fn new(
        sources: Vec<Arc<dyn InputSource>>,
        blackboard: Arc<Blackboard>,
        bus: EventBus,
        skip: SkipFlag,
    ) -> Self {
        Self {
            sources,
            blackboard,
            bus,
            skip,
        }
    }

    /// The sources in registration order, as the composer consumes them.
    pub fn sources(&self) -> &[Arc<dyn InputSource>] {
        &self.sources
    }

    /// Spawn one polling task per source.  The tasks run until the process
    /// shuts down (or the returned handles are aborted).
    pub fn listen(&self) -> Vec<JoinHandle<()>> {
        self.sources
            .iter()
            .map(|source| {
                tokio::spawn(poll_loop(
                    Arc::clone(source),
                    Arc::clone(&self.blackboard),
                    self.bus.clone(),
                    self.skip.clone(),
                ))
            })
            .collect()
    }
}

async fn poll_loop(
    source: Arc<dyn InputSource>,
    blackboard: Arc<Blackboard>,
    bus: EventBus,
    skip: SkipFlag,
) {
    let name = source.name().to_string();
    let interval = source.poll_interval();
    let mut consecutive_unavailable: u32 = 0;
    let mut degraded = false;

    info!(source = %name, modality = %source.modality(), "source polling task started");

    loop {
        match source.poll().await {
            Ok(Some(raw)) => {
                if degraded {
                    info!(source = %name, "source available again; leaving degraded mode");
                    degraded = false;
                }
                consecutive_unavailable = 0;

                if let Some(message) = source.raw_to_text(raw) {
                    blackboard.record_input(&name, &message.text);
                    let _ = bus.publish_to(
                        Topic::Percepts,
                        Event::new(
                            format!("cortex-senses::{name}"),
                            EventPayload::Percept {
                                source: name.clone(),
                                modality: source.modality(),
                                text: message.text.clone(),
                            },
                        ),
                    );
                    source.append(message);
                    // More input is already buffered: the scheduler should
                    // not sleep a full cadence period before consuming it.
                    skip.raise();
                }
                tokio::time::sleep(interval).await;
            }
            Ok(None) => {
                if degraded {
                    info!(source = %name, "source available again; leaving degraded mode");
                    degraded = false;
                }
                consecutive_unavailable = 0;
                tokio::time::sleep(interval).await;
            }
            Err(CortexError::SourceUnavailable { details, .. }) => {
                consecutive_unavailable += 1;
                if !degraded && consecutive_unavailable >= UNAVAILABLE_THRESHOLD {
                    degraded = true;
                    warn!(
                        source = %name,
                        failures = consecutive_unavailable,
                        "source entering degraded mode; polling for availability only"
                    );
                    let _ = bus.publish_to(
                        Topic::Alerts,
                        Event::new(
                            format!("cortex-senses::{name}"),
                            EventPayload::Alert {
                                component: name.clone(),
                                message: format!("source degraded: {details}"),
                            },
                        ),
                    );
                } else if !degraded {
                    warn!(source = %name, failures = consecutive_unavailable, error = %details, "source poll unavailable");
                } else {
                    debug!(source = %name, "degraded source still unavailable");
                }
                tokio::time::sleep(interval * RETRY_MULTIPLIER).await;
            }
            Err(e) => {
                // Non-availability errors do not count toward degradation;
                // log and retry on the backed-off interval.
                warn!(source = %name, error = %e, "source poll failed");
                tokio::time::sleep(interval * RETRY_MULTIPLIER).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cortex_types::{Message, Modality};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::buffer::MessageBuffer;
    use crate::source::RawReading;

    /// Yields `Unavailable` for the first `failures` polls, then a reading.
    struct FlakySource {
        name: String,
        failures: u32,
        polls: AtomicU32,
        buffer: MessageBuffer,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self {
                name: "flaky".to_string(),
                failures,
                polls: AtomicU32::new(0),
                buffer: MessageBuffer::new(4),
            }
        }
    }

    #[async_trait]
    impl InputSource for FlakySource {
        fn name(&self) -> &str {
            &self.name
        }
        fn modality(&self) -> Modality {
            Modality::Voice
        }
        fn poll_interval(&self) -> Duration {
            Duration::from_millis(1)
        }
        async fn poll(&self) -> Result<Option<RawReading>, CortexError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(CortexError::SourceUnavailable {
                    source_name: self.name.clone(),
                    details: "no provider".to_string(),
                })
            } else if n == self.failures {
                Ok(Some(RawReading::Text("recovered".to_string())))
            } else {
                Ok(None)
            }
        }
        fn raw_to_text(&self, raw: RawReading) -> Option<Message> {
            match raw {
                RawReading::Text(t) => Some(Message::now(format!("[voice] {t}"))),
                RawReading::Bytes(_) => None,
            }
        }
        fn append(&self, message: Message) {
            self.buffer.push(message);
        }
        fn format_buffer(&self) -> Option<String> {
            let texts = self.buffer.texts();
            (!texts.is_empty()).then(|| texts.join("\n"))
        }
        fn clear_buffer(&self) {
            self.buffer.clear();
        }
        fn streaming(&self) -> bool {
            true
        }
    }

    /// Sleeps forever on poll – a stand-in for a slow modality.
    struct StalledSource {
        buffer: MessageBuffer,
    }

    #[async_trait]
    impl InputSource for StalledSource {
        fn name(&self) -> &str {
            "stalled"
        }
        fn modality(&self) -> Modality {
            Modality::Vision
        }
        fn poll_interval(&self) -> Duration {
            Duration::from_millis(1)
        }
        async fn poll(&self) -> Result<Option<RawReading>, CortexError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
        fn raw_to_text(&self, _raw: RawReading) -> Option<Message> {
            None
        }
        fn append(&self, _message: Message) {}
        fn format_buffer(&self) -> Option<String> {
            None
        }
        fn clear_buffer(&self) {}
        fn streaming(&self) -> bool {
            false
        }
    }

    fn harness(
        sources: Vec<Arc<dyn InputSource>>,
    ) -> (InputOrchestrator, Arc<Blackboard>, EventBus, SkipFlag) {
        let blackboard = Arc::new(Blackboard::new());
        let bus = EventBus::default();
        let skip = SkipFlag::new();
        let orchestrator = InputOrchestrator::new(
            sources,
            Arc::clone(&blackboard),
            bus.clone(),
            skip.clone(),
        );
        (orchestrator, blackboard, bus, skip)
    }

    #[tokio::test]
    async fn reading_lands_in_buffer_blackboard_and_bus() {
        let (channel, feed) = crate::channel::ChannelSource::new(
            "mic",
            Modality::Voice,
            Duration::from_millis(1),
            8,
            None,
        );
        let source: Arc<dyn InputSource> = Arc::new(channel);
        let (orchestrator, blackboard, bus, skip) = harness(vec![Arc::clone(&source)]);
        let mut percepts = bus.subscribe_to(Topic::Percepts);

        let handles = orchestrator.listen();
        feed.push("What are your hours?");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            source.format_buffer().unwrap(),
            "[voice] What are your hours?"
        );
        assert!(blackboard.input("mic").is_some());
        assert!(skip.is_raised());
        assert!(percepts.try_recv().is_some());

        for h in handles {
            h.abort();
        }
    }

    #[tokio::test]
    async fn source_degrades_after_three_unavailable_polls_then_recovers() {
        let flaky = Arc::new(FlakySource::new(UNAVAILABLE_THRESHOLD));
        let source: Arc<dyn InputSource> = Arc::clone(&flaky) as Arc<dyn InputSource>;
        let (orchestrator, _blackboard, bus, _skip) = harness(vec![source]);
        let mut alerts = bus.subscribe_to(Topic::Alerts);

        let handles = orchestrator.listen();
        // Three failures (with backoff) then recovery.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let alert = alerts.try_recv().expect("degraded alert expected");
        assert!(matches!(
            alert.payload,
            EventPayload::Alert { ref component, .. } if component == "flaky"
        ));
        // Recovery: the reading after the failures made it into the buffer.
        assert_eq!(flaky.format_buffer().unwrap(), "[voice] recovered");

        for h in handles {
            h.abort();
        }
    }

    #[tokio::test]
    async fn slow_source_does_not_block_fast_source() {
        let (channel, feed) = crate::channel::ChannelSource::new(
            "mic",
            Modality::Voice,
            Duration::from_millis(1),
            8,
            None,
        );
        let fast: Arc<dyn InputSource> = Arc::new(channel);
        let slow: Arc<dyn InputSource> = Arc::new(StalledSource {
            buffer: MessageBuffer::new(1),
        });
        let (orchestrator, blackboard, _bus, _skip) =
            harness(vec![slow, Arc::clone(&fast)]);

        let handles = orchestrator.listen();
        feed.push("hello");
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The stalled vision source must not delay the voice reading.
        assert!(blackboard.input("mic").is_some());

        for h in handles {
            h.abort();
        }
    }

    #[tokio::test]
    async fn empty_poll_does_not_raise_skip_flag() {
        let (channel, _feed) = crate::channel::ChannelSource::new(
            "mic",
            Modality::Voice,
            Duration::from_millis(1),
            8,
            None,
        );
        let source: Arc<dyn InputSource> = Arc::new(channel);
        let (orchestrator, _blackboard, _bus, skip) = harness(vec![source]);

        let handles = orchestrator.listen();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!skip.is_raised());

        for h in handles {
            h.abort();
        }
    }
}
