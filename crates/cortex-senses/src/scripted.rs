//! [`ScriptedSource`] – replays a fixed list of readings, one per poll.
//!
//! Used for demo configurations and deterministic tests: the script is
//! consumed front to back, after which the source reports no new readings.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cortex_types::{CortexError, Message, Modality};

use crate::buffer::MessageBuffer;
use crate::marker;
use crate::source::{InputSource, RawReading};

/// Input source that yields each scripted reading exactly once.
pub struct ScriptedSource {
    name: String,
    modality: Modality,
    poll_interval: Duration,
    buffer: MessageBuffer,
    script: Mutex<VecDeque<String>>,
}

impl ScriptedSource {
    pub fn new(
        name: impl Into<String>,
        modality: Modality,
        poll_interval: Duration,
        capacity: usize,
        script: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            modality,
            poll_interval,
            buffer: MessageBuffer::new(capacity),
            script: Mutex::new(script.into()),
        }
    }

    /// Readings not yet replayed.
    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script mutex poisoned").len()
    }
}

#[async_trait]
impl InputSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn poll(&self) -> Result<Option<RawReading>, CortexError> {
        let next = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front();
        Ok(next.map(RawReading::Text))
    }

    fn raw_to_text(&self, raw: RawReading) -> Option<Message> {
        match raw {
            RawReading::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                let line = match self.modality {
                    Modality::Voice => marker::voice_line(None, text),
                    Modality::Badge if !text.contains('=') => {
                        marker::line(self.modality, &format!("name={text}"))
                    }
                    _ => marker::line(self.modality, text),
                };
                Some(Message::now(line))
            }
            RawReading::Bytes(_) => None,
        }
    }

    fn append(&self, message: Message) {
        self.buffer.push(message);
    }

    fn format_buffer(&self) -> Option<String> {
        let texts = self.buffer.texts();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }

    fn clear_buffer(&self) {
        self.buffer.clear();
    }

    fn streaming(&self) -> bool {
        self.modality != Modality::Vision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_is_consumed_front_to_back() {
        let source = ScriptedSource::new(
            "demo",
            Modality::Vision,
            Duration::from_millis(10),
            4,
            vec!["person=Alice".to_string(), "person=Bob".to_string()],
        );
        assert_eq!(source.remaining(), 2);

        let first = source.poll().await.unwrap().unwrap();
        assert_eq!(first, RawReading::Text("person=Alice".to_string()));
        let second = source.poll().await.unwrap().unwrap();
        assert_eq!(second, RawReading::Text("person=Bob".to_string()));
        assert!(source.poll().await.unwrap().is_none());
    }

    #[test]
    fn vision_reading_keeps_field_body() {
        let source = ScriptedSource::new(
            "demo",
            Modality::Vision,
            Duration::from_millis(10),
            4,
            Vec::new(),
        );
        let msg = source
            .raw_to_text(RawReading::Text("person=Alice".to_string()))
            .unwrap();
        assert_eq!(msg.text, "[vision] person=Alice");
    }
}
