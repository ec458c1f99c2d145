//! [`ChannelSource`] – an in-process input source fed over an mpsc channel.
//!
//! The generic driver for anything that pushes text into the runtime from
//! inside the same process: the operator REPL's `/say`, integration tests,
//! or a bridging task that adapts an external feed.  The paired
//! [`ChannelFeed`] handle is cloneable and cheap to pass around.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cortex_types::{CortexError, Message, Modality};
use tokio::sync::mpsc;
use tracing::warn;

use crate::buffer::MessageBuffer;
use crate::marker;
use crate::source::{InputSource, RawReading};

/// Producer handle paired with a [`ChannelSource`].
#[derive(Clone, Debug)]
pub struct ChannelFeed {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelFeed {
    /// Queue one reading.  Returns `false` when the source has been dropped.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}

/// In-process source for one modality, fed through a [`ChannelFeed`].
pub struct ChannelSource {
    name: String,
    modality: Modality,
    poll_interval: Duration,
    /// Language tag applied to voice lines, when the feeder's backend
    /// reports one.
    language: Option<String>,
    buffer: MessageBuffer,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ChannelSource {
    /// Build the source and its paired feed handle.
    pub fn new(
        name: impl Into<String>,
        modality: Modality,
        poll_interval: Duration,
        capacity: usize,
        language: Option<String>,
    ) -> (Self, ChannelFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.into(),
                modality,
                poll_interval,
                language,
                buffer: MessageBuffer::new(capacity),
                rx: Mutex::new(rx),
            },
            ChannelFeed { tx },
        )
    }

    /// Tag `text` with this source's modality marker.
    fn tag(&self, text: &str) -> String {
        match self.modality {
            Modality::Voice => marker::voice_line(self.language.as_deref(), text),
            // Badge readers hand back the holder's name; wrap it unless the
            // driver already emitted a field list.
            Modality::Badge if !text.contains('=') => {
                marker::line(self.modality, &format!("name={text}"))
            }
            _ => marker::line(self.modality, text),
        }
    }
}

#[async_trait]
impl InputSource for ChannelSource {
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
        let mut rx = self.rx.lock().expect("channel mutex poisoned");
        match rx.try_recv() {
            Ok(text) => Ok(Some(RawReading::Text(text))),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(CortexError::SourceUnavailable {
                    source_name: self.name.clone(),
                    details: "feed disconnected".to_string(),
                })
            }
        }
    }

    fn raw_to_text(&self, raw: RawReading) -> Option<Message> {
        match raw {
            RawReading::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(Message::now(self.tag(text)))
            }
            RawReading::Bytes(_) => {
                warn!(source = %self.name, "channel source received a byte payload; dropped");
                None
            }
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
        // Vision keeps only its latest scene description; everything else is
        // consumed by the tick that reads it.
        self.modality != Modality::Vision
    }
}
