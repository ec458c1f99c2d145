//! The [`InputSource`] plugin trait.
//!
//! Concrete modality drivers (speech-to-text, vision captioners, badge
//! readers, telemetry taps) implement this trait and are registered through
//! the [`SourceRegistry`][crate::registry::SourceRegistry].  The rest of the
//! runtime only ever talks to the trait, so drivers can be swapped without
//! touching fusing or scheduling logic.

use std::time::Duration;

use async_trait::async_trait;
use cortex_types::{CortexError, Message, Modality};

/// An untyped reading as produced by a driver's poll, before conversion to
/// text.  Speech and vision backends usually hand back text directly; byte
/// payloads cover drivers whose conversion step does real decoding work.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReading {
    Text(String),
    Bytes(Vec<u8>),
}

/// A pluggable producer of timestamped text readings for one modality.
///
/// # Contract
///
/// * [`poll`][Self::poll] may suspend (hardware read, network round trip)
///   and returns `Ok(None)` when no new reading is available – a normal
///   condition, not an error.
/// * [`raw_to_text`][Self::raw_to_text] converts a raw reading into a
///   [`Message`], or `None` when the reading carries nothing usable.
/// * [`append`][Self::append] adds a converted message to the source's own
///   bounded buffer; only the orchestrator's polling task calls it.
/// * [`format_buffer`][Self::format_buffer] renders the current buffer as
///   marker-tagged text for the prompt composer, or `None` when empty.
/// * [`clear_buffer`][Self::clear_buffer] is called by the scheduler after
///   a tick consumed a streaming source's content; latest-value sources
///   self-trim instead and report [`streaming`][Self::streaming] = false.
#[async_trait]
pub trait InputSource: Send + Sync {
    /// Unique instance name, e.g. `"mic"` or `"lobby-cam"`.
    fn name(&self) -> &str;

    fn modality(&self) -> Modality;

    /// How long the orchestrator sleeps between polls of this source.
    fn poll_interval(&self) -> Duration;

    /// Fetch the next raw reading, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CortexError::SourceUnavailable`] when the backing
    /// hardware/service cannot currently produce readings; the orchestrator
    /// counts these toward the degraded-mode threshold.
    async fn poll(&self) -> Result<Option<RawReading>, CortexError>;

    /// Convert a raw reading into a timestamped message.
    fn raw_to_text(&self, raw: RawReading) -> Option<Message>;

    /// Append a converted message to this source's buffer.
    fn append(&self, message: Message);

    /// Render the buffer as marker-tagged text, or `None` when empty.
    fn format_buffer(&self) -> Option<String>;

    /// Discard all buffered messages.
    fn clear_buffer(&self);

    /// Whether the scheduler clears this source's buffer after consuming it
    /// (`true` for streaming modalities such as voice) or the source keeps
    /// only its latest value itself (`false`).
    fn streaming(&self) -> bool;
}
