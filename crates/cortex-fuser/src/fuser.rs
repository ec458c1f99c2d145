//! [`Fuser`] – fuses per-source buffers into one dynamic prompt.
//!
//! # Algorithm
//!
//! 1. `format_buffer()` every source; concatenate non-empty results in
//!    registration order (stable and deterministic when several sources
//!    report at once).
//! 2. Empty concatenation → `None`; the scheduler treats this as "nothing
//!    to do" and skips the model call entirely.
//! 3. Classify the present modalities by the structural markers in the
//!    text; pull the spoken language from the voice marker, else keep the
//!    previously detected language, else the configured default.
//! 4. Select one template by fixed priority: voice always wins, then badge
//!    without voice, then vision alone, else nothing actionable.
//! 5. The vision-only path runs the proactive-greeting state machine.
//! 6. Record the produced prompt and its start/end stamps on the
//!    blackboard.
//!
//! The static context is never repeated inside the dynamic prompt.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cortex_senses::{InputSource, marker};
use cortex_state::Blackboard;
use cortex_types::{Modality, Promise, Resolution};
use tracing::debug;

use crate::context::StaticContext;
use crate::greeting::GreetingLedger;

// ────────────────────────────────────────────────────────────────────────────
// Response templates
// ────────────────────────────────────────────────────────────────────────────

/// Vision-only, not yet greeted: open proactively.
const VISION_GREET_TEMPLATE: &str = "You can see a visitor who has not been greeted yet. \
Offer one short, warm greeting and ask how you can help.";

/// Vision-only, already greeted within the cooldown: say nothing.
const VISION_SILENT_TEMPLATE: &str = "You can see the same visitors as before and have \
already greeted them. Remain silent: return an empty command list.";

/// Vision-only with proactive greeting disabled: observe, act only on need.
const VISION_OBSERVE_TEMPLATE: &str = "You can see the scene described below. React only \
if something requires action; otherwise return an empty command list.";

fn voice_template(language: &str) -> String {
    format!(
        "A visitor is speaking to you (language: {language}). Answer their words below \
         concisely and helpfully, replying in that same language."
    )
}

fn badge_template(first_name: &str) -> String {
    format!(
        "A visitor just badged in. Greet {first_name} by first name, briefly and warmly, \
         and offer assistance."
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration and output
// ────────────────────────────────────────────────────────────────────────────

/// Proactive-greeting policy for the vision-only path.
#[derive(Debug, Clone)]
pub struct GreetingPolicy {
    pub enabled: bool,
    /// Minimum interval between proactive greetings.
    pub cooldown: Duration,
    /// How long a detected person stays "present" after last being seen.
    pub memory_window: Duration,
}

impl Default for GreetingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: Duration::from_secs(300),
            memory_window: Duration::from_secs(600),
        }
    }
}

/// Composer configuration.
#[derive(Debug, Clone)]
pub struct FuserConfig {
    /// Fallback language when no voice reading has carried a tag yet.
    pub default_language: String,
    pub greeting: GreetingPolicy,
}

impl Default for FuserConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            greeting: GreetingPolicy::default(),
        }
    }
}

/// A fused dynamic prompt plus the modality composition it was built from.
///
/// The scheduler's duplicate suppression compares both: a byte-identical
/// prompt is still sent when the modality composition changed.
/// `contributors` names the sources whose buffers went into the prompt, so
/// the scheduler knows which streaming buffers this tick consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedPrompt {
    pub text: String,
    pub modalities: BTreeSet<Modality>,
    pub contributors: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Fuser
// ────────────────────────────────────────────────────────────────────────────

/// The prompt composer.  Owns the static context, the greeting ledger, and
/// the last-detected-language state; everything else is derived fresh each
/// tick.
pub struct Fuser {
    context: Arc<StaticContext>,
    config: FuserConfig,
    blackboard: Arc<Blackboard>,
    ledger: GreetingLedger,
    last_language: String,
}

impl Fuser {
    pub fn new(context: Arc<StaticContext>, config: FuserConfig, blackboard: Arc<Blackboard>) -> Self {
        blackboard.record_static_context(context.text());
        let last_language = config.default_language.clone();
        Self {
            context,
            config,
            blackboard,
            ledger: GreetingLedger::new(),
            last_language,
        }
    }

    /// Pure read of the cached static context.
    pub fn static_context(&self) -> Arc<StaticContext> {
        Arc::clone(&self.context)
    }

    /// The language the agent last heard (or the configured default).
    pub fn last_language(&self) -> &str {
        &self.last_language
    }

    /// Fuse the current buffers into a dynamic prompt, or `None` when there
    /// is nothing actionable this tick.
    pub fn fuse(
        &mut self,
        sources: &[Arc<dyn InputSource>],
        resolved: &[Promise],
    ) -> Option<FusedPrompt> {
        let started_at = Utc::now();

        // 1. Concatenate non-empty buffers in registration order.
        let mut sections: Vec<String> = Vec::new();
        let mut contributors: Vec<String> = Vec::new();
        for source in sources {
            if let Some(text) = source.format_buffer() {
                sections.push(text);
                contributors.push(source.name().to_string());
            }
        }
        if sections.is_empty() {
            return None;
        }
        let combined = sections.join("\n");

        // 3. Classify modalities and track the spoken language.
        let mut modalities = BTreeSet::new();
        for modality in [
            Modality::Voice,
            Modality::Vision,
            Modality::Badge,
            Modality::Telemetry,
        ] {
            if marker::contains(&combined, modality) {
                modalities.insert(modality);
            }
        }
        if let Some(lang) = marker::parse_language(&combined) {
            self.last_language = lang;
        }

        // 4./5. Template selection by fixed priority.
        let instruction = if modalities.contains(&Modality::Voice) {
            voice_template(&self.last_language)
        } else if modalities.contains(&Modality::Badge) {
            let names = marker::parse_names(&combined);
            let first = names
                .first()
                .and_then(|n| n.split_whitespace().next())
                .unwrap_or("the visitor")
                .to_string();
            self.ledger.observe(&names, self.config.greeting.memory_window);
            self.ledger.mark_greeted();
            badge_template(&first)
        } else if modalities.contains(&Modality::Vision) {
            let names = marker::parse_names(&combined);
            self.ledger.observe(&names, self.config.greeting.memory_window);
            if !self.config.greeting.enabled {
                VISION_OBSERVE_TEMPLATE.to_string()
            } else if self.ledger.should_greet(self.config.greeting.cooldown) {
                self.ledger.mark_greeted();
                VISION_GREET_TEMPLATE.to_string()
            } else {
                VISION_SILENT_TEMPLATE.to_string()
            }
        } else {
            // Telemetry alone is context, not something to respond to.
            debug!("no actionable modality present; skipping");
            return None;
        };

        let mut text = format!("{instruction}\n\n{combined}");

        // Surface last tick's failed dispatches; successes only feed state.
        let failed_kinds: Vec<&str> = resolved
            .iter()
            .filter(|p| matches!(p.resolution, Resolution::Failure { .. }))
            .map(|p| p.command.kind())
            .collect();
        if !failed_kinds.is_empty() {
            text.push_str(&format!(
                "\n[action-status] previous commands failed: {}",
                failed_kinds.join(", ")
            ));
        }

        // 6. Record the trace.
        let ended_at = Utc::now();
        self.blackboard.record_fuse(&text, started_at, ended_at);

        Some(FusedPrompt {
            text,
            modalities,
            contributors,
        })
    }

    #[cfg(test)]
    pub(crate) fn ledger_mut(&mut self) -> &mut GreetingLedger {
        &mut self.ledger
    }
}
