//! [`Cortex`] – the runtime scheduler.
//!
//! A single perpetual loop alternating between waiting (on the [`Pacer`])
//! and ticking.  Each tick, strictly in order:
//!
//! 1. Harvest resolved promises from the action orchestrator.
//! 2. Ask the composer to fuse a prompt; nothing actionable ends the tick.
//! 3. Suppress byte-identical duplicates of the last *sent* prompt (unless
//!    the modality composition changed).
//! 4. Call the model with the one-time static context plus the prompt; no
//!    result ends the tick with no same-tick retry.
//! 5. Sanitize the returned commands (drop empty / "no action" speech).
//! 6. Fan the sanitized list out to every registered sink concurrently –
//!    independent fan-outs, not a pipeline.
//! 7. Clear the buffers of the streaming sources this tick consumed.
//!
//! Any failure inside a tick is caught at the top of the loop, logged with
//! context, and treated as a no-op tick; the loop itself never terminates
//! on a single tick's failure.  Persistent source or model failures surface
//! only as the agent falling silent – the explicit safe degraded mode.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cortex_actions::{ActionOrchestrator, CommandSink};
use cortex_fuser::{FusedPrompt, Fuser};
use cortex_senses::InputSource;
use cortex_state::Blackboard;
use cortex_types::{Command, CortexError, Modality, NO_ACTION_SENTINEL};
use tracing::{debug, info, warn};

use crate::model::ModelClient;
use crate::pacer::Pacer;

/// How a tick ended.  Every variant short of `Dispatched` is a normal
/// no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No actionable input buffered this tick; the model was not called.
    Idle,
    /// The fused prompt byte-matched the last sent prompt with an unchanged
    /// modality composition; the model was not called.
    Duplicate,
    /// The model was called but produced no usable result.
    NoDecision,
    /// Commands were sanitized and fanned out.
    Dispatched { commands: usize },
}

/// Drop `speak` commands whose payload normalizes to empty or the
/// "no action" sentinel.  Everything dispatched downstream passed this
/// filter, so dispatched count always equals sanitized count.
pub fn sanitize_commands(commands: Vec<Command>) -> Vec<Command> {
    commands
        .into_iter()
        .filter(|command| match command {
            Command::Speak { text, .. } => {
                let normalized = text.trim().to_lowercase();
                let normalized = normalized.trim_end_matches(['.', '!']).trim_end();
                !normalized.is_empty() && normalized != NO_ACTION_SENTINEL
            }
            _ => true,
        })
        .collect()
}

/// Step-3 duplicate test: byte-identical prompt *and* unchanged modality
/// composition.  Comparing full strings can under-suppress (embedded
/// variable text) or over-suppress (textually equal prompts from different
/// contexts); that behavior is kept as-is.
fn is_duplicate(
    last_sent: Option<&str>,
    last_modalities: Option<&BTreeSet<Modality>>,
    fused: &FusedPrompt,
) -> bool {
    last_sent == Some(fused.text.as_str()) && last_modalities == Some(&fused.modalities)
}

/// The top-level runtime scheduler.
pub struct Cortex {
    pacer: Pacer,
    sources: Vec<Arc<dyn InputSource>>,
    fuser: Fuser,
    model: Arc<dyn ModelClient>,
    actions: Arc<ActionOrchestrator>,
    sinks: Vec<Arc<dyn CommandSink>>,
    blackboard: Arc<Blackboard>,
    paused: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    last_modalities: Option<BTreeSet<Modality>>,
}

impl Cortex {
    /// Wire the scheduler together.  The action orchestrator is always the
    /// first sink; `extra_sinks` adds the bus mirror and any
    /// simulator/background observers.  The model receives the static
    /// context here, exactly once.
    pub fn new(
        pacer: Pacer,
        sources: Vec<Arc<dyn InputSource>>,
        fuser: Fuser,
        model: Arc<dyn ModelClient>,
        actions: Arc<ActionOrchestrator>,
        extra_sinks: Vec<Arc<dyn CommandSink>>,
        blackboard: Arc<Blackboard>,
    ) -> Self {
        model.set_static_context(fuser.static_context());

        let mut sinks: Vec<Arc<dyn CommandSink>> =
            vec![Arc::clone(&actions) as Arc<dyn CommandSink>];
        sinks.extend(extra_sinks);

        Self {
            pacer,
            sources,
            fuser,
            model,
            actions,
            sinks,
            blackboard,
            paused: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            last_modalities: None,
        }
    }

    /// Shared flag the operator surface toggles to pause/resume ticking.
    pub fn pause_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.paused)
    }

    /// Shared flag that ends [`run`][Self::run] at the next wait boundary.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The perpetual waiting → ticking loop.  Returns only on shutdown.
    pub async fn run(mut self) {
        info!(period_ms = self.pacer.period().as_millis() as u64, "scheduler started");
        loop {
            self.pacer.wait().await;
            if self.shutdown.load(Ordering::Acquire) {
                info!("scheduler shutting down");
                return;
            }
            if self.paused.load(Ordering::Acquire) {
                continue;
            }

            self.blackboard.tick_started();
            match self.tick().await {
                Ok(outcome) => debug!(outcome = ?outcome, "tick complete"),
                Err(e) => warn!(error = %e, "tick failed; treated as a no-op tick"),
            }
            self.blackboard.tick_ended();
        }
    }

    /// One full tick body.  Each step's failure is non-fatal and
    /// short-circuits only the remaining steps of this tick.
    pub async fn tick(&mut self) -> Result<TickOutcome, CortexError> {
        // 1. Harvest what resolved since the previous tick.
        let (resolved, still_pending) = self.actions.flush_promises();
        if still_pending > 0 {
            debug!(pending = still_pending, "promises still in flight");
        }

        // 2. Fuse.  Nothing actionable → nothing to do this tick.
        let Some(fused) = self.fuser.fuse(&self.sources, &resolved) else {
            return Ok(TickOutcome::Idle);
        };

        // 3. Duplicate suppression against the last prompt actually sent –
        // prevents repeated model calls when the skip flag fired spuriously.
        let last_sent = self.blackboard.last_sent_prompt();
        if is_duplicate(last_sent.as_deref(), self.last_modalities.as_ref(), &fused) {
            debug!("duplicate prompt; suppressing model call");
            return Ok(TickOutcome::Duplicate);
        }

        // 4. Decide.  The static context was handed to the client at
        // startup; only the dynamic prompt travels per tick.
        let commands = match self.model.ask(&fused.text).await {
            Ok(Some(commands)) => commands,
            Ok(None) => {
                warn!("model produced no result; tick ends");
                return Ok(TickOutcome::NoDecision);
            }
            Err(e) => {
                return Err(CortexError::ModelCall(e.to_string()));
            }
        };

        self.blackboard.record_sent_prompt(&fused.text);
        self.blackboard.record_response(
            &serde_json::to_string(&commands).unwrap_or_else(|_| "<unencodable>".to_string()),
        );
        self.last_modalities = Some(fused.modalities.clone());

        // 5. Sanitize.
        let sanitized = sanitize_commands(commands);

        // 6. Fan out.  Sinks are independent; each hands work to its own
        // tasks and returns.
        if !sanitized.is_empty() {
            for sink in &self.sinks {
                debug!(sink = sink.label(), commands = sanitized.len(), "dispatching");
                sink.accept(&sanitized);
            }
        }

        // 7. Clear the streaming buffers this tick consumed, so stale
        // transcriptions are not re-sent next tick.
        for source in &self.sources {
            if source.streaming() && fused.contributors.iter().any(|n| n == source.name()) {
                source.clear_buffer();
            }
        }

        Ok(TickOutcome::Dispatched {
            commands: sanitized.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cortex_fuser::{FuserConfig, GreetingPolicy, StaticContext};
    use cortex_senses::ChannelSource;
    use cortex_types::{Message, SkipFlag};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::model::ModelError;

    // ── Test doubles ──────────────────────────────────────────────────────

    struct MockModel {
        calls: AtomicUsize,
        responses: Mutex<Vec<Vec<Command>>>,
        fail: bool,
    }

    impl MockModel {
        fn answering(responses: Vec<Vec<Command>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for MockModel {
        fn set_static_context(&self, _context: Arc<StaticContext>) {}

        async fn ask(&self, _prompt: &str) -> Result<Option<Vec<Command>>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelError::BadResponse("mock outage".to_string()));
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Some(Vec::new()))
            } else {
                Ok(Some(responses.remove(0)))
            }
        }
    }

    struct RecordingSink {
        accepted: Mutex<Vec<Vec<Command>>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                accepted: Mutex::new(Vec::new()),
            })
        }

        fn batches(&self) -> Vec<Vec<Command>> {
            self.accepted.lock().unwrap().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn label(&self) -> &str {
            "recording"
        }
        fn accept(&self, commands: &[Command]) {
            self.accepted.lock().unwrap().push(commands.to_vec());
        }
    }

    // ── Harness ───────────────────────────────────────────────────────────

    fn speak(text: &str) -> Command {
        Command::Speak {
            text: text.to_string(),
            language: None,
        }
    }

    fn context() -> Arc<StaticContext> {
        Arc::new(StaticContext::new(
            "You are the lobby greeter.",
            "Be brief.",
            "",
            "speak, gesture, move",
            None,
        ))
    }

    fn greeting_disabled() -> FuserConfig {
        FuserConfig {
            greeting: GreetingPolicy {
                enabled: false,
                ..GreetingPolicy::default()
            },
            ..FuserConfig::default()
        }
    }

    struct Harness {
        cortex: Cortex,
        model: Arc<MockModel>,
        sink: Arc<RecordingSink>,
        blackboard: Arc<Blackboard>,
    }

    fn harness(
        sources: Vec<Arc<dyn InputSource>>,
        model: Arc<MockModel>,
        config: FuserConfig,
    ) -> Harness {
        let blackboard = Arc::new(Blackboard::new());
        let fuser = Fuser::new(context(), config, Arc::clone(&blackboard));
        let actions = Arc::new(ActionOrchestrator::new(
            vec![
                Arc::new(cortex_actions::NullConnector::new("speak"))
                    as Arc<dyn cortex_actions::Connector>,
            ],
            Duration::from_millis(200),
        ));
        let sink = RecordingSink::new();
        let cortex = Cortex::new(
            Pacer::new(100.0, SkipFlag::new()),
            sources,
            fuser,
            Arc::clone(&model) as Arc<dyn ModelClient>,
            actions,
            vec![Arc::clone(&sink) as Arc<dyn CommandSink>],
            Arc::clone(&blackboard),
        );
        Harness {
            cortex,
            model,
            sink,
            blackboard,
        }
    }

    fn voice_source(text: Option<&str>) -> Arc<dyn InputSource> {
        let (source, _feed) = ChannelSource::new(
            "mic",
            Modality::Voice,
            Duration::from_millis(10),
            8,
            Some("en".to_string()),
        );
        if let Some(text) = text {
            source.append(Message::now(format!("[voice lang=en] {text}")));
        }
        Arc::new(source)
    }

    fn vision_source(body: &str) -> Arc<dyn InputSource> {
        let (source, _feed) =
            ChannelSource::new("cam", Modality::Vision, Duration::from_millis(10), 1, None);
        source.append(Message::now(format!("[vision] {body}")));
        Arc::new(source)
    }

    // ── Sanitization unit tests ───────────────────────────────────────────

    #[test]
    fn sanitize_drops_empty_and_sentinel_speech() {
        let commands = vec![
            speak("Hello!"),
            speak("   "),
            speak("no action"),
            speak("No action."),
            Command::Gesture {
                name: "wave".to_string(),
            },
        ];
        let sanitized = sanitize_commands(commands);
        assert_eq!(sanitized.len(), 2);
        assert_eq!(sanitized[0], speak("Hello!"));
        assert_eq!(sanitized[1].kind(), "gesture");
    }

    #[test]
    fn sanitize_keeps_non_speak_commands_untouched() {
        let commands = vec![
            Command::Move {
                heading_deg: 0.0,
                distance_m: 0.1,
            },
            Command::Gesture {
                name: "nod".to_string(),
            },
        ];
        assert_eq!(sanitize_commands(commands).len(), 2);
    }

    // ── Duplicate-test unit tests ─────────────────────────────────────────

    #[test]
    fn identical_prompt_and_modalities_is_duplicate() {
        let fused = FusedPrompt {
            text: "p".to_string(),
            modalities: BTreeSet::from([Modality::Vision]),
            contributors: vec!["cam".to_string()],
        };
        let mods = BTreeSet::from([Modality::Vision]);
        assert!(is_duplicate(Some("p"), Some(&mods), &fused));
    }

    #[test]
    fn changed_modality_composition_defeats_suppression() {
        let fused = FusedPrompt {
            text: "p".to_string(),
            modalities: BTreeSet::from([Modality::Vision, Modality::Badge]),
            contributors: vec!["cam".to_string()],
        };
        let mods = BTreeSet::from([Modality::Vision]);
        assert!(!is_duplicate(Some("p"), Some(&mods), &fused));
    }

    // ── Tick behavior ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_buffers_never_call_the_model() {
        let model = MockModel::answering(Vec::new());
        let mut h = harness(vec![voice_source(None)], Arc::clone(&model), FuserConfig::default());

        for _ in 0..5 {
            assert_eq!(h.cortex.tick().await.unwrap(), TickOutcome::Idle);
        }
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn consecutive_identical_prompts_call_model_once() {
        // A vision (latest-value) source keeps its buffer across ticks, and
        // with greeting disabled both ticks fuse to identical text.
        let model = MockModel::answering(vec![vec![speak("Hi there")]]);
        let mut h = harness(
            vec![vision_source("person=Alice")],
            Arc::clone(&model),
            greeting_disabled(),
        );

        let first = h.cortex.tick().await.unwrap();
        assert!(matches!(first, TickOutcome::Dispatched { .. }));
        let second = h.cortex.tick().await.unwrap();
        assert_eq!(second, TickOutcome::Duplicate);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn dispatched_count_equals_sanitized_count() {
        let model = MockModel::answering(vec![vec![
            speak("Hello"),
            speak("no action"),
            Command::Gesture {
                name: "wave".to_string(),
            },
        ]]);
        let mut h = harness(
            vec![voice_source(Some("Anyone here?"))],
            Arc::clone(&model),
            FuserConfig::default(),
        );

        let outcome = h.cortex.tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::Dispatched { commands: 2 });

        let batches = h.sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn model_failure_is_an_error_and_loop_survives() {
        let model = MockModel::failing();
        let mut h = harness(
            vec![voice_source(Some("Hello?"))],
            Arc::clone(&model),
            FuserConfig::default(),
        );

        let result = h.cortex.tick().await;
        assert!(matches!(result, Err(CortexError::ModelCall(_))));
        // Nothing was recorded as sent, so the next tick re-attempts.
        assert!(h.blackboard.last_sent_prompt().is_none());

        let retry = h.cortex.tick().await;
        assert!(matches!(retry, Err(CortexError::ModelCall(_))));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn all_speech_sanitized_away_dispatches_nothing() {
        let model = MockModel::answering(vec![vec![speak("no action")]]);
        let mut h = harness(
            vec![voice_source(Some("hm"))],
            Arc::clone(&model),
            FuserConfig::default(),
        );

        let outcome = h.cortex.tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::Dispatched { commands: 0 });
        assert!(h.sink.batches().is_empty(), "empty batches are not fanned out");
    }

    #[tokio::test]
    async fn consumed_voice_buffer_is_cleared_vision_is_not() {
        let model = MockModel::answering(vec![
            vec![speak("Welcome")],
            vec![speak("Welcome again")],
        ]);
        let voice = voice_source(Some("Hi"));
        let vision = vision_source("person=Alice");
        let mut h = harness(
            vec![Arc::clone(&voice), Arc::clone(&vision)],
            Arc::clone(&model),
            FuserConfig::default(),
        );

        h.cortex.tick().await.unwrap();

        // Voice was consumed and cleared; vision keeps its latest value.
        assert!(voice.format_buffer().is_none());
        assert!(vision.format_buffer().is_some());

        // Next tick is vision-only: greeting state machine takes over.
        let outcome = h.cortex.tick().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Dispatched { .. }));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn no_decision_leaves_prompt_unsent_for_natural_retry() {
        struct EmptyModel {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl ModelClient for EmptyModel {
            fn set_static_context(&self, _context: Arc<StaticContext>) {}
            async fn ask(&self, _prompt: &str) -> Result<Option<Vec<Command>>, ModelError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        }

        let blackboard = Arc::new(Blackboard::new());
        let fuser = Fuser::new(context(), greeting_disabled(), Arc::clone(&blackboard));
        let actions = Arc::new(ActionOrchestrator::new(Vec::new(), Duration::from_millis(50)));
        let model = Arc::new(EmptyModel {
            calls: AtomicUsize::new(0),
        });
        let mut cortex = Cortex::new(
            Pacer::new(100.0, SkipFlag::new()),
            vec![vision_source("person=Bob")],
            fuser,
            Arc::clone(&model) as Arc<dyn ModelClient>,
            actions,
            Vec::new(),
            Arc::clone(&blackboard),
        );

        assert_eq!(cortex.tick().await.unwrap(), TickOutcome::NoDecision);
        assert!(blackboard.last_sent_prompt().is_none());
        // Identical prompt is re-attempted (not suppressed) next tick.
        assert_eq!(cortex.tick().await.unwrap(), TickOutcome::NoDecision);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown_flag() {
        let model = MockModel::answering(Vec::new());
        let h = harness(vec![voice_source(None)], model, FuserConfig::default());
        let shutdown = h.cortex.shutdown_flag();

        let handle = tokio::spawn(h.cortex.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.store(true, Ordering::Release);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("run() must return after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn paused_scheduler_skips_tick_bodies() {
        let model = MockModel::answering(Vec::new());
        let h = harness(
            vec![voice_source(Some("Hello?"))],
            Arc::clone(&model),
            FuserConfig::default(),
        );
        let paused = h.cortex.pause_flag();
        let shutdown = h.cortex.shutdown_flag();
        paused.store(true, Ordering::Release);

        let blackboard = Arc::clone(&h.blackboard);
        let handle = tokio::spawn(h.cortex.run());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(model.calls(), 0, "paused loop must not think");
        assert_eq!(blackboard.tick_count(), 0);

        shutdown.store(true, Ordering::Release);
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
}
