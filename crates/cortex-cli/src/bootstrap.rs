//! Wires configuration into a runnable agent.
//!
//! Resolves the source and connector registries against the configured
//! specs, assembles the static context, and constructs the scheduler with
//! its bus mirror.  Everything is dependency-injected from here; no
//! component reaches for globals.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cortex_actions::{ActionOrchestrator, BusMirror, CommandSink, Connector, ConnectorRegistry};
use cortex_bus::EventBus;
use cortex_fuser::{Fuser, FuserConfig, GreetingPolicy, StaticContext};
use cortex_runtime::{ChatModelClient, Cortex, ModelClient, Pacer};
use cortex_senses::{ChannelFeed, InputOrchestrator, InputSource, SourceRegistry};
use cortex_state::Blackboard;
use cortex_types::{CortexError, Modality, SkipFlag};

use crate::config::Config;

/// The assembled application: the scheduler, its input orchestrator, and
/// the handles the operator surface needs.
pub struct App {
    pub cortex: Cortex,
    pub inputs: InputOrchestrator,
    pub blackboard: Arc<Blackboard>,
    pub bus: EventBus,
    /// Feed into the first configured voice source, when channel-backed –
    /// the REPL `/say` path.
    pub voice_feed: Option<ChannelFeed>,
    pub paused: Arc<AtomicBool>,
    pub shutdown: Arc<AtomicBool>,
}

/// Build the full agent from `config` using the built-in registries.
///
/// # Errors
///
/// Returns [`CortexError::Config`] for unknown source/connector kinds or an
/// unreadable knowledge file.
pub fn build(config: &Config) -> Result<App, CortexError> {
    let blackboard = Arc::new(Blackboard::new());
    let bus = EventBus::default();
    let skip = SkipFlag::new();

    // ── Input sources ─────────────────────────────────────────────────────
    let source_registry = SourceRegistry::with_builtins();
    let mut sources: Vec<Arc<dyn InputSource>> = Vec::new();
    let mut voice_feed: Option<ChannelFeed> = None;
    for spec in &config.inputs {
        let built = source_registry.build(spec)?;
        if voice_feed.is_none() && spec.modality == Modality::Voice {
            voice_feed = built.feed.clone();
        }
        sources.push(built.source);
    }
    let inputs = InputOrchestrator::new(
        sources.clone(),
        Arc::clone(&blackboard),
        bus.clone(),
        skip.clone(),
    );

    // ── Actuator connectors ───────────────────────────────────────────────
    let connector_registry = ConnectorRegistry::with_builtins();
    let connectors: Vec<Arc<dyn Connector>> = config
        .actions
        .iter()
        .map(|spec| connector_registry.build(spec))
        .collect::<Result<_, _>>()?;
    let actions = Arc::new(ActionOrchestrator::new(
        connectors,
        Duration::from_secs(config.dispatch_timeout_secs),
    ));

    // ── Static context ────────────────────────────────────────────────────
    let knowledge = match &config.knowledge_path {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            CortexError::Config(format!(
                "cannot read knowledge file {}: {e}",
                path.display()
            ))
        })?),
        None => None,
    };
    let context = Arc::new(StaticContext::new(
        config.persona_text.clone(),
        config.rules_text.clone(),
        config.examples_text.clone(),
        catalogue_text(&actions.kinds()),
        knowledge,
    ));

    let fuser = Fuser::new(
        context,
        FuserConfig {
            default_language: config.default_language.clone(),
            greeting: GreetingPolicy {
                enabled: config.greeting.enabled,
                cooldown: Duration::from_secs(config.greeting.cooldown_secs),
                memory_window: Duration::from_secs(config.greeting.memory_window_secs),
            },
        },
        Arc::clone(&blackboard),
    );

    // ── Model and scheduler ───────────────────────────────────────────────
    let model: Arc<dyn ModelClient> = Arc::new(ChatModelClient::new(
        config.model.base_url.clone(),
        config.model.model.clone(),
        Duration::from_secs(config.model.timeout_secs),
    ));
    let mirror: Arc<dyn CommandSink> =
        Arc::new(BusMirror::new(bus.clone(), "cortex-runtime::scheduler"));
    let cortex = Cortex::new(
        Pacer::new(config.rate, skip),
        sources,
        fuser,
        model,
        actions,
        vec![mirror],
        Arc::clone(&blackboard),
    );
    let paused = cortex.pause_flag();
    let shutdown = cortex.shutdown_flag();

    Ok(App {
        cortex,
        inputs,
        blackboard,
        bus,
        voice_feed,
        paused,
        shutdown,
    })
}

/// Render the action catalogue section of the static context from the
/// registered command kinds.
fn catalogue_text(kinds: &[String]) -> String {
    let mut text = String::from(
        "Respond with a JSON object {\"commands\": [...]}. Available command kinds:\n",
    );
    for kind in kinds {
        let line = match kind.as_str() {
            "speak" => "- speak {text, language}: say a sentence out loud",
            "gesture" => "- gesture {name}: play a named gesture animation",
            "move" => "- move {heading_deg, distance_m}: drive a short, bounded distance",
            other => {
                text.push_str(&format!("- {other}\n"));
                continue;
            }
        };
        text.push_str(line);
        text.push('\n');
    }
    text.push_str("Return an empty list when no action is warranted.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let app = build(&Config::default()).expect("default config must build");
        assert!(app.voice_feed.is_some(), "default config has a voice channel");
        assert_eq!(app.inputs.sources().len(), 3);
        assert_eq!(app.blackboard.tick_count(), 0);
    }

    #[test]
    fn unknown_source_kind_fails_to_build() {
        let mut config = Config::default();
        config.inputs[0].kind = "sonar".to_string();
        assert!(matches!(build(&config), Err(CortexError::Config(_))));
    }

    #[test]
    fn unknown_connector_fails_to_build() {
        let mut config = Config::default();
        config.actions[0].connector = "ros2".to_string();
        assert!(matches!(build(&config), Err(CortexError::Config(_))));
    }

    #[test]
    fn missing_knowledge_file_fails_to_build() {
        let mut config = Config::default();
        config.knowledge_path = Some("/nonexistent/knowledge.md".into());
        let err = match build(&config) {
            Ok(_) => panic!("expected build to fail"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("knowledge"));
    }

    #[test]
    fn catalogue_lists_configured_kinds() {
        let text = catalogue_text(&[
            "gesture".to_string(),
            "move".to_string(),
            "speak".to_string(),
        ]);
        assert!(text.contains("- speak"));
        assert!(text.contains("- gesture"));
        assert!(text.contains("- move"));
        assert!(text.contains("empty list"));
    }
}
