//! Configuration vault – reads/writes `~/.cortex/config.toml`.
//!
//! The file supplies the tick rate, the static-context source texts, the
//! configured input sources, and the configured actuators.  `CORTEX_*`
//! environment variables override individual fields after load.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use cortex_types::{ActionSpec, Modality, SourceSpec};

/// Proactive-greeting policy section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_greeting_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_memory_window_secs")]
    pub memory_window_secs: u64,
}

impl Default for GreetingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: default_greeting_cooldown_secs(),
            memory_window_secs: default_memory_window_secs(),
        }
    }
}

/// Model endpoint section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    /// Base URL of an OpenAI-compatible chat-completions server.
    #[serde(default = "default_model_url")]
    pub base_url: String,
    #[serde(default = "default_model_name")]
    pub model: String,
    /// Whole-request timeout for each model call.
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            model: default_model_name(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

/// Persisted runtime configuration stored in `~/.cortex/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tick rate in Hz.
    #[serde(default = "default_rate")]
    pub rate: f32,

    /// Fallback language before any voice reading carries a tag.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Per-dispatch actuator timeout.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    #[serde(default = "default_persona")]
    pub persona_text: String,

    #[serde(default = "default_rules")]
    pub rules_text: String,

    #[serde(default)]
    pub examples_text: String,

    /// Optional external knowledge file folded into the static context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_path: Option<PathBuf>,

    #[serde(default)]
    pub greeting: GreetingSection,

    #[serde(default)]
    pub model: ModelSection,

    #[serde(default = "default_inputs")]
    pub inputs: Vec<SourceSpec>,

    #[serde(default = "default_actions")]
    pub actions: Vec<ActionSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            default_language: default_language(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            persona_text: default_persona(),
            rules_text: default_rules(),
            examples_text: String::new(),
            knowledge_path: None,
            greeting: GreetingSection::default(),
            model: ModelSection::default(),
            inputs: default_inputs(),
            actions: default_actions(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_rate() -> f32 {
    2.0
}
fn default_language() -> String {
    "en".to_string()
}
fn default_dispatch_timeout_secs() -> u64 {
    10
}
fn default_greeting_cooldown_secs() -> u64 {
    300
}
fn default_memory_window_secs() -> u64 {
    600
}
fn default_model_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model_name() -> String {
    "llama3".to_string()
}
fn default_model_timeout_secs() -> u64 {
    30
}
fn default_persona() -> String {
    "You are a friendly front-desk agent. You greet visitors, answer short \
     questions, and guide people around the building."
        .to_string()
}
fn default_rules() -> String {
    "Keep replies to one or two sentences. Never invent visitor names. \
     When there is nothing worth saying, return an empty command list."
        .to_string()
}

fn default_inputs() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            kind: "channel".to_string(),
            name: "mic".to_string(),
            modality: Modality::Voice,
            poll_interval_ms: 100,
            capacity: 16,
            language: None,
            script: None,
        },
        SourceSpec {
            kind: "channel".to_string(),
            name: "lobby-cam".to_string(),
            modality: Modality::Vision,
            poll_interval_ms: 500,
            capacity: 1,
            language: None,
            script: None,
        },
        SourceSpec {
            kind: "channel".to_string(),
            name: "badge-reader".to_string(),
            modality: Modality::Badge,
            poll_interval_ms: 250,
            capacity: 4,
            language: None,
            script: None,
        },
    ]
}

fn default_actions() -> Vec<ActionSpec> {
    vec![
        ActionSpec {
            kind: "speak".to_string(),
            connector: "log".to_string(),
        },
        ActionSpec {
            kind: "gesture".to_string(),
            connector: "log".to_string(),
        },
        ActionSpec {
            kind: "move".to_string(),
            connector: "log".to_string(),
        },
    ]
}

/// Return the path to `~/.cortex/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".cortex").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `CORTEX_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `CORTEX_MODEL_URL` | `model.base_url` |
/// | `CORTEX_MODEL` | `model.model` |
/// | `CORTEX_RATE` | `rate` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("CORTEX_MODEL_URL") {
        cfg.model.base_url = v;
    }
    if let Ok(v) = std::env::var("CORTEX_MODEL") {
        cfg.model.model = v;
    }
    if let Ok(v) = std::env::var("CORTEX_RATE")
        && let Ok(rate) = v.parse::<f32>()
    {
        cfg.rate = rate;
    }
}

/// Save the config to disk, creating `~/.cortex/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.rate, 2.0);
        assert_eq!(loaded.default_language, "en");
        assert_eq!(loaded.inputs.len(), 3);
        assert_eq!(loaded.actions.len(), 3);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_cortex_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".cortex"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "rate = 4.0\n").unwrap();

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.rate, 4.0);
        assert_eq!(cfg.model.base_url, "http://localhost:11434");
        assert!(cfg.greeting.enabled);
        assert!(!cfg.inputs.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap())
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn apply_env_overrides_changes_model_url() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("CORTEX_MODEL_URL", "http://robot-host:11434") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.model.base_url, "http://robot-host:11434");
        unsafe { std::env::remove_var("CORTEX_MODEL_URL") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_rate() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("CORTEX_RATE", "not-a-rate") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.rate, 2.0);
        unsafe { std::env::remove_var("CORTEX_RATE") };
    }

    #[test]
    fn inputs_deserialize_with_modalities() {
        let raw = r#"
rate = 1.0

[[inputs]]
kind = "scripted"
name = "demo-cam"
modality = "vision"
capacity = 1
script = ["person=Alice"]

[[actions]]
kind = "speak"
connector = "log"
"#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.inputs.len(), 1);
        assert_eq!(cfg.inputs[0].modality, Modality::Vision);
        assert_eq!(cfg.inputs[0].script.as_ref().unwrap().len(), 1);
    }
}
