//! [`ModelClient`] – the language-model boundary.
//!
//! The scheduler only ever talks to the trait; [`ChatModelClient`] is the
//! shipped implementation, speaking to any OpenAI-compatible
//! `/v1/chat/completions` endpoint (a local Ollama, a hosted gateway).
//!
//! The static system context is handed over once at startup and reused for
//! every request, so a caching backend sees an identical system message
//! each call.  The [`CommandBatch`][cortex_types::CommandBatch] JSON Schema
//! is injected via `response_format` to force strictly typed output.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use cortex_fuser::StaticContext;
use cortex_types::{Command, CommandBatch};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from model client operations.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The HTTP request to the model server failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the model server could not be interpreted.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Client trait
// ─────────────────────────────────────────────────────────────────────────────

/// The language-model boundary the scheduler depends on.
///
/// `ask` must honor an internal timeout; `Ok(None)` means "no usable
/// result" (empty choice, undecodable content) and is never retried within
/// the same tick.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Hand over the one-time static context.  Called once at startup,
    /// before the first `ask`.
    fn set_static_context(&self, context: Arc<StaticContext>);

    /// Send the dynamic prompt and decode the returned command list.
    async fn ask(&self, prompt: &str) -> Result<Option<Vec<Command>>, ModelError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: Role,
    content: String,
}

/// `response_format` field that enforces structured JSON Schema output.
#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// ChatModelClient
// ─────────────────────────────────────────────────────────────────────────────

/// Async client for an OpenAI-compatible chat-completions endpoint.
///
/// Construct once and reuse across ticks; the underlying connection pool
/// and the static context survive for the process lifetime.
pub struct ChatModelClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
    context: OnceLock<Arc<StaticContext>>,
}

impl ChatModelClient {
    /// `timeout` bounds the whole request; a model that stalls resolves as
    /// an error instead of hanging the tick indefinitely.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client,
            context: OnceLock::new(),
        }
    }
}

#[async_trait]
impl ModelClient for ChatModelClient {
    fn set_static_context(&self, context: Arc<StaticContext>) {
        if self.context.set(context).is_err() {
            warn!("static context was already set; ignoring replacement");
        }
    }

    async fn ask(&self, prompt: &str) -> Result<Option<Vec<Command>>, ModelError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(context) = self.context.get() {
            messages.push(ChatMessage {
                role: Role::System,
                content: context.text().to_string(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User,
            content: prompt.to_string(),
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let schema =
            serde_json::to_value(schema_for!(CommandBatch)).unwrap_or(serde_json::Value::Null);
        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: schema,
            },
        };

        let response: ChatResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = match response.choices.into_iter().next() {
            Some(choice) => choice.message.content,
            None => {
                warn!("model returned an empty choices array");
                return Ok(None);
            }
        };

        match serde_json::from_str::<CommandBatch>(&content) {
            Ok(batch) => Ok(Some(batch.commands)),
            Err(e) => {
                // Malformed content counts as "no result": logged, tick
                // ends, the next tick re-attempts naturally.
                warn!(error = %e, "model response was not a decodable command batch");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_serializes_role() {
        let msg = ChatMessage {
            role: Role::System,
            content: "hello".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"system\""));
    }

    #[test]
    fn request_body_embeds_command_schema() {
        let schema = serde_json::to_value(schema_for!(CommandBatch)).unwrap();
        let text = schema.to_string();
        assert!(text.contains("commands"));
        assert!(text.contains("speak"));
    }

    #[test]
    fn static_context_is_set_once() {
        let client =
            ChatModelClient::new("http://localhost:11434", "llama3", Duration::from_secs(10));
        let first = Arc::new(StaticContext::new("a", "", "", "speak", None));
        let second = Arc::new(StaticContext::new("b", "", "", "speak", None));
        client.set_static_context(Arc::clone(&first));
        client.set_static_context(second);
        assert_eq!(client.context.get().unwrap().persona(), "a");
    }

    #[tokio::test]
    async fn ask_against_dead_server_returns_http_error() {
        // Nothing listens on this port; the request must fail, not hang.
        let client = ChatModelClient::new(
            "http://127.0.0.1:1",
            "llama3",
            Duration::from_millis(500),
        );
        let result = client.ask("hello").await;
        assert!(matches!(result, Err(ModelError::Http(_))));
    }

    #[test]
    fn batch_content_decodes_to_commands() {
        let content = r#"{"commands":[{"kind":"speak","text":"Hi","language":"en"}]}"#;
        let batch: CommandBatch = serde_json::from_str(content).unwrap();
        assert_eq!(batch.commands.len(), 1);
    }
}
