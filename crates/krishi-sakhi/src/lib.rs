//! Typed prompt flows for the Krishi Sakhi farming assistant.
//!
//! `krishi-sakhi` wraps every AI feature of the Krishi Sakhi dashboard in the
//! same contract: a typed input validated against a JSON Schema, a prompt
//! template rendered from that input, one call to a generative-model backend,
//! and a reply validated against a declared output schema before it reaches
//! the caller. The model itself is reached through an OpenAI-compatible chat
//! completions endpoint ([OpenRouter](https://openrouter.ai/) by default).
//!
//! # Getting started
//!
//! ```ignore
//! use krishi_sakhi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ModelClient::new(ClientConfig::from_env()?)?;
//!     let sakhi = Sakhi::new(client);
//!
//!     let reply = sakhi
//!         .chat(&ChatInput {
//!             history: vec![ChatTurn::user("Hi")],
//!             message: "What is SRI?".into(),
//!         })
//!         .await?;
//!     println!("{}", reply.message);
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **The contract:** [`Flow`](flow::Flow), [`execute`](flow::execute) and
//!   [`execute_json`](flow::execute_json), with [`FlowError`](flow::FlowError)
//!   as the error taxonomy.
//! - **The features:** [`flows`] holds one module per feature plus the
//!   [`Sakhi`](flows::Sakhi) facade.
//! - **Templates:** [`PromptTemplate`](flow::template::PromptTemplate) renders
//!   `{{field}}` placeholders and `{{#each list}}` blocks.
//! - **Backends:** [`ModelBackend`](backend::ModelBackend) is the seam between
//!   flows and the network. [`ModelClient`] implements it over HTTP and
//!   [`StubBackend`](backend::stub::StubBackend) answers from a script.
//! - **Configuration:** [`config`] covers models, endpoints and environment
//!   variables.

pub mod api;
pub mod backend;
pub mod config;
pub mod flow;
pub mod flows;
pub mod prelude;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, trace};

pub use api::BackendError;
pub use config::{ClientConfig, FlowConfig, SpeechConfig};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for text flows.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Default OpenAI-compatible speech endpoint.
pub const DEFAULT_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Default speech synthesis model.
pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";

/// Sample rate of the raw PCM returned by the speech endpoint.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`.
///
/// # Example
///
/// ```
/// use krishi_sakhi::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct SoilReport {
///     soil_type: String,
///     #[serde(default)]
///     ph: Option<f32>,
/// }
///
/// let schema = json_schema_for::<SoilReport>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"soil_type".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// Schema-constrained JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: &'static str,
    pub json_schema: JsonSchemaFormat,
}

impl ResponseFormat {
    /// Ask the model for JSON conforming to `schema`.
    pub fn json_schema(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            fmt_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict: false,
                schema,
            },
        }
    }
}

/// Named schema payload for `response_format: {"type": "json_schema"}`.
#[derive(Serialize, Debug)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message sent to the chat completions API.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
        }
    }
}

/// A message in a chat completion request.
#[derive(Serialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from [`ModelClient::chat`].
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat completions endpoint and
/// speech endpoint.
///
/// Holds no per-call state; one client can serve any number of concurrent
/// flow invocations.
pub struct ModelClient {
    pub(crate) client: reqwest::Client,
    pub(crate) config: ClientConfig,
}

impl ModelClient {
    /// Create a client from a fully resolved configuration.
    pub fn new(config: ClientConfig) -> Result<Self, BackendError> {
        if config.api_key.trim().is_empty() {
            return Err(BackendError::Config("API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("krishi-sakhi/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, BackendError> {
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            body.model,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.config.chat_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Request(format!("failed to read response: {e}")))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(BackendError::Api(err.message));
        }

        match parsed.choices.and_then(|c| c.into_iter().next()) {
            Some(c) => {
                debug!(
                    "LLM output: {} chars, finish_reason={}",
                    c.message.content.as_ref().map_or(0, |s| s.len()),
                    c.finish_reason.as_deref().unwrap_or("-"),
                );
                Ok(ChatCompletion {
                    content: c.message.content,
                    usage: parsed.usage,
                    finish_reason: c.finish_reason,
                })
            }
            None => {
                debug!("LLM output: empty (no choices)");
                Ok(ChatCompletion {
                    content: None,
                    usage: parsed.usage,
                    finish_reason: None,
                })
            }
        }
    }
}
