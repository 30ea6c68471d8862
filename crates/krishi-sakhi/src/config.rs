//! Client and flow configuration.
//!
//! Every setting has a default; [`ClientConfig::from_env`] fills in the API
//! key and any overrides from environment variables, and the builder methods
//! let callers (the CLI, tests) adjust individual values.
//!
//! ```ignore
//! let config = ClientConfig::from_env()?
//!     .with_flow(FlowConfig::default().with_temperature(0.2))
//!     .with_speech(SpeechConfig::default().with_voice("nova"));
//! ```

use std::time::Duration;

use crate::api::BackendError;
use crate::{DEFAULT_MODEL, DEFAULT_SPEECH_MODEL, DEFAULT_SPEECH_URL, OPENROUTER_URL};

/// Environment variable holding the chat completions API key.
pub const API_KEY_ENV: &str = "OPENROUTER_KEY";
/// Overrides [`FlowConfig::model`].
pub const MODEL_ENV: &str = "KRISHI_MODEL";
/// Overrides [`ClientConfig::chat_url`].
pub const CHAT_URL_ENV: &str = "KRISHI_CHAT_URL";
/// Overrides [`SpeechConfig::url`].
pub const SPEECH_URL_ENV: &str = "KRISHI_SPEECH_URL";
/// API key for the speech endpoint when it differs from the chat key.
pub const SPEECH_KEY_ENV: &str = "KRISHI_SPEECH_KEY";

/// Generation settings shared by all text flows.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Maximum tokens per reply. Default: `2048`.
    pub max_tokens: u32,
    /// Sampling temperature. Default: `0.4`.
    pub temperature: f32,
    /// Send the output schema as `response_format`. Default: `true`.
    ///
    /// Some models reject schema-constrained generation; with this off the
    /// schema is still described in the system message and the reply is
    /// still validated.
    pub structured_output: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.4,
            structured_output: true,
        }
    }
}

impl FlowConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }
}

/// Speech synthesis endpoint settings.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// OpenAI-compatible `/audio/speech` URL. Default: [`DEFAULT_SPEECH_URL`].
    pub url: String,
    /// Separate API key for the speech endpoint. Falls back to the chat key.
    pub api_key: Option<String>,
    /// Default: [`DEFAULT_SPEECH_MODEL`].
    pub model: String,
    /// Default: `"alloy"`.
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SPEECH_URL.to_string(),
            api_key: None,
            model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: "alloy".to_string(),
        }
    }
}

impl SpeechConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

/// Everything [`ModelClient`](crate::ModelClient) needs to reach the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    /// Chat completions URL. Default: [`OPENROUTER_URL`].
    pub chat_url: String,
    /// Sent as `HTTP-Referer`.
    pub referer: String,
    /// Sent as `X-Title`.
    pub title: String,
    /// Per-request timeout. Default: 120 seconds.
    pub timeout: Duration,
    pub flow: FlowConfig,
    pub speech: SpeechConfig,
}

impl ClientConfig {
    /// Defaults with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            chat_url: OPENROUTER_URL.to_string(),
            referer: "https://github.com/krishi-sakhi".to_string(),
            title: "Krishi Sakhi".to_string(),
            timeout: Duration::from_secs(120),
            flow: FlowConfig::default(),
            speech: SpeechConfig::default(),
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// Fails with [`BackendError::Config`] when `OPENROUTER_KEY` is not set.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BackendError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_ENV)
            .ok_or_else(|| BackendError::Config(format!("{API_KEY_ENV} is not set")))?;

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty(MODEL_ENV) {
            config.flow.model = model;
        }
        if let Some(url) = non_empty(CHAT_URL_ENV) {
            config.chat_url = url;
        }
        if let Some(url) = non_empty(SPEECH_URL_ENV) {
            config.speech.url = url;
        }
        config.speech.api_key = non_empty(SPEECH_KEY_ENV);
        Ok(config)
    }

    pub fn with_chat_url(mut self, url: impl Into<String>) -> Self {
        self.chat_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_flow(mut self, flow: FlowConfig) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_speech(mut self, speech: SpeechConfig) -> Self {
        self.speech = speech;
        self
    }

    /// Key used for the speech endpoint.
    pub fn speech_api_key(&self) -> &str {
        self.speech.api_key.as_deref().unwrap_or(&self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new("key");
        assert_eq!(config.chat_url, OPENROUTER_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.flow.model, DEFAULT_MODEL);
        assert!(config.flow.structured_output);
        assert_eq!(config.speech.voice, "alloy");
        assert_eq!(config.speech_api_key(), "key");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, BackendError::Config(ref m) if m.contains(API_KEY_ENV)));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let result = ClientConfig::from_lookup(lookup_from(&[(API_KEY_ENV, "   ")]));
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "chat-key"),
            (MODEL_ENV, "anthropic/claude-haiku"),
            (CHAT_URL_ENV, "http://localhost:8080/v1/chat/completions"),
            (SPEECH_URL_ENV, "http://localhost:8080/v1/audio/speech"),
            (SPEECH_KEY_ENV, "speech-key"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "chat-key");
        assert_eq!(config.flow.model, "anthropic/claude-haiku");
        assert_eq!(config.chat_url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.speech.url, "http://localhost:8080/v1/audio/speech");
        assert_eq!(config.speech_api_key(), "speech-key");
    }

    #[test]
    fn builders_chain() {
        let config = ClientConfig::new("k")
            .with_timeout(Duration::from_secs(5))
            .with_flow(
                FlowConfig::default()
                    .with_model("m")
                    .with_max_tokens(256)
                    .with_temperature(0.0)
                    .with_structured_output(false),
            )
            .with_speech(SpeechConfig::default().with_voice("nova").with_model("tts-1"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.flow.model, "m");
        assert_eq!(config.flow.max_tokens, 256);
        assert!(!config.flow.structured_output);
        assert_eq!(config.speech.voice, "nova");
        assert_eq!(config.speech.model, "tts-1");
    }
}
