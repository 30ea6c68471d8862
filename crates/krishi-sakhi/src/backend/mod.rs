//! The seam between flows and the generative model.
//!
//! [`ModelBackend`] is deliberately small: one call for text generation and
//! one for speech. Flows render their prompt, hand a [`GenerateRequest`] to
//! the backend, and validate whatever comes back. The backend knows nothing
//! about individual flows beyond the name and output schema it is given.
//!
//! Implementations:
//! - [`ModelClient`](crate::ModelClient): HTTP, OpenAI-compatible.
//! - [`StubBackend`](stub::StubBackend): scripted replies with call
//!   counting, for tests and offline runs.

pub mod stub;

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::api::BackendError;
use crate::{ChatCompletion, ChatRequest, Message, ModelClient, ResponseFormat, SPEECH_SAMPLE_RATE};

/// Boxed future returned by [`ModelBackend`] methods.
///
/// Boxed so the trait stays dyn-compatible.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// One text generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Name of the flow issuing the call.
    pub flow: &'static str,
    /// Correlation id of the invocation.
    pub trace_id: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// JSON Schema the reply must satisfy.
    pub output_schema: serde_json::Value,
}

/// What a backend produced for a [`GenerateRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Already-parsed JSON (schema-constrained generation).
    Structured(serde_json::Value),
    /// Free text, expected to contain a JSON object.
    Text(String),
    /// The backend returned no content at all.
    Empty,
}

/// One speech synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub trace_id: String,
    pub text: String,
    /// BCP-47 code such as `en-US` or `ml-IN`.
    pub language_code: String,
}

/// Raw synthesized audio: signed 16-bit little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A generative-model invocation service.
pub trait ModelBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Generate a reply for a rendered prompt.
    fn generate(&self, request: GenerateRequest) -> BackendFuture<'_, ModelOutput>;

    /// Synthesize speech. Backends without audio support keep the default,
    /// which fails with [`BackendError::Unsupported`].
    fn synthesize_speech(&self, request: SpeechRequest) -> BackendFuture<'_, SpeechAudio> {
        let err = BackendError::Unsupported(format!(
            "backend '{}' cannot synthesize speech ({} chars requested)",
            self.name(),
            request.text.chars().count()
        ));
        Box::pin(async move { Err(err) })
    }
}

/// System message telling the model to answer in JSON matching `schema`.
pub fn json_reply_instructions(schema: &serde_json::Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "Respond only with a single JSON object that conforms to the following JSON Schema. \
         Do not wrap it in Markdown and do not add any text before or after it.\n\n{schema_text}"
    )
}

/// Turn a chat completion into a [`ModelOutput`], flagging truncated replies.
fn completion_output(trace_id: &str, completion: ChatCompletion) -> ModelOutput {
    if let Some(usage) = &completion.usage {
        debug!(
            "[{trace_id}] tokens: prompt={}, completion={}, total={}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0)
        );
    }
    if completion.finish_reason.as_deref() == Some("length") {
        warn!("[{trace_id}] reply hit max_tokens and is probably truncated");
    }
    match completion.content {
        Some(text) if !text.trim().is_empty() => ModelOutput::Text(text),
        _ => ModelOutput::Empty,
    }
}

impl ModelBackend for ModelClient {
    fn name(&self) -> &str {
        "model-client"
    }

    fn generate(&self, request: GenerateRequest) -> BackendFuture<'_, ModelOutput> {
        Box::pin(async move {
            let flow_config = &self.config.flow;
            let response_format = flow_config
                .structured_output
                .then(|| ResponseFormat::json_schema(request.flow, request.output_schema.clone()));
            let body = ChatRequest {
                model: flow_config.model.clone(),
                messages: vec![
                    Message::system(json_reply_instructions(&request.output_schema)),
                    Message::user(request.prompt),
                ],
                max_tokens: flow_config.max_tokens,
                temperature: flow_config.temperature,
                response_format,
            };
            debug!("[{}] {} -> {}", request.trace_id, request.flow, flow_config.model);

            let completion = self.chat(&body).await?;
            Ok(completion_output(&request.trace_id, completion))
        })
    }

    fn synthesize_speech(&self, request: SpeechRequest) -> BackendFuture<'_, SpeechAudio> {
        Box::pin(async move {
            let pcm = self.speech(&request.text, &request.language_code).await?;
            Ok(SpeechAudio {
                pcm,
                sample_rate: SPEECH_SAMPLE_RATE,
                channels: 1,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TextOnly;

    impl ModelBackend for TextOnly {
        fn name(&self) -> &str {
            "text-only"
        }

        fn generate(&self, _request: GenerateRequest) -> BackendFuture<'_, ModelOutput> {
            Box::pin(async { Ok(ModelOutput::Empty) })
        }
    }

    #[tokio::test]
    async fn default_speech_is_unsupported() {
        let err = TextOnly
            .synthesize_speech(SpeechRequest {
                trace_id: "t".into(),
                text: "namaskaram".into(),
                language_code: "ml-IN".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(ref m) if m.contains("text-only")));
    }

    #[test]
    fn instructions_embed_schema() {
        let schema = serde_json::json!({"type": "object", "required": ["summary"]});
        let text = json_reply_instructions(&schema);
        assert!(text.contains("\"summary\""));
        assert!(text.contains("JSON Schema"));
    }

    #[test]
    fn completion_content_becomes_text() {
        let completion = ChatCompletion {
            content: Some("{\"summary\": \"cut".into()),
            usage: None,
            finish_reason: Some("length".into()),
        };
        assert_eq!(
            completion_output("t", completion),
            ModelOutput::Text("{\"summary\": \"cut".into())
        );
    }

    #[test]
    fn blank_completion_is_empty() {
        for content in [None, Some("  \n".to_string())] {
            let completion = ChatCompletion {
                content,
                usage: None,
                finish_reason: Some("stop".into()),
            };
            assert_eq!(completion_output("t", completion), ModelOutput::Empty);
        }
    }

    #[test]
    fn backend_is_dyn_compatible() {
        let backends: Vec<Box<dyn ModelBackend>> = vec![Box::new(TextOnly)];
        assert_eq!(backends[0].name(), "text-only");
    }
}
