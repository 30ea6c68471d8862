//! Deterministic in-process backend.
//!
//! [`StubBackend`] answers every call with the same scripted reply and
//! records what it was asked, so tests can assert on call counts and rendered
//! prompts without a network. The CLI uses it for `--stub-reply` runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{BackendFuture, GenerateRequest, ModelBackend, ModelOutput, SpeechAudio, SpeechRequest};
use crate::api::BackendError;

#[derive(Debug, Clone)]
enum Reply {
    Output(ModelOutput),
    Fail(BackendError),
}

/// A backend that returns a fixed reply and counts calls.
#[derive(Debug)]
pub struct StubBackend {
    reply: Reply,
    speech: Option<SpeechAudio>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubBackend {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            speech: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with an already-structured JSON value.
    pub fn json(value: serde_json::Value) -> Self {
        Self::with_reply(Reply::Output(ModelOutput::Structured(value)))
    }

    /// Reply with free text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Output(ModelOutput::Text(text.into())))
    }

    /// Reply with no content.
    pub fn empty() -> Self {
        Self::with_reply(Reply::Output(ModelOutput::Empty))
    }

    /// Fail every call with `err`.
    pub fn failing(err: BackendError) -> Self {
        Self::with_reply(Reply::Fail(err))
    }

    /// Also answer speech calls with `audio`.
    pub fn with_speech(mut self, audio: SpeechAudio) -> Self {
        self.speech = Some(audio);
        self
    }

    /// Number of `generate` and `synthesize_speech` calls received.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt (or speech text) received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recent prompt, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    fn record(&self, prompt: String) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt);
    }
}

impl ModelBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn generate(&self, request: GenerateRequest) -> BackendFuture<'_, ModelOutput> {
        self.record(request.prompt);
        let result = match &self.reply {
            Reply::Output(output) => Ok(output.clone()),
            Reply::Fail(err) => Err(err.clone()),
        };
        Box::pin(async move { result })
    }

    fn synthesize_speech(&self, request: SpeechRequest) -> BackendFuture<'_, SpeechAudio> {
        self.record(request.text);
        let result = match (&self.speech, &self.reply) {
            (_, Reply::Fail(err)) => Err(err.clone()),
            (Some(audio), _) => Ok(audio.clone()),
            (None, _) => Err(BackendError::Unsupported(
                "stub backend has no scripted audio".into(),
            )),
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            flow: "test",
            trace_id: "fl-test".into(),
            prompt: prompt.into(),
            output_schema: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn replies_are_repeatable() {
        let stub = StubBackend::json(serde_json::json!({"summary": "ok"}));
        let first = stub.generate(request("a")).await.unwrap();
        let second = stub.generate(request("b")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(stub.call_count(), 2);
        assert_eq!(stub.prompts(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(stub.last_prompt().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn failing_stub_counts_calls() {
        let stub = StubBackend::failing(BackendError::Http {
            status: 503,
            body: "down".into(),
        });
        let err = stub.generate(request("x")).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn speech_requires_script() {
        let stub = StubBackend::empty();
        let req = SpeechRequest {
            trace_id: "t".into(),
            text: "hello".into(),
            language_code: "en-US".into(),
        };
        assert!(stub.synthesize_speech(req.clone()).await.is_err());

        let audio = SpeechAudio {
            pcm: vec![0, 0, 1, 0],
            sample_rate: 24_000,
            channels: 1,
        };
        let stub = StubBackend::empty().with_speech(audio.clone());
        assert_eq!(stub.synthesize_speech(req).await.unwrap(), audio);
    }
}
