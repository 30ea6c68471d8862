//! Speech synthesis over an OpenAI-compatible `/audio/speech` endpoint.
//!
//! Audio is requested as raw `pcm`: 24 kHz, mono, signed 16-bit
//! little-endian. Wrapping it in a container is the text-to-speech flow's job.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::ModelClient;
use crate::api::BackendError;

/// Request body for `/audio/speech`.
#[derive(Serialize, Debug)]
pub struct SpeechBody<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Spoken-language hint passed as `instructions` for a BCP-47 code.
pub fn language_instructions(language_code: &str) -> Option<String> {
    let primary = language_code
        .split(['-', '_'])
        .next()
        .unwrap_or(language_code)
        .to_lowercase();
    let language = match primary.as_str() {
        "ml" => "Malayalam",
        "en" => "English",
        "hi" => "Hindi",
        "ta" => "Tamil",
        "kn" => "Kannada",
        "te" => "Telugu",
        _ => return None,
    };
    Some(format!(
        "Speak clearly and warmly in {language}, at a relaxed pace suitable for farmers."
    ))
}

impl ModelClient {
    /// Synthesize `text` and return raw PCM bytes.
    pub async fn speech(&self, text: &str, language_code: &str) -> Result<Vec<u8>, BackendError> {
        let speech = &self.config.speech;
        let body = SpeechBody {
            model: &speech.model,
            input: text,
            voice: &speech.voice,
            response_format: "pcm",
            instructions: language_instructions(language_code),
        };
        debug!(
            "Speech request: model={}, voice={}, lang={}, {} chars",
            speech.model,
            speech.voice,
            language_code,
            text.chars().count()
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(&speech.url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.speech_api_key()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::http(status.as_u16(), resp.text().await));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BackendError::Request(format!("failed to read response: {e}")))?;
        debug!(
            "Speech response: {} bytes in {:.1}s",
            bytes.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(bytes.to_vec())
    }
}
