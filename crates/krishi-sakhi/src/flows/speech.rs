//! Text-to-speech.
//!
//! Unlike the other flows this one calls the backend's speech capability.
//! The raw PCM it gets back is wrapped in a WAV container and returned as a
//! `data:audio/wav;base64,...` URI, which is then checked against the output
//! schema like any other reply.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::BackendError;
use crate::backend::{
    BackendFuture, GenerateRequest, ModelBackend, ModelOutput, SpeechAudio, SpeechRequest,
};
use crate::flow::Flow;

/// Prefix of every URI this flow returns.
pub const WAV_DATA_URI_PREFIX: &str = "data:audio/wav;base64,";

const BITS_PER_SAMPLE: u16 = 16;

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechInput {
    /// The text to speak.
    #[schemars(length(min = 1))]
    pub text: String,
    /// BCP-47 language of the text, e.g. `en-US` or `ml-IN`.
    #[schemars(length(min = 1))]
    pub language_code: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechOutput {
    /// The synthesized audio as a data URI.
    #[schemars(regex(pattern = r"^data:audio/"))]
    pub audio_data_uri: String,
}

impl TextToSpeechOutput {
    /// Decode the WAV bytes back out of the data URI.
    pub fn wav_bytes(&self) -> Option<Vec<u8>> {
        let payload = self.audio_data_uri.strip_prefix(WAV_DATA_URI_PREFIX)?;
        STANDARD.decode(payload).ok()
    }
}

/// Wrap raw 16-bit PCM in a RIFF/WAVE container.
///
/// Odd-length data gets the RIFF pad byte. Audio whose sizes do not fit the
/// 32-bit header fields is rejected with [`BackendError::Decode`].
pub fn wav_from_pcm(audio: &SpeechAudio) -> Result<Vec<u8>, BackendError> {
    let too_large = || {
        BackendError::Decode(format!(
            "{} bytes of PCM at {} Hz x {} channels do not fit a WAV file",
            audio.pcm.len(),
            audio.sample_rate,
            audio.channels
        ))
    };
    if audio.channels == 0 {
        return Err(BackendError::Decode("audio has zero channels".into()));
    }
    let data_len = u32::try_from(audio.pcm.len()).map_err(|_| too_large())?;
    let pad = data_len % 2;
    let riff_len = data_len.checked_add(36 + pad).ok_or_else(too_large)?;
    let block_align = audio
        .channels
        .checked_mul(BITS_PER_SAMPLE / 8)
        .ok_or_else(too_large)?;
    let byte_rate = audio
        .sample_rate
        .checked_mul(u32::from(block_align))
        .ok_or_else(too_large)?;

    let mut wav = Vec::with_capacity(44 + audio.pcm.len() + pad as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_len.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&audio.channels.to_le_bytes());
    wav.extend_from_slice(&audio.sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(&audio.pcm);
    if pad == 1 {
        wav.push(0);
    }
    Ok(wav)
}

/// Encode audio as a `data:audio/wav;base64,` URI.
pub fn wav_data_uri(audio: &SpeechAudio) -> Result<String, BackendError> {
    let wav = wav_from_pcm(audio)?;
    Ok(format!("{WAV_DATA_URI_PREFIX}{}", STANDARD.encode(wav)))
}

pub struct TextToSpeechFlow;

impl Flow for TextToSpeechFlow {
    type Input = TextToSpeechInput;
    type Output = TextToSpeechOutput;
    const NAME: &'static str = "text_to_speech";

    fn template(&self) -> &'static str {
        "{{text}}"
    }

    fn invoke<'a>(
        &'a self,
        backend: &'a dyn ModelBackend,
        input: &'a Self::Input,
        request: GenerateRequest,
    ) -> BackendFuture<'a, ModelOutput> {
        Box::pin(async move {
            let audio = backend
                .synthesize_speech(SpeechRequest {
                    trace_id: request.trace_id.clone(),
                    text: request.prompt,
                    language_code: input.language_code.clone(),
                })
                .await?;
            debug!(
                "[{}] {} bytes of PCM at {} Hz",
                request.trace_id,
                audio.pcm.len(),
                audio.sample_rate
            );
            if audio.pcm.is_empty() {
                return Ok(ModelOutput::Empty);
            }
            Ok(ModelOutput::Structured(
                json!({ "audioDataUri": wav_data_uri(&audio)? }),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubBackend;
    use crate::flow::{ErrorKind, execute};

    fn audio(pcm: Vec<u8>) -> SpeechAudio {
        SpeechAudio {
            pcm,
            sample_rate: 24_000,
            channels: 1,
        }
    }

    fn input() -> TextToSpeechInput {
        TextToSpeechInput {
            text: "Namaskaram".into(),
            language_code: "ml-IN".into(),
        }
    }

    #[test]
    fn wav_header_layout() {
        let wav = wav_from_pcm(&audio(vec![1, 0, 2, 0])).unwrap();
        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 40);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        // byte rate: 24 kHz * 1 channel * 2 bytes
        assert_eq!(u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(&wav[44..], &[1, 0, 2, 0]);
    }

    #[test]
    fn odd_length_data_is_padded() {
        let wav = wav_from_pcm(&audio(vec![1, 2, 3])).unwrap();
        assert_eq!(wav.len(), 48);
        // RIFF size counts the pad byte, the data chunk size does not.
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 40);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 3);
        assert_eq!(&wav[44..], &[1, 2, 3, 0]);
    }

    #[test]
    fn oversized_format_is_decode_error() {
        let wide = SpeechAudio {
            pcm: vec![0, 0],
            sample_rate: 24_000,
            channels: u16::MAX,
        };
        assert!(matches!(wav_from_pcm(&wide), Err(BackendError::Decode(_))));

        let fast = SpeechAudio {
            pcm: vec![0, 0],
            sample_rate: u32::MAX,
            channels: 2,
        };
        assert!(matches!(wav_from_pcm(&fast), Err(BackendError::Decode(_))));

        let silent = SpeechAudio {
            pcm: vec![0, 0],
            sample_rate: 24_000,
            channels: 0,
        };
        assert!(matches!(wav_from_pcm(&silent), Err(BackendError::Decode(_))));
    }

    #[tokio::test]
    async fn bad_audio_format_is_backend_error() {
        let stub = StubBackend::empty().with_speech(SpeechAudio {
            pcm: vec![0, 0],
            sample_rate: 24_000,
            channels: 0,
        });
        let err = execute(&TextToSpeechFlow, &stub, &input()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[tokio::test]
    async fn returns_wav_data_uri() {
        let stub = StubBackend::empty().with_speech(audio(vec![0, 0, 255, 127]));
        let out = execute(&TextToSpeechFlow, &stub, &input()).await.unwrap();
        assert!(out.audio_data_uri.starts_with("data:audio/wav;base64,"));
        let wav = out.wav_bytes().unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[44..], &[0, 0, 255, 127]);
        assert_eq!(stub.last_prompt().as_deref(), Some("Namaskaram"));
    }

    #[tokio::test]
    async fn empty_audio_is_output_error() {
        let stub = StubBackend::empty().with_speech(audio(Vec::new()));
        let err = execute(&TextToSpeechFlow, &stub, &input()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutputSchema);
    }

    #[tokio::test]
    async fn backend_without_speech_is_backend_error() {
        let stub = StubBackend::empty();
        let err = execute(&TextToSpeechFlow, &stub, &input()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn blank_language_rejected_before_backend() {
        let stub = StubBackend::empty().with_speech(audio(vec![0, 0]));
        let mut bad = input();
        bad.language_code.clear();
        let err = execute(&TextToSpeechFlow, &stub, &bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(stub.call_count(), 0);
    }
}
