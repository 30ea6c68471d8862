//! The Krishi Sakhi features, one flow per module.
//!
//! | Flow | Module |
//! |---|---|
//! | `chat` | [`chat`] |
//! | `crop_recommendations` | [`crops`] |
//! | `summarize_activity_logs` | [`summarize`] |
//! | `enhance_activity_log` | [`enhance`] |
//! | `weather_alerts` | [`weather`] |
//! | `text_to_speech` | [`speech`] |
//! | `translate_text` | [`translate`] |
//!
//! [`Sakhi`] bundles them behind one shared backend.

pub mod chat;
pub mod crops;
pub mod enhance;
pub mod speech;
pub mod summarize;
pub mod translate;
pub mod weather;

use std::sync::Arc;

use crate::backend::ModelBackend;
use crate::flow::{FlowDescriptor, FlowError, describe, execute};

use chat::{ChatFlow, ChatInput, ChatOutput};
use crops::{CropRecommendationsFlow, CropRecommendationsInput, CropRecommendationsOutput};
use enhance::{EnhanceActivityLogFlow, EnhanceActivityLogInput, EnhanceActivityLogOutput};
use speech::{TextToSpeechFlow, TextToSpeechInput, TextToSpeechOutput};
use summarize::{SummarizeActivityLogsFlow, SummarizeActivityLogsInput, SummarizeActivityLogsOutput};
use translate::{TranslateTextFlow, TranslateTextInput, TranslateTextOutput};
use weather::{WeatherAlertsFlow, WeatherAlertsInput, WeatherAlertsOutput};

/// Descriptors for every flow, in dashboard order.
pub fn catalog() -> Vec<FlowDescriptor> {
    vec![
        describe(&ChatFlow),
        describe(&CropRecommendationsFlow),
        describe(&SummarizeActivityLogsFlow),
        describe(&EnhanceActivityLogFlow),
        describe(&WeatherAlertsFlow),
        describe(&TextToSpeechFlow),
        describe(&TranslateTextFlow),
    ]
}

/// All flows over one backend.
///
/// Cheap to clone; clones share the backend. Calls may run concurrently.
#[derive(Clone)]
pub struct Sakhi {
    backend: Arc<dyn ModelBackend>,
}

impl Sakhi {
    pub fn new(backend: impl ModelBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn with_backend(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn ModelBackend {
        self.backend.as_ref()
    }

    pub async fn chat(&self, input: &ChatInput) -> Result<ChatOutput, FlowError> {
        execute(&ChatFlow, self.backend(), input).await
    }

    pub async fn recommend_crops(
        &self,
        input: &CropRecommendationsInput,
    ) -> Result<CropRecommendationsOutput, FlowError> {
        execute(&CropRecommendationsFlow, self.backend(), input).await
    }

    pub async fn summarize_logs(
        &self,
        input: &SummarizeActivityLogsInput,
    ) -> Result<SummarizeActivityLogsOutput, FlowError> {
        execute(&SummarizeActivityLogsFlow, self.backend(), input).await
    }

    pub async fn enhance_log(
        &self,
        input: &EnhanceActivityLogInput,
    ) -> Result<EnhanceActivityLogOutput, FlowError> {
        execute(&EnhanceActivityLogFlow, self.backend(), input).await
    }

    pub async fn weather_alerts(
        &self,
        input: &WeatherAlertsInput,
    ) -> Result<WeatherAlertsOutput, FlowError> {
        execute(&WeatherAlertsFlow, self.backend(), input).await
    }

    pub async fn text_to_speech(
        &self,
        input: &TextToSpeechInput,
    ) -> Result<TextToSpeechOutput, FlowError> {
        execute(&TextToSpeechFlow, self.backend(), input).await
    }

    pub async fn translate(
        &self,
        input: &TranslateTextInput,
    ) -> Result<TranslateTextOutput, FlowError> {
        execute(&TranslateTextFlow, self.backend(), input).await
    }
}

impl std::fmt::Debug for Sakhi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sakhi")
            .field("backend", &self.backend.name())
            .finish()
    }
}
