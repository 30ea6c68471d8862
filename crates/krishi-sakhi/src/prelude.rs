//! Convenience re-exports for the common case.
//!
//! ```ignore
//! use krishi_sakhi::prelude::*;
//! ```

pub use crate::api::BackendError;
pub use crate::backend::stub::StubBackend;
pub use crate::backend::{ModelBackend, ModelOutput, SpeechAudio};
pub use crate::config::{ClientConfig, FlowConfig, SpeechConfig};
pub use crate::flow::{ErrorKind, Flow, FlowError, execute, execute_json};
pub use crate::flows::Sakhi;
pub use crate::flows::chat::{ChatFlow, ChatInput, ChatOutput, ChatRole, ChatTurn};
pub use crate::flows::crops::{
    CropRecommendationsFlow, CropRecommendationsInput, CropRecommendationsOutput,
};
pub use crate::flows::enhance::{
    EnhanceActivityLogFlow, EnhanceActivityLogInput, EnhanceActivityLogOutput,
};
pub use crate::flows::speech::{TextToSpeechFlow, TextToSpeechInput, TextToSpeechOutput};
pub use crate::flows::summarize::{
    SummarizeActivityLogsFlow, SummarizeActivityLogsInput, SummarizeActivityLogsOutput,
};
pub use crate::flows::translate::{TranslateTextFlow, TranslateTextInput, TranslateTextOutput};
pub use crate::flows::weather::{
    RecentActivity, Severity, WeatherAlert, WeatherAlertsFlow, WeatherAlertsInput,
    WeatherAlertsOutput,
};
pub use crate::ModelClient;
