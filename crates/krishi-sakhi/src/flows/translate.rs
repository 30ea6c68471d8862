//! Translation of advice text, typically English to Malayalam.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextInput {
    /// The text to translate.
    #[schemars(length(min = 1))]
    pub text: String,
    /// Target language, by name or code ("Malayalam", "ml").
    #[schemars(length(min = 1))]
    pub target_language: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslateTextOutput {
    /// The translated text.
    pub translated_text: String,
}

const TEMPLATE: &str = "\
You translate agricultural advice for farmers in Kerala, India.
Translate the text below into {{targetLanguage}}. Keep crop names, quantities, and dates accurate, and use simple words a farmer would use. Return only the translation.

Text:
{{text}}
";

pub struct TranslateTextFlow;

impl Flow for TranslateTextFlow {
    type Input = TranslateTextInput;
    type Output = TranslateTextOutput;
    const NAME: &'static str = "translate_text";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}
