//! Conversational assistant.
//!
//! The caller owns the conversation: it passes the full history on every
//! call and appends the reply itself. The flow never stores or edits turns.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

/// Who said a turn.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One earlier turn of the conversation.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct ChatInput {
    /// The conversation history, oldest first.
    pub history: Vec<ChatTurn>,
    /// The latest message from the user.
    #[schemars(length(min = 1))]
    pub message: String,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct ChatOutput {
    /// The assistant's response.
    pub message: String,
}

const TEMPLATE: &str = "\
You are Krishi Sakhi, a friendly and helpful agricultural assistant for farmers in Kerala, India.

Give concise, accurate, practical advice. Reply in the language the user wrote in.

Conversation so far:
{{#each history}}
- {{role}}: {{content}}
{{/each}}

The user's latest message:
- user: {{message}}

If the user wants to log a farm activity, ask for the details you need. If they ask about the weather, give a simple forecast. For complex topics, suggest they visit the Advisor page.
";

/// Chat with the assistant.
pub struct ChatFlow;

impl Flow for ChatFlow {
    type Input = ChatInput;
    type Output = ChatOutput;
    const NAME: &'static str = "chat";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}
