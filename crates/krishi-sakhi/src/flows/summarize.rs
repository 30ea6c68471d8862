//! Summaries of a farmer's activity log.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeActivityLogsInput {
    /// The farmer's activity log, one entry per line.
    #[schemars(length(min = 1))]
    pub activity_logs: String,
}

impl SummarizeActivityLogsInput {
    /// Join individual entries into the newline-separated form.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let activity_logs = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self { activity_logs }
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct SummarizeActivityLogsOutput {
    /// A concise summary of the activity log.
    pub summary: String,
}

const TEMPLATE: &str = "\
You are an AI assistant helping farmers keep track of their work.

Write a concise summary of the following activity log:

{{activityLogs}}
";

pub struct SummarizeActivityLogsFlow;

impl Flow for SummarizeActivityLogsFlow {
    type Input = SummarizeActivityLogsInput;
    type Output = SummarizeActivityLogsOutput;
    const NAME: &'static str = "summarize_activity_logs";

    fn template(&self) -> &'static str {
        TEMPLATE
    }
}
