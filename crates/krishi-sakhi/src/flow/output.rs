//! Turning a raw backend reply into a typed flow output.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::FlowError;
use super::schema;
use crate::backend::ModelOutput;

/// Parse, validate, and deserialize a backend reply.
///
/// Empty replies, replies that are not JSON, and JSON that fails the schema
/// are all [`FlowError::OutputSchema`]. Nothing partially filled ever comes
/// back.
pub fn decode<T: DeserializeOwned>(
    flow: &'static str,
    output: ModelOutput,
    output_schema: &Value,
) -> Result<T, FlowError> {
    let value = match output {
        ModelOutput::Empty => Value::Null,
        ModelOutput::Structured(value) => value,
        ModelOutput::Text(text) if text.trim().is_empty() => Value::Null,
        ModelOutput::Text(text) => extract_json(&text).ok_or_else(|| {
            FlowError::output(
                flow,
                format!("reply is not a JSON object: {}", preview(&text)),
            )
        })?,
    };
    if value.is_null() {
        return Err(FlowError::output(flow, "empty reply"));
    }

    if let Err(violations) = schema::check(output_schema, &value) {
        return Err(FlowError::OutputSchema {
            flow,
            detail: schema::describe(&violations),
            violations,
        });
    }

    serde_json::from_value(value).map_err(|e| FlowError::output(flow, e.to_string()))
}

/// Find the JSON value in a free-text reply.
///
/// Accepts bare JSON, JSON inside a Markdown code fence, and a JSON object
/// surrounded by prose.
// Slice starts come from `char_indices`, so they sit on char boundaries.
#[allow(clippy::string_slice)]
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = strip_code_fence(trimmed)
        && let Ok(value) = serde_json::from_str(fenced)
    {
        return Some(value);
    }

    // First object that parses from any opening brace; prose may carry
    // stray braces of its own.
    trimmed.char_indices().filter(|&(_, c)| c == '{').find_map(|(i, _)| {
        serde_json::Deserializer::from_str(&trimmed[i..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
            .filter(Value::is_object)
    })
}

#[allow(clippy::string_slice)]
fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the info string (e.g. "json") on the opening line.
    let body_start = rest.find('\n')? + 1;
    let body = rest[body_start..].trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    Some(body.trim())
}

fn preview(text: &str) -> String {
    let snippet: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        format!("{snippet}...")
    } else {
        snippet
    }
}
