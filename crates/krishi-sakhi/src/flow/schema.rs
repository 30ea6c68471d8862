//! JSON Schema checks for flow input and output documents.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// One way a document failed its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// JSON pointer to the offending value (`""` for the document root).
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    /// A violation of the document as a whole.
    pub fn root(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Join violations into a single line for error messages.
pub fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate `instance` against `schema`, collecting every violation.
pub fn check(schema: &Value, instance: &Value) -> Result<(), Vec<FieldViolation>> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| vec![FieldViolation::root(format!("schema is invalid: {e}"))])?;

    let violations: Vec<FieldViolation> = validator
        .iter_errors(instance)
        .map(|e| FieldViolation {
            path: e.instance_path().to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
