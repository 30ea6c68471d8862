//! Error taxonomy for flow invocations.

use thiserror::Error;

use super::schema::{FieldViolation, describe};
use super::template::TemplateError;
use crate::api::BackendError;

/// Coarse classification of a [`FlowError`] for callers that only need to
/// decide what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller must fix its input.
    Validation,
    /// The backend failed; the caller may try again.
    Backend,
    /// The backend replied with something the flow cannot use.
    OutputSchema,
    /// The flow's own template is broken.
    Template,
}

/// Why a flow invocation failed.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Input did not satisfy the flow's input schema. The backend was not
    /// called.
    #[error("invalid input for flow '{flow}': {}", describe(.violations))]
    Validation {
        flow: &'static str,
        violations: Vec<FieldViolation>,
    },

    /// The backend call itself failed.
    #[error("model backend failed for flow '{flow}': {source}")]
    Backend {
        flow: &'static str,
        #[source]
        source: BackendError,
    },

    /// The reply could not be coerced into the output schema.
    #[error("reply for flow '{flow}' does not match its output schema: {detail}")]
    OutputSchema {
        flow: &'static str,
        detail: String,
        violations: Vec<FieldViolation>,
    },

    #[error("prompt template for flow '{flow}' is malformed: {source}")]
    Template {
        flow: &'static str,
        #[source]
        source: TemplateError,
    },
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::Validation { .. } => ErrorKind::Validation,
            FlowError::Backend { .. } => ErrorKind::Backend,
            FlowError::OutputSchema { .. } => ErrorKind::OutputSchema,
            FlowError::Template { .. } => ErrorKind::Template,
        }
    }

    /// Name of the flow that failed.
    pub fn flow(&self) -> &'static str {
        match self {
            FlowError::Validation { flow, .. }
            | FlowError::Backend { flow, .. }
            | FlowError::OutputSchema { flow, .. }
            | FlowError::Template { flow, .. } => *flow,
        }
    }

    /// Field-level details for validation and output schema failures.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            FlowError::Validation { violations, .. }
            | FlowError::OutputSchema { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Whether repeating the same call could succeed without changing input.
    ///
    /// True for transient backend failures and for schema mismatches, since
    /// model output varies between calls.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Backend { source, .. } => source.is_transient(),
            FlowError::OutputSchema { .. } => true,
            FlowError::Validation { .. } | FlowError::Template { .. } => false,
        }
    }

    pub(crate) fn output(flow: &'static str, detail: impl Into<String>) -> Self {
        FlowError::OutputSchema {
            flow,
            detail: detail.into(),
            violations: Vec::new(),
        }
    }
}
