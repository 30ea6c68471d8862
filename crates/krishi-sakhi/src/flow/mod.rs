//! The prompt-flow contract.
//!
//! A [`Flow`] pairs an input type, an output type, and a prompt template.
//! [`execute`] runs one invocation:
//!
//! 1. Serialize the input and validate it against the input schema. On
//!    failure return [`FlowError::Validation`] without touching the backend.
//! 2. Render the template against the validated input.
//! 3. Hand the prompt and output schema to the [`ModelBackend`].
//! 4. Parse the reply and validate it against the output schema. On failure
//!    return [`FlowError::OutputSchema`].
//!
//! Flows hold no state, so any number of invocations may run concurrently
//! against the same backend. Nothing is retried.

pub mod error;
pub mod output;
pub mod schema;
pub mod template;

pub use error::{ErrorKind, FlowError};
pub use schema::FieldViolation;
pub use template::{PromptTemplate, TemplateError};

use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api::generate_trace_id;
use crate::backend::{BackendFuture, GenerateRequest, ModelBackend, ModelOutput};
use crate::json_schema_for;

/// A typed prompt flow.
///
/// # Example
///
/// ```
/// use krishi_sakhi::flow::Flow;
/// use schemars::JsonSchema;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, JsonSchema)]
/// struct Question { text: String }
///
/// #[derive(Serialize, Deserialize, JsonSchema)]
/// struct Answer { answer: String }
///
/// struct Ask;
///
/// impl Flow for Ask {
///     type Input = Question;
///     type Output = Answer;
///     const NAME: &'static str = "ask";
///
///     fn template(&self) -> &'static str {
///         "Answer briefly: {{text}}"
///     }
/// }
/// ```
pub trait Flow: Send + Sync {
    type Input: Serialize + DeserializeOwned + JsonSchema + Send + Sync;
    type Output: Serialize + DeserializeOwned + JsonSchema + Send;

    /// Stable identifier used in logs, errors, and `response_format`.
    const NAME: &'static str;

    /// Prompt template source. See [`template`] for the syntax.
    fn template(&self) -> &'static str;

    /// Call the backend with the rendered request.
    ///
    /// The default asks for text generation. Flows that need a different
    /// capability (speech) override this and convert the result into a
    /// [`ModelOutput`] that is validated like any other reply.
    fn invoke<'a>(
        &'a self,
        backend: &'a dyn ModelBackend,
        _input: &'a Self::Input,
        request: GenerateRequest,
    ) -> BackendFuture<'a, ModelOutput> {
        backend.generate(request)
    }
}

/// Input and output schemas of a flow, for documentation and tooling.
#[derive(Debug, Clone, Serialize)]
pub struct FlowDescriptor {
    pub name: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
    pub template: &'static str,
}

/// Describe a flow's contract.
pub fn describe<F: Flow>(flow: &F) -> FlowDescriptor {
    FlowDescriptor {
        name: F::NAME,
        input_schema: json_schema_for::<F::Input>(),
        output_schema: json_schema_for::<F::Output>(),
        template: flow.template(),
    }
}

/// Render a flow's prompt for `input` without calling any backend.
///
/// Input is validated first, exactly as [`execute`] would.
pub fn render_prompt<F: Flow>(flow: &F, input: &F::Input) -> Result<String, FlowError> {
    let context = to_context::<F>(input)?;
    validate_input::<F>(&context)?;
    render::<F>(flow, &context)
}

/// Run a flow on typed input.
pub async fn execute<F: Flow>(
    flow: &F,
    backend: &dyn ModelBackend,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    let context = to_context::<F>(input)?;
    validate_input::<F>(&context)?;
    run(flow, backend, input, &context).await
}

/// Run a flow on raw JSON input, as received from a UI or the CLI.
///
/// Missing fields, wrong types, and unknown enum values are reported as
/// [`FlowError::Validation`] with one entry per offending field.
pub async fn execute_json<F: Flow>(
    flow: &F,
    backend: &dyn ModelBackend,
    input: Value,
) -> Result<F::Output, FlowError> {
    validate_input::<F>(&input)?;
    let typed: F::Input =
        serde_json::from_value(input.clone()).map_err(|e| FlowError::Validation {
            flow: F::NAME,
            violations: vec![FieldViolation::root(e.to_string())],
        })?;
    run(flow, backend, &typed, &input).await
}

fn to_context<F: Flow>(input: &F::Input) -> Result<Value, FlowError> {
    serde_json::to_value(input).map_err(|e| FlowError::Validation {
        flow: F::NAME,
        violations: vec![FieldViolation::root(format!("input is not serializable: {e}"))],
    })
}

fn validate_input<F: Flow>(context: &Value) -> Result<(), FlowError> {
    schema::check(&json_schema_for::<F::Input>(), context).map_err(|violations| {
        warn!(
            "[{}] rejected input: {}",
            F::NAME,
            schema::describe(&violations)
        );
        FlowError::Validation {
            flow: F::NAME,
            violations,
        }
    })
}

fn render<F: Flow>(flow: &F, context: &Value) -> Result<String, FlowError> {
    PromptTemplate::parse(flow.template())
        .and_then(|t| t.render(context))
        .map_err(|source| FlowError::Template {
            flow: F::NAME,
            source,
        })
}

async fn run<F: Flow>(
    flow: &F,
    backend: &dyn ModelBackend,
    input: &F::Input,
    context: &Value,
) -> Result<F::Output, FlowError> {
    let trace_id = generate_trace_id();
    let prompt = render::<F>(flow, context)?;
    let output_schema = json_schema_for::<F::Output>();

    info!(
        "Flow started: flow={}, trace_id={}, backend={}",
        F::NAME,
        trace_id,
        backend.name()
    );
    debug!("[{trace_id}] prompt ({} chars)", prompt.chars().count());

    let start = Instant::now();
    let request = GenerateRequest {
        flow: F::NAME,
        trace_id: trace_id.clone(),
        prompt,
        output_schema: output_schema.clone(),
    };
    let reply = flow
        .invoke(backend, input, request)
        .await
        .map_err(|source| {
            warn!("[{trace_id}] backend failed: {source}");
            FlowError::Backend {
                flow: F::NAME,
                source,
            }
        })?;

    let result = output::decode::<F::Output>(F::NAME, reply, &output_schema);
    match &result {
        Ok(_) => info!(
            "Flow completed: flow={}, trace_id={}, elapsed={:.1}s",
            F::NAME,
            trace_id,
            start.elapsed().as_secs_f64()
        ),
        Err(e) => warn!("[{trace_id}] {e}"),
    }
    result
}
