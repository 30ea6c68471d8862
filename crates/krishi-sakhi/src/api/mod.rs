//! HTTP-facing pieces: backend error classification, correlation ids, and
//! the speech endpoint.
//!
//! - [`error`]: [`BackendError`] and transient/permanent classification
//!   (429, 5xx and network timeouts are transient; 400/401/403 are not).
//!   Nothing here retries. The classification is for callers deciding
//!   whether to offer "try again".
//! - [`tracing`]: correlation ids attached to every flow invocation.
//! - [`speech`]: OpenAI-compatible `/audio/speech` requests returning raw PCM.

pub mod error;
pub mod speech;
pub mod tracing;

pub use error::BackendError;
pub use tracing::generate_trace_id;
