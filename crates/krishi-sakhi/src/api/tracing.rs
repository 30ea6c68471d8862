//! Correlation ids for flow invocations.
//!
//! Every call to [`execute`](crate::flow::execute) gets a fresh id that
//! appears in each log line it emits and in the request handed to the
//! backend. The id carries no behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Generate a unique id for one flow invocation.
pub fn generate_trace_id() -> String {
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    // Counter disambiguates calls within the same clock tick.
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fl-{ts:x}-{count:04x}")
}
