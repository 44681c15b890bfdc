//! Span helpers for a single action run.

use tracing::Span;

use crate::init::build_sha;

/// Top-level span for one run, carrying the operation and correlation id.
#[must_use]
pub fn run_span(operation: &str, trace_id: &str) -> Span {
    tracing::info_span!(
        "run",
        operation = %operation,
        trace_id = %trace_id,
        build_sha = %build_sha()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_span_can_be_entered() {
        let span = run_span("create", "trace-1");
        let _entered = span.enter();
    }
}
