//! Attempt span helpers.
//!
//! Provides span creation and state-transition recording for work items
//! flowing through the runner.

use tracing::Span;

use crate::queue::SequenceId;

/// Start a span for one attempt of a work item.
///
/// The `fetch.outcome` field is declared empty and filled via
/// [`record_outcome`].
pub fn start_attempt_span(item: SequenceId, attempt: u32) -> Span {
    tracing::info_span!(
        "fetch.attempt",
        "fetch.item" = item.0,
        "fetch.attempt" = attempt,
        "fetch.outcome" = tracing::field::Empty,
    )
}

/// Record how the attempt ended on its span.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("fetch.outcome", outcome);
}

/// Record a state transition event on the given span.
///
/// Emits a tracing `info` event scoped to the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
