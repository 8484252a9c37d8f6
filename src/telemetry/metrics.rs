//! Metric instrument factories for fetchq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created from the `"fetchq"` meter. Without a
//! configured provider they are no-ops.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for fetchq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("fetchq")
}

/// Counter: work items accepted by `submit`/`enqueue`.
pub fn submitted() -> Counter<u64> {
    meter()
        .u64_counter("fetchq.submitted")
        .with_description("Number of work items submitted")
        .build()
}

/// Counter: attempts started.
pub fn attempts() -> Counter<u64> {
    meter()
        .u64_counter("fetchq.attempts")
        .with_description("Number of request attempts started")
        .build()
}

/// Counter: attempts that failed under budget and were demoted.
/// Labels: `fault`.
pub fn retried() -> Counter<u64> {
    meter()
        .u64_counter("fetchq.retried")
        .with_description("Number of failed attempts re-queued at the tail")
        .build()
}

/// Counter: terminal outcomes.
/// Labels: `outcome` ("succeeded" | "cancelled" | "abandoned").
pub fn completed() -> Counter<u64> {
    meter()
        .u64_counter("fetchq.completed")
        .with_description("Number of work items that reached a terminal outcome")
        .build()
}

/// Histogram: attempt duration in milliseconds.
pub fn attempt_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("fetchq.attempt.duration_ms")
        .with_description("Request attempt duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// The instrument set held by a runner.
pub(crate) struct Instruments {
    pub(crate) submitted: Counter<u64>,
    pub(crate) attempts: Counter<u64>,
    pub(crate) retried: Counter<u64>,
    pub(crate) completed: Counter<u64>,
    pub(crate) attempt_duration_ms: Histogram<f64>,
}

impl Instruments {
    pub(crate) fn new() -> Self {
        Self {
            submitted: submitted(),
            attempts: attempts(),
            retried: retried(),
            completed: completed(),
            attempt_duration_ms: attempt_duration_ms(),
        }
    }
}
