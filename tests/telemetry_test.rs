//! Integration tests for telemetry initialization and span helpers.

use fetchq::SequenceId;
use fetchq::telemetry::{TelemetryConfig, init_telemetry, metrics, queue};

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // This may return Err if another test already set one; that is acceptable.
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: None,
        service_name: "fetchq-test".to_string(),
        log_level: "debug".to_string(),
    });
}

#[test]
fn attempt_span_records_outcome_and_transition() {
    let span = queue::start_attempt_span(SequenceId(1), 2);
    queue::record_state_transition(&span, "queued", "running");
    queue::record_outcome(&span, "retried");
}

#[test]
fn metric_instruments_work_without_provider() {
    metrics::submitted().add(1, &[]);
    metrics::completed().add(1, &[opentelemetry::KeyValue::new("outcome", "succeeded")]);
    metrics::attempt_duration_ms().record(1.5, &[]);
}
