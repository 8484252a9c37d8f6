//! The runner: owns the backlog and attempts one item at a time.

use opentelemetry::KeyValue;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, warn};

use super::Counters;
use super::item::{Pending, SequenceId, WorkItem};
use crate::event::{EventKind, EventSink};
use crate::fault::{ErrorClassifier, FaultKind, HttpFault};
use crate::telemetry::metrics::Instruments;
use crate::telemetry::queue::{record_outcome, record_state_transition, start_attempt_span};

pub(crate) struct Runner<T> {
    rx: mpsc::UnboundedReceiver<WorkItem<T>>,
    backlog: VecDeque<WorkItem<T>>,
    retry_bound: u32,
    classifier: Arc<dyn ErrorClassifier>,
    counters: Arc<Counters>,
    events: EventSink,
    instruments: Instruments,
}

impl<T: Send + 'static> Runner<T> {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<WorkItem<T>>,
        retry_bound: u32,
        classifier: Arc<dyn ErrorClassifier>,
        counters: Arc<Counters>,
        events: EventSink,
    ) -> Self {
        Self {
            rx,
            backlog: VecDeque::new(),
            retry_bound,
            classifier,
            counters,
            events,
            instruments: Instruments::new(),
        }
    }

    /// Run until every handle is gone and the backlog is drained.
    pub(crate) async fn run(mut self) {
        debug!(retry_bound = self.retry_bound, "runner started");

        loop {
            self.admit_arrivals();

            if self.backlog.is_empty() {
                debug!("runner idle");
                match self.rx.recv().await {
                    Some(item) => self.admit(item),
                    None => break,
                }
                continue;
            }

            self.attempt_head().await;
        }

        debug!("runner stopped");
    }

    /// Admit everything submitted since the last check, in arrival order.
    fn admit_arrivals(&mut self) {
        while let Ok(item) = self.rx.try_recv() {
            self.admit(item);
        }
    }

    fn admit(&mut self, item: WorkItem<T>) {
        let seq = item.seq;
        self.backlog.push_back(item);
        self.instruments.submitted.add(1, &[]);
        debug!(item = %seq, backlog = self.backlog.len(), "added");
        self.events.emit(EventKind::Added {
            item: seq,
            backlog: self.backlog.len(),
        });
    }

    /// Attempt the head item once and route the outcome.
    ///
    /// The head stays in place while its attempt is outstanding, so anything
    /// admitted afterwards lands behind it.
    async fn attempt_head(&mut self) {
        let Some(head) = self.backlog.front_mut() else {
            return;
        };
        let seq = head.seq;
        let attempt = head.attempts + 1;
        // A panicking operation is a fault of that item, not of the runner.
        let issued = panic::catch_unwind(AssertUnwindSafe(|| (head.factory)()));
        let pending: Pending<T> = match issued {
            Ok(pending) => pending,
            Err(payload) => {
                let fault = panic_fault(seq, &*payload);
                Box::pin(async move { Err::<T, HttpFault>(fault) })
            }
        };

        let span = start_attempt_span(seq, attempt);
        record_state_transition(&span, "queued", "running");
        debug!(item = %seq, attempt, "started");
        self.events.emit(EventKind::Started { item: seq, attempt });
        self.instruments.attempts.add(1, &[]);

        self.counters.in_flight.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let outcome = match tokio::spawn(pending.instrument(span.clone())).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(panic_fault(seq, &*e.into_panic())),
            Err(e) => Err(HttpFault::other(format!("attempt for item {seq} aborted: {e}"))),
        };
        self.instruments
            .attempt_duration_ms
            .record(started.elapsed().as_secs_f64() * 1000.0, &[]);
        self.counters.in_flight.store(false, Ordering::SeqCst);

        // Arrivals during the attempt queue ahead of a demoted head.
        self.admit_arrivals();

        let Some(mut item) = self.backlog.pop_front() else {
            return;
        };

        let fault = match outcome {
            Ok(payload) => {
                record_outcome(&span, "succeeded");
                record_state_transition(&span, "running", "succeeded");
                info!(item = %seq, attempts = item.attempts, "succeeded");
                self.events.emit(EventKind::Succeeded {
                    item: seq,
                    attempts: item.attempts,
                });
                self.finish("succeeded");
                item.responder.succeed(payload);
                return;
            }
            Err(fault) => fault,
        };

        let record = self.classifier.classify(&fault);

        if record.kind == FaultKind::Cancelled {
            record_outcome(&span, "cancelled");
            record_state_transition(&span, "running", "cancelled");
            warn!(item = %seq, attempts = item.attempts, detail = %record.detail, "cancelled");
            self.events.emit(EventKind::Cancelled {
                item: seq,
                attempts: item.attempts,
            });
            self.finish("cancelled");
            item.responder.fail(record);
            return;
        }

        item.attempts += 1;

        if item.attempts >= self.retry_bound {
            record_outcome(&span, "abandoned");
            record_state_transition(&span, "running", "abandoned");
            warn!(
                item = %seq,
                attempts = item.attempts,
                retry_bound = self.retry_bound,
                kind = %record.kind,
                detail = %record.detail,
                "abandoned"
            );
            self.events.emit(EventKind::Abandoned {
                item: seq,
                attempts: item.attempts,
                fault: record.kind,
            });
            self.finish("abandoned");
            item.responder.fail(record);
            return;
        }

        record_outcome(&span, "retried");
        record_state_transition(&span, "running", "queued");
        debug!(
            item = %seq,
            attempts = item.attempts,
            kind = %record.kind,
            detail = %record.detail,
            "retried"
        );
        self.events.emit(EventKind::Retried {
            item: seq,
            attempts: item.attempts,
            fault: record.kind,
        });
        self.instruments
            .retried
            .add(1, &[KeyValue::new("fault", record.kind.as_str())]);
        self.backlog.push_back(item);
    }

    fn finish(&self, outcome: &'static str) {
        self.counters.finished.fetch_add(1, Ordering::SeqCst);
        self.instruments
            .completed
            .add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

fn panic_fault(seq: SequenceId, payload: &(dyn Any + Send)) -> HttpFault {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    error!(item = %seq, panic = %message, "operation panicked");
    HttpFault::other(format!("operation for item {seq} panicked: {message}"))
}
