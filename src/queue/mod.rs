//! Single-flight request queue.
//!
//! [`FetchQueue`] is a cloneable handle onto one runner task. Submissions are
//! sent to the runner, which owns the backlog and attempts exactly one item
//! at a time:
//!
//! - success removes the head and delivers the payload
//! - a cancelled attempt removes the head and delivers the fault
//! - any other fault counts against the retry bound; under budget the item
//!   is demoted to the tail, otherwise it is abandoned and the fault delivered
//!
//! Every accepted item gets exactly one terminal delivery.

mod item;
mod runner;

pub use item::{Completion, Pending, RequestFactory, SequenceId};

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{EVENT_CAPACITY, EventSink, QueueEvent};
use crate::fault::{DefaultClassifier, ErrorClassifier, FaultRecord, HttpFault};
use item::{Responder, WorkItem};
use runner::Runner;

/// Counters shared between the handles and the runner.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) submitted: AtomicU64,
    pub(crate) finished: AtomicU64,
    pub(crate) in_flight: AtomicBool,
}

/// Point-in-time view of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted since the queue was created.
    pub submitted: u64,
    /// Items that reached a terminal delivery.
    pub finished: u64,
    /// Items accepted but not yet finished, including the active one.
    pub pending: u64,
    /// Whether an attempt is outstanding right now.
    pub in_flight: bool,
}

struct Shared<T> {
    tx: Mutex<Option<mpsc::UnboundedSender<WorkItem<T>>>>,
    runner: Mutex<Option<JoinHandle<()>>>,
    next_seq: AtomicU64,
    counters: Arc<Counters>,
    events: broadcast::Sender<QueueEvent>,
    classifier: Arc<dyn ErrorClassifier>,
}

/// Handle onto a single-flight request queue.
pub struct FetchQueue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for FetchQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> FetchQueue<T> {
    /// Spawn a queue on the current tokio runtime with the default classifier.
    pub fn new(config: &Config) -> Self {
        Self::with_classifier(config, Arc::new(DefaultClassifier::new(config.locale)))
    }

    /// Spawn a queue with a custom fault classifier.
    pub fn with_classifier(config: &Config, classifier: Arc<dyn ErrorClassifier>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let counters = Arc::new(Counters::default());

        let runner = Runner::new(
            rx,
            config.retry_bound,
            Arc::clone(&classifier),
            Arc::clone(&counters),
            EventSink::new(events.clone()),
        );
        let handle = tokio::spawn(runner.run());

        Self {
            shared: Arc::new(Shared {
                tx: Mutex::new(Some(tx)),
                runner: Mutex::new(Some(handle)),
                next_seq: AtomicU64::new(1),
                counters,
                events,
                classifier,
            }),
        }
    }

    /// Submit work with a success/failure callback pair.
    ///
    /// `factory` is called once per attempt and must issue a fresh request
    /// each time. Exactly one of the callbacks fires, exactly once, on the
    /// runner task.
    pub fn submit<G, Fut, S, F>(
        &self,
        factory: G,
        on_success: S,
        on_failure: F,
    ) -> Result<SequenceId>
    where
        G: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, HttpFault>> + Send + 'static,
        S: FnOnce(T) + Send + 'static,
        F: FnOnce(FaultRecord) + Send + 'static,
    {
        self.push(
            boxed_factory(factory),
            Responder::Callbacks {
                on_success: Box::new(on_success),
                on_failure: Box::new(on_failure),
            },
        )
    }

    /// Submit work and receive its outcome as a future.
    pub fn enqueue<G, Fut>(&self, factory: G) -> Result<Completion<T>>
    where
        G: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, HttpFault>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let seq = self.push(boxed_factory(factory), Responder::Channel(tx))?;
        Ok(Completion::new(seq, rx, Arc::clone(&self.shared.classifier)))
    }

    fn push(&self, factory: RequestFactory<T>, responder: Responder<T>) -> Result<SequenceId> {
        let guard = self.shared.tx.lock().unwrap_or_else(|e| e.into_inner());
        // Assigned under the lock so channel order matches sequence order.
        let seq = SequenceId(self.shared.next_seq.fetch_add(1, Ordering::SeqCst));
        let Some(tx) = guard.as_ref() else {
            return Err(Error::QueueClosed(seq.0));
        };

        tx.send(WorkItem::new(seq, factory, responder))
            .map_err(|_| Error::QueueClosed(seq.0))?;
        self.shared.counters.submitted.fetch_add(1, Ordering::SeqCst);
        debug!(item = %seq, "submitted");
        Ok(seq)
    }

    /// Subscribe to state-transition events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshot of the queue counters.
    pub fn stats(&self) -> QueueStats {
        let counters = &self.shared.counters;
        let submitted = counters.submitted.load(Ordering::SeqCst);
        let finished = counters.finished.load(Ordering::SeqCst);
        QueueStats {
            submitted,
            finished,
            pending: submitted.saturating_sub(finished),
            in_flight: counters.in_flight.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting work, drain the backlog, and wait for the runner.
    ///
    /// Affects every clone of this handle. Calling it twice is harmless.
    pub async fn close(&self) -> Result<()> {
        drop(self.shared.tx.lock().unwrap_or_else(|e| e.into_inner()).take());
        let handle = self
            .shared
            .runner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| Error::Other(format!("queue runner failed: {e}")))?;
        }
        Ok(())
    }
}

fn boxed_factory<T, G, Fut>(mut factory: G) -> RequestFactory<T>
where
    G: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<T, HttpFault>> + Send + 'static,
{
    Box::new(move || -> Pending<T> { Box::pin(factory()) })
}
