//! Work items and result delivery.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::fault::{ErrorClassifier, FaultRecord, HttpFault};

/// A request in flight: resolves to the decoded payload or a raw fault.
pub type Pending<T> = Pin<Box<dyn Future<Output = Result<T, HttpFault>> + Send>>;

/// Produces a fresh [`Pending`] request for every attempt.
pub type RequestFactory<T> = Box<dyn FnMut() -> Pending<T> + Send>;

/// Submission order of a work item. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One submitted unit of work, owned by the runner once admitted.
pub(crate) struct WorkItem<T> {
    pub(crate) seq: SequenceId,
    /// Failed attempts so far.
    pub(crate) attempts: u32,
    pub(crate) factory: RequestFactory<T>,
    pub(crate) responder: Responder<T>,
}

impl<T> WorkItem<T> {
    pub(crate) fn new(
        seq: SequenceId,
        factory: RequestFactory<T>,
        responder: Responder<T>,
    ) -> Self {
        Self {
            seq,
            attempts: 0,
            factory,
            responder,
        }
    }
}

/// Terminal result delivery. Consumed on use, so it fires at most once.
pub(crate) enum Responder<T> {
    Callbacks {
        on_success: Box<dyn FnOnce(T) + Send>,
        on_failure: Box<dyn FnOnce(FaultRecord) + Send>,
    },
    Channel(oneshot::Sender<Result<T, FaultRecord>>),
}

impl<T> Responder<T> {
    pub(crate) fn succeed(self, payload: T) {
        match self {
            Responder::Callbacks { on_success, .. } => on_success(payload),
            // receiver dropped means nobody is waiting
            Responder::Channel(tx) => {
                let _ = tx.send(Ok(payload));
            }
        }
    }

    pub(crate) fn fail(self, fault: FaultRecord) {
        match self {
            Responder::Callbacks { on_failure, .. } => on_failure(fault),
            Responder::Channel(tx) => {
                let _ = tx.send(Err(fault));
            }
        }
    }
}

/// Outcome of an item submitted with [`FetchQueue::enqueue`](super::FetchQueue::enqueue).
///
/// If the runner goes away without delivering, this resolves to a fault
/// classified by the queue's own classifier.
pub struct Completion<T> {
    seq: SequenceId,
    rx: oneshot::Receiver<Result<T, FaultRecord>>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl<T> Completion<T> {
    pub(crate) fn new(
        seq: SequenceId,
        rx: oneshot::Receiver<Result<T, FaultRecord>>,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        Self {
            seq,
            rx,
            classifier,
        }
    }

    pub fn seq(&self) -> SequenceId {
        self.seq
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, FaultRecord>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let seq = self.seq;
        let classifier = Arc::clone(&self.classifier);
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(classifier.classify(&HttpFault::other(format!(
                    "queue runner stopped before item {seq} completed"
                ))))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{DefaultClassifier, FaultKind, Locale};

    #[tokio::test]
    async fn dropped_runner_resolves_with_queue_locale() {
        let (tx, rx) = oneshot::channel::<Result<u32, FaultRecord>>();
        drop(tx);
        let completion = Completion::new(
            SequenceId(3),
            rx,
            Arc::new(DefaultClassifier::new(Locale::Es)),
        );

        let fault = completion.await.unwrap_err();
        assert_eq!(fault.kind, FaultKind::Unclassified);
        assert_eq!(fault.title, "Oops, hemos hecho algo mal");
        assert!(fault.detail.contains("#3"));
    }
}
