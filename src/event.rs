//! Structured events emitted by the runner on every state transition.
//!
//! Subscribers receive them over a broadcast channel. A slow subscriber
//! lags and loses events; it never holds up the runner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::fault::FaultKind;
use crate::queue::SequenceId;

/// Buffered events per subscriber before it starts lagging.
pub const EVENT_CAPACITY: usize = 1024;

/// A structured event emitted by the runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Admitted to the tail of the backlog.
    Added { item: SequenceId, backlog: usize },
    /// An attempt began. `attempt` is 1-based.
    Started { item: SequenceId, attempt: u32 },
    /// Delivered a payload. `attempts` counts the failures before it.
    Succeeded { item: SequenceId, attempts: u32 },
    /// Failed under budget and demoted to the tail.
    Retried {
        item: SequenceId,
        attempts: u32,
        fault: FaultKind,
    },
    /// Aborted through its cancellation signal.
    Cancelled { item: SequenceId, attempts: u32 },
    /// Exhausted the retry bound.
    Abandoned {
        item: SequenceId,
        attempts: u32,
        fault: FaultKind,
    },
}

impl EventKind {
    pub fn item(&self) -> SequenceId {
        match self {
            EventKind::Added { item, .. }
            | EventKind::Started { item, .. }
            | EventKind::Succeeded { item, .. }
            | EventKind::Retried { item, .. }
            | EventKind::Cancelled { item, .. }
            | EventKind::Abandoned { item, .. } => *item,
        }
    }
}

/// Runner-owned publisher.
pub(crate) struct EventSink {
    tx: broadcast::Sender<QueueEvent>,
    next_seq: u64,
}

impl EventSink {
    pub(crate) fn new(tx: broadcast::Sender<QueueEvent>) -> Self {
        Self { tx, next_seq: 0 }
    }

    pub(crate) fn emit(&mut self, kind: EventKind) {
        self.next_seq += 1;
        // no subscribers is fine
        let _ = self.tx.send(QueueEvent {
            seq: self.next_seq,
            timestamp: Utc::now(),
            kind,
        });
    }
}
