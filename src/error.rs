//! Error types for fetchq.
//!
//! These cover setup and submission failures. Faults raised while a request
//! is being attempted never surface here; the runner classifies them into a
//! [`FaultRecord`](crate::fault::FaultRecord) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("queue is closed, submission {0} was rejected")]
    QueueClosed(u64),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
