//! # fetchq
//!
//! Single-flight sequential request queue.
//!
//! Callers submit request factories; one runner task attempts them strictly
//! one at a time, demotes failed items to the tail of the backlog until a
//! retry bound is reached, and delivers either the payload or a classified
//! [`FaultRecord`](fault::FaultRecord) to the original caller exactly once.
//!
//! ```no_run
//! use fetchq::{Config, FetchQueue, HttpClient};
//!
//! # async fn demo() -> fetchq::Result<()> {
//! let config = Config::from_env()?;
//! let http = HttpClient::new(&config)?;
//! let queue = FetchQueue::new(&config);
//!
//! let fact = queue.enqueue(http.factory("https://catfact.ninja/fact", None))?;
//! match fact.await {
//!     Ok(payload) => println!("{payload}"),
//!     Err(fault) => eprintln!("{}: {}", fault.title, fault.summary),
//! }
//! queue.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod event;
pub mod fault;
pub mod http;
pub mod queue;
pub mod telemetry;

pub use cancel::{CancelHandle, CancelSignal, cancel_after, cancel_pair};
pub use config::Config;
pub use error::{Error, Result};
pub use fault::{DefaultClassifier, ErrorClassifier, FaultKind, FaultRecord, HttpFault, Locale};
pub use http::HttpClient;
pub use queue::{Completion, FetchQueue, QueueStats, SequenceId};
