//! HTTP client abstraction consumed by the queue.
//!
//! Wraps a `reqwest::Client`. Every call to [`HttpClient::get_json`] issues a
//! fresh request, and [`HttpClient::factory`] packages that call so the
//! runner can reissue it on each attempt.

use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fault::HttpFault;
use crate::queue::{Pending, RequestFactory};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::debug;

/// Thin, cheaply cloneable JSON client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::Config(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Issue a GET and decode the body as JSON.
    ///
    /// Non-success statuses become a fault carrying the status. If `cancel`
    /// fires first the request is dropped and a cancellation fault returned.
    pub async fn get_json(
        &self,
        url: &str,
        cancel: Option<CancelSignal>,
    ) -> std::result::Result<Value, HttpFault> {
        let request = async {
            let response = self.client.get(url).send().await?;
            let response = response.error_for_status()?;
            let payload = response.json::<Value>().await?;
            Ok::<_, reqwest::Error>(payload)
        };

        match cancel {
            Some(signal) => {
                if signal.is_cancelled() {
                    return Err(HttpFault::cancelled(format!("GET {url} cancelled before start")));
                }
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => {
                        debug!(url, "request cancelled");
                        Err(HttpFault::cancelled(format!("GET {url} cancelled")))
                    }
                    result = request => result.map_err(HttpFault::from),
                }
            }
            None => request.await.map_err(HttpFault::from),
        }
    }

    /// A factory issuing a fresh `GET url` on every attempt.
    ///
    /// The same cancel signal is shared by all attempts.
    pub fn factory(
        &self,
        url: impl Into<String>,
        cancel: Option<CancelSignal>,
    ) -> RequestFactory<Value> {
        let client = self.clone();
        let url = url.into();
        Box::new(move || -> Pending<Value> {
            let client = client.clone();
            let url = url.clone();
            let cancel = cancel.clone();
            Box::pin(async move { client.get_json(&url, cancel).await })
        })
    }
}
