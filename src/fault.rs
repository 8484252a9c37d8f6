//! Fault classification.
//!
//! The HTTP layer raises an [`HttpFault`]: an opaque bag of facts about what
//! went wrong. A fault can satisfy several shapes at once (a cancelled
//! request may still carry a status), so the [`ErrorClassifier`] checks them
//! in a fixed order and the first match wins:
//!
//! 1. a remote status code → [`FaultKind::RemoteError`]
//! 2. an explicit cancellation → [`FaultKind::Cancelled`]
//! 3. a request that was sent without a response → [`FaultKind::TransportNoResponse`]
//! 4. anything else → [`FaultKind::Unclassified`]

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Raw fault
// ---------------------------------------------------------------------------

/// A fault raised by the HTTP layer while attempting a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpFault {
    /// Status code of the remote response, if one arrived.
    pub status: Option<u16>,
    /// The attempt was aborted through its cancellation signal.
    pub cancelled: bool,
    /// The request left the client (connect, timeout or body failure).
    pub request_sent: bool,
    /// Original error text.
    pub message: String,
}

impl HttpFault {
    /// A fault carrying a remote response status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            request_sent: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// An attempt aborted through its cancellation signal.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            cancelled: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// A request that was sent but never answered.
    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            request_sent: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Anything the HTTP layer could not attribute.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for HttpFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpFault {}

impl From<reqwest::Error> for HttpFault {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if let Some(status) = err.status() {
            return Self::status(status.as_u16(), message);
        }
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return Self::no_response(message);
        }
        // decode, builder and redirect errors
        Self::other(message)
    }
}

// ---------------------------------------------------------------------------
// Classified fault
// ---------------------------------------------------------------------------

/// The fixed set of fault kinds a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FaultKind {
    /// The server was reachable and answered with a failure status.
    RemoteError(u16),
    /// The caller aborted the request.
    Cancelled,
    /// No response was obtained.
    TransportNoResponse,
    /// Anything else.
    Unclassified,
}

impl FaultKind {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::RemoteError(_) => "remote_error",
            FaultKind::Cancelled => "cancelled",
            FaultKind::TransportNoResponse => "transport_no_response",
            FaultKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::RemoteError(status) => write!(f, "remote_error({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A classified, user-displayable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub kind: FaultKind,
    pub title: String,
    pub summary: String,
    pub detail: String,
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.summary, self.detail)
    }
}

impl std::error::Error for FaultRecord {}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Language of the human-readable fault text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Maps a raw fault into a [`FaultRecord`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, fault: &HttpFault) -> FaultRecord;
}

/// Classifier applying the fixed first-match ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier {
    locale: Locale,
}

impl DefaultClassifier {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Decide the kind alone, without building display text.
    pub fn kind_of(fault: &HttpFault) -> FaultKind {
        if let Some(status) = fault.status {
            FaultKind::RemoteError(status)
        } else if fault.cancelled {
            FaultKind::Cancelled
        } else if fault.request_sent {
            FaultKind::TransportNoResponse
        } else {
            FaultKind::Unclassified
        }
    }
}

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, fault: &HttpFault) -> FaultRecord {
        let kind = Self::kind_of(fault);
        let (title, summary, detail) = match (self.locale, kind) {
            (Locale::En, FaultKind::RemoteError(_)) => (
                "Oops! Something went wrong",
                "The server responded with an error",
                fault.message.clone(),
            ),
            (Locale::En, FaultKind::Cancelled) => (
                "Request cancelled",
                "The request was cancelled",
                format!("The request was cancelled by the caller: {}", fault.message),
            ),
            (Locale::En, FaultKind::TransportNoResponse) => (
                "Oops, something happened",
                "The request could not be completed",
                format!("Message: {}", fault.message),
            ),
            (Locale::En, FaultKind::Unclassified) => (
                "Oops, we did something wrong",
                "An unexpected error occurred, please contact support",
                format!("Message: {}", fault.message),
            ),
            (Locale::Es, FaultKind::RemoteError(_)) => (
                "Oops! algo salió mal",
                "El servidor respondió con un error",
                fault.message.clone(),
            ),
            (Locale::Es, FaultKind::Cancelled) => (
                "Vale, no pasa nada, cancelado",
                "La solicitud se ha cancelado exitosamente",
                format!("El usuario ha cancelado la petición: {}", fault.message),
            ),
            (Locale::Es, FaultKind::TransportNoResponse) => (
                "Oops, algo ha pasado",
                "La solicitud no se pudo completar de manera correcta",
                format!("Mensaje: {}", fault.message),
            ),
            (Locale::Es, FaultKind::Unclassified) => (
                "Oops, hemos hecho algo mal",
                "Un error inesperado ha ocurrido, por favor contacta a soporte",
                format!("Mensaje: {}", fault.message),
            ),
        };

        FaultRecord {
            kind,
            title: title.to_string(),
            summary: summary.to_string(),
            detail,
        }
    }
}
