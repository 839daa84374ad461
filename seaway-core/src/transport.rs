//! Transport seam between the engine and the cluster
//!
//! The engine never talks HTTP directly. Every remote call goes through the
//! [`Transport`] trait, which executes one [`Operation`] and returns either
//! the successful [`Response`] or a [`TransportError`]. Implementations must
//! map non-2xx statuses to [`TransportError::Status`] so the engine can react
//! to conflict (409), missing document (404), and "already exists" responses.

use async_trait::async_trait;
use thiserror::Error;

use crate::operation::Operation;

/// A successful response from the cluster
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code (always 2xx)
    pub status: u16,

    /// Raw response body
    pub body: String,
}

impl Response {
    /// Create a response from a status code and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse the body as JSON into `T`
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body)
            .map_err(|e| TransportError::InvalidResponse(format!("failed to parse body: {}", e)))
    }
}

/// Errors surfaced by a [`Transport`] implementation
#[derive(Debug, Error)]
pub enum TransportError {
    /// The cluster answered with a non-success status
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection, DNS, or timeout failure before a status was received
    #[error("network error: {0}")]
    Network(String),

    /// The cluster answered but the body could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// The remote status code, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for failures that a transport-level retry may resolve
    ///
    /// Transient statuses (408, 429, 5xx) and network errors qualify;
    /// everything else needs caller intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Executes single operations against the cluster
///
/// The engine issues every ledger read/write, capability probe, and migration
/// operation through this trait, strictly one call at a time. Retry policy,
/// timeouts, and TLS are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one operation and return the response
    async fn execute(&self, operation: &Operation) -> Result<Response, TransportError>;
}
