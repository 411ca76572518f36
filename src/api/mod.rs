/// Analysis backend seam and wire types.
///
/// The controller only talks to the backend through [`AnalysisBackend`], so the
/// HTTP client and the scripted mock are interchangeable.
pub mod http;
pub mod mock;
pub mod models;

use std::future::Future;

use thiserror::Error;

pub use models::{Document, DocumentMetadata, HealthStatus, QueryRequest, QueryResponse};

/// Message shown when a failure carries nothing more useful.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to analyze repository";

/// Errors that can end a round trip with the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("backend returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(String),

    #[error("undecodable response body: {0}")]
    Decode(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

impl ApiError {
    /// Human-readable text for the error notification.
    ///
    /// Status and decode failures collapse to [`FALLBACK_ERROR_MESSAGE`]; the
    /// body of a failed response is never shown.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status(_) | ApiError::Decode(_) => FALLBACK_ERROR_MESSAGE.to_string(),
            ApiError::Transport(msg) if msg.trim().is_empty() => {
                FALLBACK_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// A remote analysis service.
///
/// Implementations must be `Send + Sync` so a shared handle can be moved into
/// a spawned request task.
pub trait AnalysisBackend: Send + Sync {
    /// Perform one atomic query round trip.
    fn query(
        &self,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<QueryResponse, ApiError>> + Send;

    /// Probe the backend health endpoint.
    fn health(&self) -> impl Future<Output = Result<HealthStatus, ApiError>> + Send;
}
