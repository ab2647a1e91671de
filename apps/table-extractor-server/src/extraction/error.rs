//! Extraction error types

use thiserror::Error;

use super::types::BackendName;
use crate::services::ServiceError;

/// Unrecoverable failure of one backend run
#[derive(Debug, Error)]
#[error("{backend} extraction failed: {kind}")]
pub struct ExtractionError {
    pub backend: BackendName,
    pub kind: ExtractionErrorKind,
}

#[derive(Debug, Error)]
pub enum ExtractionErrorKind {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("credential failure: {0}")]
    Credentials(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("backend panicked: {0}")]
    Panicked(String),

    #[error("backend is not configured")]
    NotConfigured,
}

impl ExtractionError {
    pub fn new(backend: BackendName, kind: ExtractionErrorKind) -> Self {
        Self { backend, kind }
    }

    pub fn io(backend: BackendName, err: std::io::Error) -> Self {
        Self::new(backend, ExtractionErrorKind::Io(err))
    }

    /// Classify a service client failure for the given backend
    pub fn service(backend: BackendName, err: ServiceError) -> Self {
        let kind = match err {
            ServiceError::NotConfigured(what) => ExtractionErrorKind::Unavailable(what),
            ServiceError::MissingCredentials(what) => {
                ExtractionErrorKind::Credentials(format!("{} is not set", what))
            }
            ServiceError::Http { status, body } if status == 401 || status == 403 => {
                ExtractionErrorKind::Credentials(format!("rejected with {}: {}", status, body))
            }
            ServiceError::Http { status, body } if status == 415 || status == 422 => {
                ExtractionErrorKind::InvalidDocument(format!("{}: {}", status, body))
            }
            ServiceError::Io(e) => ExtractionErrorKind::Io(e),
            other => ExtractionErrorKind::Service(other.to_string()),
        };
        Self::new(backend, kind)
    }
}
