//! Error types for the dispatch gateway.

use std::time::Duration;

use md2doc_compiler::{CompileError, TableOffsetError};

/// Error from a single remote service call, classified from the HTTP
/// response status.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service throttled the request (retried with backoff).
    #[error("rate limited by remote service")]
    RateLimited {
        /// Server-provided hint for when to retry.
        retry_after: Option<Duration>,
    },

    /// Transient server-side failure (retried like a rate limit).
    #[error("transient server error: {status}")]
    Transient {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// The bearer credential is no longer valid. Never retried locally:
    /// the caller must obtain a fresh credential and re-invoke dispatch
    /// from scratch.
    #[error("credential expired")]
    CredentialExpired,

    /// The credential lacks permission for the operation.
    #[error("permission denied: {body}")]
    PermissionDenied { body: String },

    /// The service rejected the request as malformed.
    #[error("malformed request: {body}")]
    MalformedRequest { body: String },

    /// The response could not be interpreted.
    #[error("unexpected response: {status} - {body}")]
    Unexpected { status: u16, body: String },

    /// HTTP transport failure (network error, timeout, etc).
    #[error("HTTP transport failed")]
    Transport(#[from] Box<ureq::Error>),

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

impl From<ureq::Error> for ServiceError {
    fn from(err: ureq::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl ServiceError {
    /// Classify an HTTP error status into a service error.
    #[must_use]
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => Self::RateLimited { retry_after },
            401 => Self::CredentialExpired,
            403 => Self::PermissionDenied { body },
            400 => Self::MalformedRequest { body },
            500..=599 => Self::Transient { status, body },
            _ => Self::Unexpected { status, body },
        }
    }

    /// Whether the failed call may be retried with the same batch.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient { .. } | Self::Transport(_)
        )
    }

    /// Server-provided retry delay hint, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Machine-readable classification of a dispatch failure, surfaced to the
/// caller so it can decide to retry later, re-authenticate or give up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchErrorKind {
    RateLimited,
    Transient,
    CredentialExpired,
    PermissionDenied,
    MalformedRequest,
    Cancelled,
    Internal,
}

/// Error from dispatching a compiled document.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The compiler detected an internal invariant violation. The remote
    /// document was never touched.
    #[error("compilation failed")]
    Compile(#[from] CompileError),

    /// Cell offsets could not be resolved from the read-back structure.
    #[error("table offset resolution failed")]
    TableOffset(#[from] TableOffsetError),

    /// A retryable failure persisted through the bounded retry budget.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ServiceError,
    },

    /// A non-retryable service failure.
    #[error(transparent)]
    Fatal(ServiceError),

    /// The conversion was cancelled before the primary batch was sent.
    #[error("conversion cancelled before dispatch")]
    Cancelled,
}

impl DispatchError {
    /// The machine-readable error kind.
    #[must_use]
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            Self::Compile(_) | Self::TableOffset(_) => DispatchErrorKind::Internal,
            Self::Cancelled => DispatchErrorKind::Cancelled,
            Self::RetriesExhausted { last, .. } => service_kind(last),
            Self::Fatal(err) => service_kind(err),
        }
    }

    /// Retry-after hint for rate-limited failures.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RetriesExhausted { last, .. } => last.retry_after(),
            Self::Fatal(err) => err.retry_after(),
            _ => None,
        }
    }
}

fn service_kind(err: &ServiceError) -> DispatchErrorKind {
    match err {
        ServiceError::RateLimited { .. } => DispatchErrorKind::RateLimited,
        ServiceError::Transient { .. } | ServiceError::Transport(_) => {
            DispatchErrorKind::Transient
        }
        ServiceError::CredentialExpired => DispatchErrorKind::CredentialExpired,
        ServiceError::PermissionDenied { .. } => DispatchErrorKind::PermissionDenied,
        ServiceError::MalformedRequest { .. } => DispatchErrorKind::MalformedRequest,
        ServiceError::Unexpected { .. } | ServiceError::Json(_) => DispatchErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ServiceError::from_status(429, String::new(), None),
            ServiceError::RateLimited { .. }
        ));
        assert!(matches!(
            ServiceError::from_status(401, String::new(), None),
            ServiceError::CredentialExpired
        ));
        assert!(matches!(
            ServiceError::from_status(403, String::new(), None),
            ServiceError::PermissionDenied { .. }
        ));
        assert!(matches!(
            ServiceError::from_status(400, String::new(), None),
            ServiceError::MalformedRequest { .. }
        ));
        assert!(matches!(
            ServiceError::from_status(503, String::new(), None),
            ServiceError::Transient { status: 503, .. }
        ));
    }

    #[test]
    fn test_retryability() {
        assert!(ServiceError::from_status(429, String::new(), None).is_retryable());
        assert!(ServiceError::from_status(500, String::new(), None).is_retryable());
        assert!(!ServiceError::CredentialExpired.is_retryable());
        assert!(!ServiceError::from_status(403, String::new(), None).is_retryable());
        assert!(!ServiceError::from_status(400, String::new(), None).is_retryable());
    }

    #[test]
    fn test_dispatch_error_kind_and_hint() {
        let hint = Duration::from_secs(30);
        let err = DispatchError::RetriesExhausted {
            attempts: 4,
            last: ServiceError::RateLimited {
                retry_after: Some(hint),
            },
        };
        assert_eq!(err.kind(), DispatchErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(hint));

        let err = DispatchError::Fatal(ServiceError::CredentialExpired);
        assert_eq!(err.kind(), DispatchErrorKind::CredentialExpired);
    }
}
