//! Notification delivery errors.

/// Errors from a [`Notifier`](crate::Notifier).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level failure (connect, TLS, client timeout).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Method and path that failed.
        endpoint: String,
        /// Underlying client error.
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status.
    #[error("notification service {endpoint} returned {status}: {body}")]
    Rejected {
        /// Method and path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Building the client failed.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Failure injected by a test double or reported by a custom notifier.
    #[error("notification failed: {0}")]
    Other(String),
}
