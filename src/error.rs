//! Error types for the scribe content pipeline.

use std::time::Duration;
use thiserror::Error;

/// A kind name that is not one of the supported content kinds.
#[derive(Debug, Clone, Error)]
#[error("Unknown content kind: {0} (expected seo, blog, podcast or social)")]
pub struct UnknownKind(pub String);

/// Failures reaching a generation provider.
///
/// Every variant is recovered by the cascade; none reaches the caller of `generate`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Stable reason code used in telemetry counters.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Network(_) => "network",
            ProviderError::ServerError { .. } => "server_error",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::AuthFailed(_) => "auth_failed",
            ProviderError::MissingCredentials(_) => "missing_credentials",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Ledger load and persistence errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to persist ledger to {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger document at {path} is unreadable: {message}")]
    Unreadable { path: String, message: String },

    #[error("Ledger serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger backend error: {0}")]
    Backend(String),

    #[error("Sequence {sequence} for kind {kind} is already assigned")]
    SequenceConflict { kind: String, sequence: u64 },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
