//! Error types for the Vault HTTP binding.
//!
//! Every non-2xx response is mapped to exactly one variant so callers can
//! branch on the failure class without inspecting status codes themselves.

/// All errors that can come out of a [`crate::VaultClient`] call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid client configuration.
    #[error("vault config error: {0}")]
    Config(String),

    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("vault network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request hit the client-side timeout.
    #[error("vault request timed out")]
    Timeout,

    /// HTTP 403 — the token is missing, expired, or lacks capability.
    #[error("vault denied access: {message}")]
    Forbidden { message: String },

    /// HTTP 404 — the path or mount does not exist.
    #[error("vault path not found: {message}")]
    NotFound { message: String },

    /// HTTP 429 — the server is shedding load.
    #[error("vault rate limited: {message}")]
    RateLimited { message: String },

    /// HTTP 5xx — the server failed.
    #[error("vault server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("unexpected vault response {status}: {message}")]
    Unexpected { status: u16, message: String },

    /// A response body did not match the expected shape.
    #[error("vault response decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this failure means the session token is no longer usable.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}
