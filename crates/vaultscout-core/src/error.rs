//! Error types for `vaultscout-core`.
//!
//! Each concern gets its own enum. Per-path and per-engine failures during
//! discovery are NOT errors — they travel as data inside a
//! [`crate::types::SearchReport`] so a search always produces a best-effort
//! partial result. Crypto errors deliberately carry no cause: decrypt
//! failure detail is an oracle the UI must never see.

use vaultscout_api::ApiError;

/// Errors from the bounded worker pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Concurrency must be a positive integer.
    #[error("invalid pool concurrency: {given} (must be >= 1)")]
    InvalidConcurrency { given: usize },
}

/// Errors from versioned payload encryption.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Decrypt was called with an empty value.
    #[error("cannot decrypt an empty value")]
    NullValue,

    /// The value carries a version tag this build does not understand.
    #[error("unsupported encryption format '{tag}'")]
    UnsupportedVersion { tag: String },

    /// Encryption failed. Cause intentionally suppressed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decryption failed. Cause intentionally suppressed.
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Errors from the token lifecycle manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An operation that needs a live session was called without one.
    #[error("no active session")]
    NoSession,

    /// The Vault API rejected a session operation (login, logout).
    #[error("session API error: {0}")]
    Api(#[from] ApiError),
}

/// Errors from the multi-engine search coordinator.
///
/// Only listing the accessible engines can fail the search as a whole;
/// everything downstream degrades to entries in the report's error list.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The engine listing itself failed (auth or network).
    #[error("engine discovery failed: {0}")]
    Api(#[from] ApiError),

    /// The engine fan-out was started with an invalid pool configuration.
    #[error("search pool error: {0}")]
    Pool(#[from] PoolError),
}
