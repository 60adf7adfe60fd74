//! Secret discovery and session engine for `vaultscout`.
//!
//! The core behind a credential-manager frontend: searches the key/value
//! trees of every accessible Vault secret engine under strict bounds on
//! in-flight requests, keeps the bearer-token session alive with proactive
//! renewal, and reads/writes secret payloads under every wire format the
//! project has ever shipped. The frontend renders what comes out of here;
//! nothing in this crate touches a DOM or a manifest.
//!
//! Entry points:
//! - [`search::SearchCoordinator`] — one call, one best-effort
//!   [`types::SearchReport`] over all engines.
//! - [`session::TokenLifecycle`] — login/logout plus the timer-driven
//!   renewal state machine.
//! - [`crypto`] — versioned encrypt/decrypt for stored values.
//! - [`pool`] — the bounded executor the coordinator fans out with.
//!
//! All I/O goes through the [`vaultscout_api::VaultApi`] seam, so every
//! piece here is testable against an in-memory vault.

pub mod crypto;
pub mod error;
pub mod explorer;
pub mod pool;
pub mod search;
pub mod session;
pub mod types;

#[cfg(test)]
mod testutil;

pub use error::{CryptoError, PoolError, SearchError, SessionError};
pub use search::SearchCoordinator;
pub use session::{SessionState, TokenLifecycle};
pub use types::{
    MatchRank, SearchFailure, SearchQuery, SearchReport, Secret, SecretEngine, Token,
};
