//! HTTP binding to a Vault server for `vaultscout`.
//!
//! Exposes the [`VaultApi`] trait — the seam the discovery and session
//! engines consume — and [`VaultClient`], its `reqwest` implementation.
//! The client owns the bearer token (set on login, replaced on renewal,
//! cleared on logout) and attaches it as `X-Vault-Token` to every request.
//!
//! # Example
//!
//! ```rust,no_run
//! use vaultscout_api::{AuthMethod, VaultApi, VaultClient};
//!
//! # async fn example() -> Result<(), vaultscout_api::ApiError> {
//! let client = VaultClient::new("https://vault.example.com".to_owned())?;
//! let grant = client.login("alice", "hunter2", AuthMethod::Userpass).await?;
//! let engines = client.list_engines().await?;
//! # let _ = (grant, engines);
//! # Ok(())
//! # }
//! ```

mod api;
mod client;
mod error;
mod types;

pub use api::VaultApi;
pub use error::ApiError;
pub use types::{AuthMethod, EngineInfo, KvVersion, SessionGrant};

use std::time::Duration;

use tokio::sync::RwLock;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Vault client.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base URL of the Vault server, e.g. `https://vault.example.com`.
    pub base_url: String,
    /// Per-request timeout. Default: 10 seconds.
    pub timeout: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Vault HTTP client. Cheap to share behind an `Arc`.
pub struct VaultClient {
    base_url: String,
    client: reqwest::Client,
    token: RwLock<Option<String>>,
}
