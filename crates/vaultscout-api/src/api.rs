//! The [`VaultApi`] trait — everything the discovery and session engines
//! need from a Vault server, abstracted so tests can swap in an in-memory
//! fake.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{AuthMethod, EngineInfo, KvVersion, SessionGrant};

/// Operations the core consumes from a Vault server.
///
/// Paths are logical segment lists relative to the engine mount; KV v1/v2
/// layout differences (`metadata/`/`data/` prefixes, nested response data)
/// are the implementation's concern.
#[async_trait]
pub trait VaultApi: Send + Sync {
    /// Authenticate and store the granted token for subsequent requests.
    ///
    /// For [`AuthMethod::Token`] the `password` argument carries an
    /// existing bearer token; it is adopted and validated instead of
    /// posted to a login path, and the returned lease is its remaining
    /// TTL.
    async fn login(
        &self,
        username: &str,
        password: &str,
        method: AuthMethod,
    ) -> Result<SessionGrant, ApiError>;

    /// Replace (or clear) the stored bearer token, e.g. when restoring a
    /// persisted session.
    async fn set_token(&self, token: Option<&str>);

    /// Remaining TTL of the current token, in seconds.
    async fn token_ttl(&self) -> Result<i64, ApiError>;

    /// Self-renew the current token; the stored token is replaced with the
    /// newly granted one.
    async fn renew_token(&self) -> Result<SessionGrant, ApiError>;

    /// Self-revoke the current token and clear it from the client.
    async fn logout(&self) -> Result<(), ApiError>;

    /// List accessible secret engines, keyed by mount name (no trailing `/`).
    async fn list_engines(&self) -> Result<HashMap<String, EngineInfo>, ApiError>;

    /// List the children of a folder. Folder entries keep their trailing `/`.
    async fn list(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
    ) -> Result<Vec<String>, ApiError>;

    /// Read a secret's key/value data, normalized across KV versions.
    async fn read(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
    ) -> Result<HashMap<String, String>, ApiError>;

    /// Write a secret's key/value data.
    async fn write(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
        data: &HashMap<String, String>,
    ) -> Result<(), ApiError>;

    /// Delete a secret (v2: deletes metadata and all versions).
    async fn delete(&self, engine: &str, version: KvVersion, path: &[String])
        -> Result<(), ApiError>;

    /// Wrap arbitrary data into a single-use wrapping token.
    async fn wrap(&self, data: &serde_json::Value, ttl_secs: u64) -> Result<String, ApiError>;

    /// Unwrap a wrapping token. Tokens are single-use server-side; a second
    /// unwrap fails.
    async fn unwrap_wrapped(&self, token: &str) -> Result<serde_json::Value, ApiError>;
}
