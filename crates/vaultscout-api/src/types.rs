//! Wire types for the Vault HTTP API.
//!
//! Vault wraps everything in an envelope (`data`, `auth`, `wrap_info`);
//! the structs here mirror only the fields this client consumes. KV version
//! differences (v1: secret data at the top of `data`; v2: nested under
//! `data.data`) are normalized in [`crate::VaultClient`] so callers never
//! see them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// KV secret-engine version. Determines path layout and response nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KvVersion {
    /// Flat layout, data at the top level of the response `data` block.
    V1,
    /// Versioned layout: `metadata/` for listing, `data/` for reads,
    /// secret data nested one level deeper.
    V2,
}

/// Authentication method for login. Selects the auth-mount login path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// `auth/userpass/login/<username>`.
    Userpass,
    /// `auth/ldap/login/<username>`.
    Ldap,
    /// No login path: the supplied secret IS the bearer token. It is
    /// adopted and validated via `auth/token/lookup-self`.
    Token,
}

impl AuthMethod {
    /// The auth mount this method authenticates against.
    #[must_use]
    pub fn mount(self) -> &'static str {
        match self {
            Self::Userpass => "userpass",
            Self::Ldap => "ldap",
            Self::Token => "token",
        }
    }
}

/// What a successful login or renewal grants: a bearer token and its lease.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    /// The bearer token to present in `X-Vault-Token`.
    pub client_token: String,
    /// Lease duration in seconds from grant time.
    pub lease_duration: i64,
}

/// One secret engine as reported by the mounts listing.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineInfo {
    /// Engine type (`kv`, `generic`, `cubbyhole`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Engine options; KV version lives at `options.version`.
    #[serde(default)]
    pub options: Option<HashMap<String, serde_json::Value>>,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl EngineInfo {
    /// The KV version this mount speaks, defaulting to v1 when unmarked.
    #[must_use]
    pub fn kv_version(&self) -> KvVersion {
        let tagged_v2 = self
            .options
            .as_ref()
            .and_then(|o| o.get("version"))
            .and_then(|v| v.as_str())
            .is_some_and(|v| v == "2");
        if tagged_v2 {
            KvVersion::V2
        } else {
            KvVersion::V1
        }
    }
}

// --- Internal response envelopes ---

#[derive(Deserialize)]
pub(crate) struct AuthEnvelope {
    pub auth: AuthBlock,
}

#[derive(Deserialize)]
pub(crate) struct AuthBlock {
    pub client_token: String,
    pub lease_duration: i64,
}

#[derive(Deserialize)]
pub(crate) struct TokenLookupEnvelope {
    pub data: TokenLookupData,
}

#[derive(Deserialize)]
pub(crate) struct TokenLookupData {
    pub ttl: i64,
}

#[derive(Deserialize)]
pub(crate) struct ListEnvelope {
    pub data: ListKeys,
}

#[derive(Deserialize)]
pub(crate) struct ListKeys {
    pub keys: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct MountsEnvelope {
    pub data: MountsData,
}

#[derive(Deserialize)]
pub(crate) struct MountsData {
    #[serde(default)]
    pub secret: HashMap<String, EngineInfo>,
}

#[derive(Deserialize)]
pub(crate) struct ReadEnvelope {
    pub data: serde_json::Value,
}

#[derive(Deserialize)]
pub(crate) struct WrapEnvelope {
    pub wrap_info: WrapInfo,
}

#[derive(Deserialize)]
pub(crate) struct WrapInfo {
    pub token: String,
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
}
