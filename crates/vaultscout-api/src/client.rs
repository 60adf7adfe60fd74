//! `reqwest` implementation of the [`VaultApi`] trait.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::VaultApi;
use crate::error::ApiError;
use crate::types::{
    ApiErrorBody, AuthEnvelope, AuthMethod, EngineInfo, KvVersion, ListEnvelope, MountsEnvelope,
    ReadEnvelope, SessionGrant, TokenLookupEnvelope, WrapEnvelope,
};
use crate::{VaultClient, VaultConfig};

impl VaultClient {
    /// Create a client for the given base URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the URL is empty and `VAULT_ADDR`
    /// is not set, or if the HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        Self::with_config(VaultConfig {
            base_url,
            ..Default::default()
        })
    }

    /// Create a client with full configuration.
    ///
    /// Falls back to the `VAULT_ADDR` environment variable when the
    /// configured base URL is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if no base URL can be resolved.
    pub fn with_config(cfg: VaultConfig) -> Result<Self, ApiError> {
        let base_url = if cfg.base_url.is_empty() {
            std::env::var("VAULT_ADDR").unwrap_or_default()
        } else {
            cfg.base_url
        };
        if base_url.is_empty() {
            return Err(ApiError::Config(
                "missing vault address — set VAULT_ADDR or pass base_url in config".to_owned(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent("vaultscout/0.2")
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
            token: RwLock::new(None),
        })
    }

    // --- Private ---

    /// Build the secret-path part of a URL, percent-encoding each segment.
    ///
    /// KV v2 mounts nest listings under `metadata/` and reads/writes under
    /// `data/`; v1 mounts address secrets directly.
    fn secret_url(engine: &str, version: KvVersion, nest: Nesting, path: &[String]) -> String {
        let mut parts = vec![urlencoding::encode(engine).into_owned()];
        if version == KvVersion::V2 {
            parts.push(
                match nest {
                    Nesting::Listing => "metadata",
                    Nesting::Data => "data",
                }
                .to_owned(),
            );
        }
        parts.extend(path.iter().map(|s| urlencoding::encode(s).into_owned()));
        parts.join("/")
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        wrap_ttl: Option<u64>,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let url = format!("{}/v1/{path}", self.base_url);
        let mut req = self.client.request(method, &url);

        if let Some(token) = self.token.read().await.as_deref() {
            req = req.header("X-Vault-Token", token);
        }
        if let Some(ttl) = wrap_ttl {
            req = req.header("X-Vault-Wrap-TTL", ttl.to_string());
        }
        if let Some(ref b) = body {
            req = req.json(b);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return Err(ApiError::Timeout),
            Err(e) => return Err(ApiError::Network(e)),
        };

        let status = resp.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            let text = resp.text().await.map_err(ApiError::Network)?;
            if text.is_empty() {
                return Ok(None);
            }
            return Ok(Some(serde_json::from_str(&text)?));
        }

        let error_text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&error_text)
            .ok()
            .map(|b| b.errors.join("; "))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Err(match status {
            StatusCode::FORBIDDEN => ApiError::Forbidden { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { message },
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Unexpected {
                status: s.as_u16(),
                message,
            },
        })
    }

    async fn typed_request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let value = self
            .request(method, path, body, None)
            .await?
            .ok_or_else(|| {
                ApiError::Unexpected {
                    status: 204,
                    message: format!("empty response body from {path}"),
                }
            })?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Which KV v2 sub-tree a path addresses.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Listing,
    Data,
}

/// Pull the secret's key/value map out of a read response's `data` block.
/// KV v2 nests the secret one level deeper (`data.data`, next to version
/// metadata) than v1; callers get one flat map either way.
fn normalize_read(version: KvVersion, data: &serde_json::Value) -> HashMap<String, String> {
    let data = match version {
        KvVersion::V1 => data,
        KvVersion::V2 => data.get("data").unwrap_or(&serde_json::Value::Null),
    };
    stringify_data(data)
}

/// Flatten a Vault `data` block to string values. Non-string JSON values
/// are kept as their compact JSON encoding rather than dropped.
fn stringify_data(data: &serde_json::Value) -> HashMap<String, String> {
    data.as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let s = match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), s)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VaultApi for VaultClient {
    async fn login(
        &self,
        username: &str,
        password: &str,
        method: AuthMethod,
    ) -> Result<SessionGrant, ApiError> {
        // The token method has no login path: `password` carries an
        // existing token, adopted and validated with a self-lookup.
        if method == AuthMethod::Token {
            *self.token.write().await = Some(password.to_owned());
            match self.token_ttl().await {
                Ok(ttl) => {
                    debug!(method = method.mount(), "vault login succeeded");
                    return Ok(SessionGrant {
                        client_token: password.to_owned(),
                        lease_duration: ttl,
                    });
                }
                Err(e) => {
                    *self.token.write().await = None;
                    return Err(e);
                }
            }
        }

        let path = format!(
            "auth/{}/login/{}",
            method.mount(),
            urlencoding::encode(username)
        );
        let body = serde_json::json!({ "password": password });
        let envelope: AuthEnvelope = self.typed_request(Method::POST, &path, Some(body)).await?;

        *self.token.write().await = Some(envelope.auth.client_token.clone());
        debug!(method = method.mount(), "vault login succeeded");

        Ok(SessionGrant {
            client_token: envelope.auth.client_token,
            lease_duration: envelope.auth.lease_duration,
        })
    }

    async fn set_token(&self, token: Option<&str>) {
        *self.token.write().await = token.map(ToOwned::to_owned);
    }

    async fn token_ttl(&self) -> Result<i64, ApiError> {
        let envelope: TokenLookupEnvelope = self
            .typed_request(Method::GET, "auth/token/lookup-self", None)
            .await?;
        Ok(envelope.data.ttl)
    }

    async fn renew_token(&self) -> Result<SessionGrant, ApiError> {
        let envelope: AuthEnvelope = self
            .typed_request(Method::POST, "auth/token/renew-self", None)
            .await?;

        *self.token.write().await = Some(envelope.auth.client_token.clone());
        debug!("vault token renewed");

        Ok(SessionGrant {
            client_token: envelope.auth.client_token,
            lease_duration: envelope.auth.lease_duration,
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.request(Method::POST, "auth/token/revoke-self", None, None)
            .await?;
        *self.token.write().await = None;
        debug!("vault token revoked");
        Ok(())
    }

    async fn list_engines(&self) -> Result<HashMap<String, EngineInfo>, ApiError> {
        let envelope: MountsEnvelope = self
            .typed_request(Method::GET, "sys/internal/ui/mounts", None)
            .await?;
        Ok(envelope
            .data
            .secret
            .into_iter()
            .map(|(name, info)| (name.trim_end_matches('/').to_owned(), info))
            .collect())
    }

    async fn list(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
    ) -> Result<Vec<String>, ApiError> {
        // Vault's LIST verb is non-standard HTTP.
        let method = Method::from_bytes(b"LIST").map_err(|_| {
            ApiError::Config("HTTP LIST method rejected by client".to_owned())
        })?;
        let url = Self::secret_url(engine, version, Nesting::Listing, path);
        let envelope: ListEnvelope = self.typed_request(method, &url, None).await?;
        Ok(envelope.data.keys)
    }

    async fn read(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        let url = Self::secret_url(engine, version, Nesting::Data, path);
        let envelope: ReadEnvelope = self.typed_request(Method::GET, &url, None).await?;
        Ok(normalize_read(version, &envelope.data))
    }

    async fn write(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
        data: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let url = Self::secret_url(engine, version, Nesting::Data, path);
        let body = match version {
            KvVersion::V1 => serde_json::to_value(data)?,
            KvVersion::V2 => serde_json::json!({ "data": data }),
        };
        self.request(Method::POST, &url, Some(body), None).await?;
        Ok(())
    }

    async fn delete(
        &self,
        engine: &str,
        version: KvVersion,
        path: &[String],
    ) -> Result<(), ApiError> {
        // v2 deletes the metadata entry, removing every version at once.
        let url = Self::secret_url(engine, version, Nesting::Listing, path);
        self.request(Method::DELETE, &url, None, None).await?;
        Ok(())
    }

    async fn wrap(&self, data: &serde_json::Value, ttl_secs: u64) -> Result<String, ApiError> {
        let value = self
            .request(
                Method::POST,
                "sys/wrapping/wrap",
                Some(data.clone()),
                Some(ttl_secs),
            )
            .await?
            .ok_or_else(|| ApiError::Unexpected {
                status: 204,
                message: "empty response body from sys/wrapping/wrap".to_owned(),
            })?;
        let envelope: WrapEnvelope = serde_json::from_value(value)?;
        Ok(envelope.wrap_info.token)
    }

    async fn unwrap_wrapped(&self, token: &str) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::json!({ "token": token });
        let envelope: ReadEnvelope = self
            .typed_request(Method::POST, "sys/wrapping/unwrap", Some(body))
            .await?;
        Ok(envelope.data)
    }
}
