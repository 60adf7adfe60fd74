//! Multi-engine search coordination.
//!
//! One search: list the accessible engines, explore each KV mount through
//! the worker pool, and merge everything into a single [`SearchReport`].
//! Engine-level parallelism ([`ENGINE_CONCURRENCY`]) is independent of the
//! per-engine folder bound ([`crate::explorer::FOLDER_CONCURRENCY`]); their
//! product — 18 — is the ceiling on simultaneous in-flight listing calls
//! against the server.
//!
//! Partial failure never fails the search: a folder that would not list or
//! an engine that would not open becomes an entry in the report's error
//! list. Only the engine listing itself can reject — with no mounts there
//! is nothing to degrade to.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use vaultscout_api::VaultApi;

use crate::error::SearchError;
use crate::explorer;
use crate::pool::{self, TaskError};
use crate::types::{SearchFailure, SearchQuery, SearchReport, Secret, SecretEngine};

/// Maximum simultaneously explored engines.
pub const ENGINE_CONCURRENCY: usize = 3;

/// Engine types that expose a key/value tree worth searching.
const SEARCHABLE_KINDS: &[&str] = &["kv", "generic"];

/// Coordinates discovery across every accessible secret engine.
pub struct SearchCoordinator {
    api: Arc<dyn VaultApi>,
}

impl SearchCoordinator {
    #[must_use]
    pub fn new(api: Arc<dyn VaultApi>) -> Self {
        Self { api }
    }

    /// List accessible engines and keep the searchable KV mounts, sorted
    /// by name for a deterministic traversal order.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Api`] when the mounts listing fails.
    pub async fn discover_engines(&self) -> Result<Vec<SecretEngine>, SearchError> {
        let mounts = self.api.list_engines().await?;

        let mut engines: Vec<SecretEngine> = mounts
            .into_iter()
            .filter(|(_, info)| SEARCHABLE_KINDS.contains(&info.kind.as_str()))
            .map(|(name, info)| SecretEngine {
                is_personal: name == "personal",
                version: info.kv_version(),
                kind: info.kind,
                uuid: Uuid::new_v4(),
                name,
            })
            .collect();
        engines.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(engines = engines.len(), "discovered searchable engines");
        Ok(engines)
    }

    /// Search every accessible engine for leaves matching the query.
    ///
    /// Returns a best-effort report: discovered secrets in relevance order
    /// plus every per-path and per-engine failure encountered on the way.
    ///
    /// # Errors
    ///
    /// Rejects only when listing the accessible engines itself fails
    /// (auth or network) — see [`SearchError`].
    pub async fn search(
        &self,
        identity: &str,
        query: &SearchQuery,
    ) -> Result<SearchReport, SearchError> {
        let engines = self.discover_engines().await?;
        let engine_names: Vec<String> = engines.iter().map(|e| e.name.clone()).collect();

        let api = Arc::clone(&self.api);
        let identity = identity.to_owned();
        let worker_query = query.clone();
        let outcomes = pool::process(
            engines,
            move |engine: SecretEngine, _| {
                let api = Arc::clone(&api);
                let identity = identity.clone();
                let query = worker_query.clone();
                async move {
                    explorer::explore(api, &engine, &identity, &query)
                        .await
                        .map_err(|e| TaskError::new(e.to_string()))
                }
            },
            ENGINE_CONCURRENCY,
        )
        .await?;

        let mut report = SearchReport::default();
        for (name, outcome) in engine_names.into_iter().zip(outcomes) {
            match outcome {
                Ok(engine_report) => {
                    report.secrets.extend(engine_report.secrets);
                    report.errors.extend(engine_report.errors);
                }
                Err(task) => report.errors.push(SearchFailure::EngineFailure {
                    engine: name,
                    reason: task.reason,
                }),
            }
        }

        report
            .secrets
            .sort_by(|a, b| a.relevance_cmp(b, query));

        info!(
            secrets = report.secrets.len(),
            errors = report.errors.len(),
            "search complete"
        );
        Ok(report)
    }

    /// Fetch a discovered secret's key/value payload. Returns a new
    /// `Secret` with `data` filled; the input is never mutated.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Api`] when the read fails.
    pub async fn fetch_secret_data(&self, secret: &Secret) -> Result<Secret, SearchError> {
        let mut full_path = secret.path.clone();
        full_path.push(secret.name.clone());

        let data = self
            .api
            .read(&secret.engine.name, secret.engine.version, &full_path)
            .await?;

        let mut fetched = secret.clone();
        fetched.data = Some(data);
        Ok(fetched)
    }
}
