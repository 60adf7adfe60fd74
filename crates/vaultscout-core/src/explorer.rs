//! Concurrency-bounded traversal of one engine's path tree.
//!
//! The tree's shape is unknown until listed, so this is not a fixed-item
//! pool: a frontier of unexplored folder paths is drained by at most
//! [`FOLDER_CONCURRENCY`] in-flight listing calls, and every completed
//! listing may push newly discovered folders back onto the frontier. A
//! freed slot immediately picks up backlog or fresh work; the traversal
//! finishes only when the frontier is empty AND nothing is in flight —
//! checking the frontier alone would end the walk while listings that may
//! still discover folders are in the air.
//!
//! Listing failures below the root are recorded per path and never stop
//! the exploration of sibling or already-queued folders. There is no
//! cancellation: a traversal runs to completion once started.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};
use vaultscout_api::{ApiError, VaultApi};

use crate::types::{SearchFailure, SearchQuery, Secret, SecretEngine};

/// Maximum simultaneous listing calls within one engine.
pub const FOLDER_CONCURRENCY: usize = 6;

/// Internal bookkeeping entries the UI writes alongside secrets; never
/// surfaced as search results nor descended into.
pub const IGNORED_KEYS: &[&str] = &["_meta", "_settings"];

/// What one engine's exploration produced.
#[derive(Debug, Default)]
pub struct EngineReport {
    /// Leaves whose name matched the query.
    pub secrets: Vec<Secret>,
    /// Per-path listing failures (always `SearchFailure::PathFailure`).
    pub errors: Vec<SearchFailure>,
}

/// Walk the engine's tree and collect every leaf matching the query.
///
/// Personal engines are rooted at the caller's identity segment; shared
/// engines at the mount root. A missing root (404) is an empty engine,
/// not a failure.
///
/// # Errors
///
/// Returns the underlying [`ApiError`] only when the root listing itself
/// fails — nothing was explorable, so the whole engine is reported as
/// failed by the coordinator. Deeper failures come back inside the report.
pub async fn explore(
    api: Arc<dyn VaultApi>,
    engine: &SecretEngine,
    identity: &str,
    query: &SearchQuery,
) -> Result<EngineReport, ApiError> {
    let root: Vec<String> = if engine.is_personal {
        vec![identity.to_owned()]
    } else {
        Vec::new()
    };

    let mut report = EngineReport::default();
    let mut frontier: VecDeque<Vec<String>> = VecDeque::from([root.clone()]);
    let mut in_flight: JoinSet<(Vec<String>, Result<Vec<String>, ApiError>)> = JoinSet::new();

    loop {
        // Fill every free slot before waiting. This is what keeps workers
        // warm: a completed listing re-enters here and its freed slot
        // picks up whatever the frontier holds.
        while in_flight.len() < FOLDER_CONCURRENCY {
            let Some(path) = frontier.pop_front() else { break };
            let api = Arc::clone(&api);
            let engine_name = engine.name.clone();
            let version = engine.version;
            in_flight.spawn(async move {
                let listing = api.list(&engine_name, version, &path).await;
                (path, listing)
            });
        }

        let Some(joined) = in_flight.join_next().await else {
            // No in-flight work, and the fill loop above found the
            // frontier empty: the traversal is complete.
            break;
        };

        let (path, listing) = match joined {
            Ok(done) => done,
            Err(join_err) => {
                warn!(engine = %engine.name, error = %join_err, "listing task failed");
                report.errors.push(SearchFailure::PathFailure {
                    path: engine.name.clone(),
                    reason: format!("listing task failed: {join_err}"),
                });
                continue;
            }
        };

        match listing {
            Ok(children) => {
                debug!(
                    engine = %engine.name,
                    path = %path.join("/"),
                    children = children.len(),
                    "folder listed"
                );
                for child in children {
                    ingest(engine, query, &path, &child, &mut frontier, &mut report);
                }
            }
            Err(ApiError::NotFound { .. }) if path == root => {
                // An engine nobody has written to yet.
                return Ok(report);
            }
            Err(e) if path == root => return Err(e),
            Err(e) => {
                let joined_path = path.join("/");
                warn!(engine = %engine.name, path = %joined_path, error = %e, "folder listing failed");
                report.errors.push(SearchFailure::PathFailure {
                    path: joined_path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Fold one listing entry into the frontier or the result set.
fn ingest(
    engine: &SecretEngine,
    query: &SearchQuery,
    parent: &[String],
    child: &str,
    frontier: &mut VecDeque<Vec<String>>,
    report: &mut EngineReport,
) {
    let name = child.trim_end_matches('/');
    if IGNORED_KEYS.contains(&name) {
        return;
    }

    if child.ends_with('/') {
        let mut folder = parent.to_vec();
        folder.push(name.to_owned());
        frontier.push_back(folder);
    } else if query.matches(name) {
        report.secrets.push(Secret::discovered(engine, parent, name));
    }
}
