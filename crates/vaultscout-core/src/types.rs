//! Data model for secret discovery and session management.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vaultscout_api::{KvVersion, SessionGrant};

/// A secret engine (KV mount) discovered for one search session.
///
/// Immutable after discovery; owned by the coordinator for the duration of
/// one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretEngine {
    /// Mount name without trailing slash (e.g. `team-secrets`).
    pub name: String,
    /// Client-side identifier for this discovery, stable within one session.
    pub uuid: Uuid,
    /// Engine type as reported by the server (`kv`, `generic`).
    pub kind: String,
    /// Whether this mount holds per-user secrets rooted at the caller's
    /// identity segment.
    pub is_personal: bool,
    /// KV protocol version of the mount.
    pub version: KvVersion,
}

/// A discovered secret. Produced during traversal when a leaf name matches
/// the query; never mutated by the core after it is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    /// The engine the secret lives in.
    pub engine: SecretEngine,
    /// Path segments from the engine root, excluding the leaf.
    pub path: Vec<String>,
    /// Leaf name.
    pub name: String,
    /// Slash-joined path including the leaf.
    pub full_name: String,
    /// Mirrors `engine.is_personal`, kept flat for the UI layer.
    pub is_personal: bool,
    /// Key/value payload, filled post-hoc by
    /// [`crate::search::SearchCoordinator::fetch_secret_data`].
    pub data: Option<HashMap<String, String>>,
}

impl Secret {
    pub(crate) fn discovered(engine: &SecretEngine, path: &[String], name: &str) -> Self {
        let full_name = if path.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{}", path.join("/"), name)
        };
        Self {
            engine: engine.clone(),
            path: path.to_vec(),
            name: name.to_owned(),
            full_name,
            is_personal: engine.is_personal,
            data: None,
        }
    }

    /// The one documented relevance order for search results:
    /// match rank (exact domain, sub-domain, substring), then personal
    /// engines before shared ones, then `full_name`, then engine name.
    #[must_use]
    pub fn relevance_cmp(&self, other: &Self, query: &SearchQuery) -> Ordering {
        let rank = |s: &Self| query.rank(&s.name).map_or(u8::MAX, MatchRank::weight);
        rank(self)
            .cmp(&rank(other))
            .then_with(|| other.is_personal.cmp(&self.is_personal))
            .then_with(|| self.full_name.cmp(&other.full_name))
            .then_with(|| self.engine.name.cmp(&other.engine.name))
    }
}

/// One non-fatal failure captured during a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SearchFailure {
    /// A single folder listing failed; siblings were still explored.
    PathFailure { path: String, reason: String },
    /// A whole engine's exploration rejected (e.g. its root was
    /// unreachable).
    EngineFailure { engine: String, reason: String },
}

/// Terminal value of one coordinator invocation: everything found plus
/// everything that went wrong along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchReport {
    pub secrets: Vec<Secret>,
    pub errors: Vec<SearchFailure>,
}

/// A bearer-token session. Superseded (not mutated) on renewal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// The bearer token presented to the server.
    pub client_token: String,
    /// Absolute expiry, derived from the lease duration at grant time.
    pub expire_date: DateTime<Utc>,
}

impl Token {
    /// Derive a token from a login or renewal grant.
    #[must_use]
    pub fn from_grant(grant: &SessionGrant) -> Self {
        Self {
            client_token: grant.client_token.clone(),
            expire_date: Utc::now() + Duration::seconds(grant.lease_duration),
        }
    }

    /// Whether the locally computed expiry has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expire_date
    }
}

/// How well a leaf name matched the query. Lower weight sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRank {
    /// The name equals a search term.
    ExactDomain,
    /// A dotted search term is a sub-domain of the name
    /// (term `mail.example.com` matches secret `example.com`).
    SubDomain,
    /// Plain substring match.
    Substring,
}

impl MatchRank {
    pub(crate) fn weight(self) -> u8 {
        match self {
            Self::ExactDomain => 0,
            Self::SubDomain => 1,
            Self::Substring => 2,
        }
    }
}

/// The search predicate: one or more terms, substring or domain-aware.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    terms: Vec<String>,
    case_sensitive: bool,
}

impl SearchQuery {
    /// Build a query from raw terms. Empty terms are dropped.
    #[must_use]
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(Into::into)
                .filter(|t| !t.is_empty())
                .collect(),
            case_sensitive: false,
        }
    }

    /// Toggle case-sensitive matching (default: insensitive).
    #[must_use]
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Whether any term matches the given leaf name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.rank(name).is_some()
    }

    /// Best match rank across all terms, `None` when nothing matches.
    #[must_use]
    pub fn rank(&self, name: &str) -> Option<MatchRank> {
        let fold = |s: &str| {
            if self.case_sensitive {
                s.to_owned()
            } else {
                s.to_lowercase()
            }
        };
        let name = fold(name);

        let mut best: Option<MatchRank> = None;
        for term in &self.terms {
            let term = fold(term);
            let rank = if name == term {
                Some(MatchRank::ExactDomain)
            } else if term.contains('.') && term.ends_with(&format!(".{name}")) {
                Some(MatchRank::SubDomain)
            } else if name.contains(&term) {
                Some(MatchRank::Substring)
            } else {
                None
            };
            if let Some(r) = rank {
                if best.map_or(true, |b| r.weight() < b.weight()) {
                    best = Some(r);
                }
            }
        }
        best
    }

    /// Whether the query has any usable terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
