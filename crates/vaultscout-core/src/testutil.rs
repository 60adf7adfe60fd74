//! In-memory [`VaultApi`] fake for explorer, coordinator, and session
//! tests. Builder-style: seed listings, reads, and scripted TTL/renewal
//! responses, then hand it to the code under test behind an `Arc`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use vaultscout_api::{ApiError, AuthMethod, EngineInfo, KvVersion, SessionGrant, VaultApi};

/// Failure kinds the fake can inject, mapped to real [`ApiError`] values.
#[derive(Debug, Clone, Copy)]
pub enum FakeFailure {
    Forbidden,
    Server,
}

impl FakeFailure {
    fn to_error(self) -> ApiError {
        match self {
            Self::Forbidden => ApiError::Forbidden {
                message: "permission denied".to_owned(),
            },
            Self::Server => ApiError::Server {
                status: 500,
                message: "internal error".to_owned(),
            },
        }
    }
}

pub struct FakeVault {
    engines: HashMap<String, EngineInfo>,
    listings: HashMap<(String, String), Vec<String>>,
    list_failures: HashSet<(String, String)>,
    reads: Mutex<HashMap<(String, String), HashMap<String, String>>>,
    wrapped: Mutex<HashMap<String, serde_json::Value>>,
    wrap_counter: AtomicUsize,

    token: Mutex<Option<String>>,
    fail_login: bool,
    login_lease: i64,
    ttl_responses: Mutex<VecDeque<Result<i64, FakeFailure>>>,
    default_ttl: i64,
    renew_responses: Mutex<VecDeque<Result<i64, FakeFailure>>>,
    renew_calls: AtomicUsize,

    track: bool,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeVault {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
            listings: HashMap::new(),
            list_failures: HashSet::new(),
            reads: Mutex::new(HashMap::new()),
            wrapped: Mutex::new(HashMap::new()),
            wrap_counter: AtomicUsize::new(0),
            token: Mutex::new(None),
            fail_login: false,
            login_lease: 3600,
            ttl_responses: Mutex::new(VecDeque::new()),
            default_ttl: 7200,
            renew_responses: Mutex::new(VecDeque::new()),
            renew_calls: AtomicUsize::new(0),
            track: false,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_engine(mut self, name: &str, kind: &str, version: &str) -> Self {
        let info: EngineInfo = serde_json::from_value(serde_json::json!({
            "type": kind,
            "options": { "version": version },
            "description": ""
        }))
        .unwrap_or_else(|_| unreachable!("static engine info is valid"));
        self.engines.insert(name.to_owned(), info);
        self
    }

    pub fn with_listing(mut self, engine: &str, path: &str, children: &[&str]) -> Self {
        self.listings.insert(
            (engine.to_owned(), path.to_owned()),
            children.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_list_failure(mut self, engine: &str, path: &str) -> Self {
        self.list_failures
            .insert((engine.to_owned(), path.to_owned()));
        self
    }

    pub fn with_read(mut self, engine: &str, path: &str, data: &[(&str, &str)]) -> Self {
        self.reads.get_mut().unwrap_or_else(|p| p.into_inner()).insert(
            (engine.to_owned(), path.to_owned()),
            data.iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        );
        self
    }

    pub fn with_failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn with_login_lease(mut self, secs: i64) -> Self {
        self.login_lease = secs;
        self
    }

    /// Script the next TTL-query responses, oldest first. When the script
    /// runs dry the fake answers with a comfortable default TTL.
    pub fn queue_ttl(self, response: Result<i64, FakeFailure>) -> Self {
        self.ttl_responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
        self
    }

    /// Script the next renewal responses (lease seconds on success).
    pub fn queue_renew(self, response: Result<i64, FakeFailure>) -> Self {
        self.renew_responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(response);
        self
    }

    pub fn track_concurrency(mut self) -> Self {
        self.track = true;
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn renew_calls(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }

    pub fn stored_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl VaultApi for FakeVault {
    async fn login(
        &self,
        _username: &str,
        password: &str,
        method: AuthMethod,
    ) -> Result<SessionGrant, ApiError> {
        if self.fail_login {
            return Err(FakeFailure::Forbidden.to_error());
        }
        // Token method adopts the supplied secret, like the real client.
        let token = if method == AuthMethod::Token {
            password.to_owned()
        } else {
            "fake-token".to_owned()
        };
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.clone());
        Ok(SessionGrant {
            client_token: token,
            lease_duration: self.login_lease,
        })
    }

    async fn set_token(&self, token: Option<&str>) {
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token.map(ToOwned::to_owned);
    }

    async fn token_ttl(&self) -> Result<i64, ApiError> {
        let scripted = self
            .ttl_responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(Ok(ttl)) => Ok(ttl),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(self.default_ttl),
        }
    }

    async fn renew_token(&self) -> Result<SessionGrant, ApiError> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .renew_responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match scripted {
            Some(Err(failure)) => Err(failure.to_error()),
            Some(Ok(lease)) => {
                let token = "renewed-token".to_owned();
                *self
                    .token
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(token.clone());
                Ok(SessionGrant {
                    client_token: token,
                    lease_duration: lease,
                })
            }
            None => Ok(SessionGrant {
                client_token: "renewed-token".to_owned(),
                lease_duration: self.login_lease,
            }),
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }

    async fn list_engines(&self) -> Result<HashMap<String, EngineInfo>, ApiError> {
        Ok(self.engines.clone())
    }

    async fn list(
        &self,
        engine: &str,
        _version: KvVersion,
        path: &[String],
    ) -> Result<Vec<String>, ApiError> {
        if self.track {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Let sibling listings overlap so the peak is observable.
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        let key = (engine.to_owned(), path.join("/"));
        let result = if self.list_failures.contains(&key) {
            Err(FakeFailure::Server.to_error())
        } else {
            self.listings.get(&key).cloned().ok_or_else(|| ApiError::NotFound {
                message: format!("no listing at {}/{}", key.0, key.1),
            })
        };

        if self.track {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }

    async fn read(
        &self,
        engine: &str,
        _version: KvVersion,
        path: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        let key = (engine.to_owned(), path.join("/"));
        self.reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                message: format!("no secret at {}/{}", key.0, key.1),
            })
    }

    async fn write(
        &self,
        engine: &str,
        _version: KvVersion,
        path: &[String],
        data: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        self.reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert((engine.to_owned(), path.join("/")), data.clone());
        Ok(())
    }

    async fn delete(
        &self,
        engine: &str,
        _version: KvVersion,
        path: &[String],
    ) -> Result<(), ApiError> {
        self.reads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&(engine.to_owned(), path.join("/")));
        Ok(())
    }

    async fn wrap(&self, data: &serde_json::Value, _ttl_secs: u64) -> Result<String, ApiError> {
        let token = format!("wrap-{}", self.wrap_counter.fetch_add(1, Ordering::SeqCst));
        self.wrapped
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(token.clone(), data.clone());
        Ok(token)
    }

    async fn unwrap_wrapped(&self, token: &str) -> Result<serde_json::Value, ApiError> {
        // Single-use, like the real server.
        self.wrapped
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(token)
            .ok_or_else(|| ApiError::NotFound {
                message: "wrapping token unknown or already used".to_owned(),
            })
    }
}
