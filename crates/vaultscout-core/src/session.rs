//! Timer-driven token lifecycle.
//!
//! A bearer token must be renewed before it expires, not after: each check
//! queries the remaining TTL and self-renews once it drops below the
//! threshold. Failures are handled conservatively — a failed renewal
//! clears the session and forces re-login rather than retrying in a loop,
//! and a transiently failed TTL query changes nothing until the next
//! scheduled check.
//!
//! State machine: `NoToken --login--> Valid`; `Valid --low TTL-->
//! Renewing --renew ok--> Valid`; a denied TTL query or failed renewal
//! `--> Invalid` with the stored token cleared.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use vaultscout_api::{AuthMethod, VaultApi};

use crate::error::SessionError;
use crate::types::Token;

/// Renew once the remaining lifetime drops below this many minutes.
pub const RENEW_THRESHOLD_MINUTES: i64 = 60;

/// Default spacing between scheduled checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(45 * 60);

/// Floor for the check interval; shorter configurations are clamped up.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never logged in (or logged out).
    NoToken,
    /// Holding a token believed to be alive.
    Valid,
    /// A renewal is in progress.
    Renewing,
    /// The token was rejected or a renewal failed; re-login required.
    Invalid,
}

/// Owns the session token and keeps it alive.
///
/// One writer at a time: callers await `login`/`logout`/`check`
/// sequentially. The embedding application drives [`run`](Self::run) from
/// its timer (plus a check at startup and on demand via
/// [`check`](Self::check)).
pub struct TokenLifecycle {
    api: Arc<dyn VaultApi>,
    token: Option<Token>,
    state: SessionState,
}

impl TokenLifecycle {
    #[must_use]
    pub fn new(api: Arc<dyn VaultApi>) -> Self {
        Self {
            api,
            token: None,
            state: SessionState::NoToken,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The live token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Authenticate and start a fresh session.
    ///
    /// # Errors
    ///
    /// Propagates the API failure; the session is left without a token.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        method: AuthMethod,
    ) -> Result<(), SessionError> {
        match self.api.login(username, password, method).await {
            Ok(grant) => {
                let token = Token::from_grant(&grant);
                info!(expires = %token.expire_date, "session established");
                self.token = Some(token);
                self.state = SessionState::Valid;
                Ok(())
            }
            Err(e) => {
                self.token = None;
                self.state = SessionState::NoToken;
                Err(SessionError::Api(e))
            }
        }
    }

    /// Adopt a previously persisted token (e.g. restored at browser
    /// startup) without logging in again.
    pub async fn restore(&mut self, token: Token) {
        self.api.set_token(Some(&token.client_token)).await;
        self.token = Some(token);
        self.state = SessionState::Valid;
    }

    /// Revoke the token server-side and end the session.
    ///
    /// The local session is cleared even when revocation fails — a token
    /// we cannot revoke is still a token we must stop using.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoSession`] without a token; otherwise propagates
    /// the revocation failure.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if self.token.is_none() {
            return Err(SessionError::NoSession);
        }

        let result = self.api.logout().await;
        self.token = None;
        self.state = SessionState::NoToken;
        self.api.set_token(None).await;
        info!("session ended");

        result.map_err(SessionError::Api)
    }

    /// One scheduled check: query the remaining TTL and renew when it runs
    /// low. Never fails — every outcome is a state transition.
    pub async fn check(&mut self) {
        if self.token.is_none()
            || matches!(self.state, SessionState::Invalid | SessionState::NoToken)
        {
            return;
        }

        let ttl_minutes = match self.api.token_ttl().await {
            Ok(ttl_secs) => ttl_secs / 60,
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "token rejected during TTL query, session invalidated");
                self.invalidate().await;
                return;
            }
            Err(e) => {
                // Transient: leave state and schedule untouched until the
                // next check.
                warn!(error = %e, "TTL query failed, keeping current session");
                return;
            }
        };

        if ttl_minutes >= RENEW_THRESHOLD_MINUTES {
            debug!(ttl_minutes, "token healthy");
            self.state = SessionState::Valid;
            return;
        }

        self.state = SessionState::Renewing;
        debug!(ttl_minutes, "token below renewal threshold, renewing");

        match self.api.renew_token().await {
            Ok(grant) => {
                self.token = Some(Token::from_grant(&grant));
                self.state = SessionState::Valid;
                let renewed_ttl = self.api.token_ttl().await.map(|s| s / 60).ok();
                info!(ttl_minutes = ?renewed_ttl, "token renewed");
            }
            Err(e) => {
                // No retry loop: surface as a cleared session and let the
                // next login re-authenticate.
                warn!(error = %e, "token renewal failed, session invalidated");
                self.invalidate().await;
            }
        }
    }

    /// Run scheduled checks forever. The interval is clamped to
    /// [`MIN_CHECK_INTERVAL`]; the first check fires after one full
    /// interval, not immediately.
    pub async fn run(&mut self, every: Duration) {
        let every = effective_interval(every);
        let mut timer = tokio::time::interval(every);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        timer.tick().await; // consume the immediate first tick
        loop {
            timer.tick().await;
            self.check().await;
        }
    }

    async fn invalidate(&mut self) {
        self.token = None;
        self.state = SessionState::Invalid;
        self.api.set_token(None).await;
    }
}

/// Clamp a configured check interval to the supported floor.
#[must_use]
pub fn effective_interval(requested: Duration) -> Duration {
    requested.max(MIN_CHECK_INTERVAL)
}
