//! Session lifecycle and authorization

mod policy;
mod session;
mod storage;
mod types;

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::fetch::Gateway;

pub use policy::*;
pub use session::{AccessToken, Claims, Session};
pub(crate) use session::SessionState;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub(crate) use storage::from_kind as storage_from_kind;
pub use types::*;

/// Single source of truth for "is the caller authenticated, and as whom".
#[derive(Clone)]
pub struct SessionStore {
    gateway: Gateway,
    state: Arc<SessionState>,
}

impl SessionStore {
    pub(crate) fn new(gateway: Gateway, state: Arc<SessionState>) -> Self {
        Self { gateway, state }
    }

    /// Restore a persisted session, if any.
    ///
    /// The token is decoded locally first; an expired or undecodable token is
    /// dropped without a network call. Otherwise the identity is fetched, and any
    /// failure to do so leaves the caller unauthenticated with storage cleared.
    pub async fn start(&self) -> AuthStatus {
        self.start_at(Utc::now().timestamp()).await
    }

    /// [`start`](Self::start) with an explicit clock (Unix seconds).
    pub async fn start_at(&self, now: i64) -> AuthStatus {
        let raw = match self.state.storage().load() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted token");
                return self.unauthenticated();
            }
            Err(e) => {
                warn!("Could not read persisted token: {}", e);
                return self.unauthenticated();
            }
        };

        let token = match AccessToken::parse(&raw) {
            Ok(token) => token,
            Err(e) => {
                warn!("Discarding undecodable persisted token: {}", e);
                return self.unauthenticated();
            }
        };
        if token.is_expired_at(now) {
            info!("Persisted token for {} has expired", token.subject());
            return self.unauthenticated();
        }

        match self.fetch_identity(token.as_str()).await {
            Ok(identity) => {
                self.state.establish(Session { token, identity });
                self.state.status()
            }
            Err(e) => {
                warn!("Could not restore session: {}", e);
                self.unauthenticated()
            }
        }
    }

    fn unauthenticated(&self) -> AuthStatus {
        self.state.clear();
        AuthStatus::Unauthenticated
    }

    /// Exchange credentials for a session and return its identity.
    ///
    /// A rejected login leaves any prior session untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response: LoginResponse = match self
            .gateway
            .post("/auth/login")
            .anonymous()
            .json(&credentials)?
            .execute()
            .await
        {
            Ok(response) => response,
            Err(Error::Unauthorized | Error::Forbidden(_) | Error::Rejected { .. }) => {
                info!("Login rejected for {}", username);
                return Err(Error::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        let token = AccessToken::parse(&response.token)?;
        let identity = match self.fetch_identity(token.as_str()).await {
            Ok(identity) => identity,
            Err(Error::Unauthorized) => return Err(Error::Unauthorized),
            Err(e) => {
                warn!("Profile fetch after login failed ({}), using login response", e);
                response
                    .fallback_identity()
                    .ok_or_else(|| Error::validation("login response lacks user id or role"))?
            }
        };

        self.state.establish(Session {
            token,
            identity: identity.clone(),
        });
        Ok(identity)
    }

    /// Clear the token and identity. Needs no network call and is idempotent.
    pub fn logout(&self) {
        if !self.state.clear() {
            debug!("Logout with no live session");
        }
    }

    /// Create an account. Does not start a session; log in afterwards.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        for (field, value) in [
            ("username", &registration.username),
            ("email", &registration.email),
            ("password", &registration.password),
        ] {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} is required", field)));
            }
        }

        self.gateway
            .post("/auth/register")
            .anonymous()
            .json(registration)?
            .execute_empty()
            .await
    }

    /// Update the caller's profile and refresh the stored identity.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        let token = self.state.token().ok_or(Error::Unauthenticated)?;
        let identity: Identity = self.gateway.put("/user/me").json(update)?.execute().await?;
        if !self.state.replace_identity(&token, identity.clone()) {
            debug!("Session changed while the profile update was in flight");
        }
        Ok(identity)
    }

    async fn fetch_identity(&self, token: &str) -> Result<Identity> {
        self.gateway
            .get("/user/me")
            .bearer_auth(token)
            .execute()
            .await
    }

    /// Current status snapshot
    pub fn status(&self) -> AuthStatus {
        self.state.status()
    }

    /// The live identity, if any
    pub fn identity(&self) -> Option<Identity> {
        self.state.identity()
    }

    /// The live session, if any
    pub fn session(&self) -> Option<Session> {
        self.state.snapshot()
    }

    /// The live identity, or `Unauthenticated`
    pub fn require_identity(&self) -> Result<Identity> {
        self.state.identity().ok_or(Error::Unauthenticated)
    }

    /// Whether the live identity holds `capability`
    pub fn can(&self, capability: Capability) -> bool {
        self.identity()
            .map_or(false, |identity| identity.role.can(capability))
    }

    /// Notifications of every status change
    pub fn on_change(&self) -> broadcast::Receiver<AuthStatus> {
        self.state.subscribe()
    }
}
