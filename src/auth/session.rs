//! Session state and token decoding

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::storage::TokenStorage;
use super::types::{AuthStatus, Identity, Role};
use crate::error::Result;

/// Claims read from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The subject (username)
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<serde_json::Value>,
}

/// An opaque signed credential, decoded locally for its claims.
///
/// The signature is not verified here; that is the backend's job. Decoding only
/// tells the client whether it is worth presenting the token at all.
#[derive(Debug, Clone)]
pub struct AccessToken {
    raw: String,
    claims: Claims,
}

impl AccessToken {
    /// Decode a token without verifying its signature.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<Claims>(raw, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(Self {
            raw: raw.to_string(),
            claims: data.claims,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    /// The role claim, when the token carries one as a string
    pub fn role(&self) -> Option<Role> {
        self.claims
            .role
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(Role::parse)
    }

    /// Expired iff the expiry is at or before `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.claims.exp <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }
}

/// A live session: token and identity always travel together.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: AccessToken,
    pub identity: Identity,
}

/// Shared holder of the current session.
///
/// Mutation happens through `establish`, `clear` and `invalidate`, all of which
/// swap the whole session under one lock so readers never see a token without
/// its identity.
pub(crate) struct SessionState {
    current: RwLock<Option<Session>>,
    ready: AtomicBool,
    storage: Arc<dyn TokenStorage>,
    changes: broadcast::Sender<AuthStatus>,
}

impl SessionState {
    pub(crate) fn new(storage: Arc<dyn TokenStorage>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(None),
            ready: AtomicBool::new(false),
            storage,
            changes,
        }
    }

    pub(crate) fn storage(&self) -> &dyn TokenStorage {
        self.storage.as_ref()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<AuthStatus> {
        self.changes.subscribe()
    }

    /// The live session. A session whose token has expired is ended here, so
    /// callers never see an identity without a usable token.
    pub(crate) fn snapshot(&self) -> Option<Session> {
        let session = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        if session.token.is_expired() {
            self.expire(session.token.as_str());
            return None;
        }
        Some(session)
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.snapshot().map(|s| s.token.as_str().to_string())
    }

    pub(crate) fn identity(&self) -> Option<Identity> {
        self.snapshot().map(|s| s.identity)
    }

    pub(crate) fn status(&self) -> AuthStatus {
        match self.identity() {
            Some(identity) => AuthStatus::Authenticated(identity),
            None if self.ready.load(Ordering::SeqCst) => AuthStatus::Unauthenticated,
            None => AuthStatus::Initializing,
        }
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Persist the token and make the session live.
    pub(crate) fn establish(&self, session: Session) {
        if let Err(e) = self.storage.save(session.token.as_str()) {
            warn!("Could not persist session token: {}", e);
        }
        let identity = session.identity.clone();
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *current = Some(session);
        }
        self.mark_ready();
        info!("Session started for user {} ({:?})", identity.id, identity.role);
        self.publish(AuthStatus::Authenticated(identity));
    }

    /// Swap in a fresh identity while keeping the token.
    pub(crate) fn replace_identity(&self, token: &str, identity: Identity) -> bool {
        let replaced = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            match current.as_mut() {
                Some(session) if session.token.as_str() == token => {
                    session.identity = identity.clone();
                    true
                }
                _ => false,
            }
        };
        if replaced {
            self.publish(AuthStatus::Authenticated(identity));
        }
        replaced
    }

    /// Drop the session and the persisted token. Returns whether a session was live.
    pub(crate) fn clear(&self) -> bool {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(session) => {
                self.ended(&session);
                true
            }
            None => {
                self.forget_persisted();
                false
            }
        }
    }

    fn expire(&self, token: &str) {
        let expired = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            match current.as_ref() {
                Some(session) if session.token.as_str() == token => current.take(),
                _ => None,
            }
        };
        if let Some(session) = expired {
            info!("Session token for user {} expired", session.identity.id);
            self.ended(&session);
        }
    }

    fn ended(&self, session: &Session) {
        self.forget_persisted();
        info!("Session ended for user {}", session.identity.id);
        self.publish(AuthStatus::Unauthenticated);
    }

    fn forget_persisted(&self) {
        if let Err(e) = self.storage.clear() {
            warn!("Could not clear persisted token: {}", e);
        }
        self.mark_ready();
    }

    /// Clear the session if `rejected_token` is still the one in use.
    pub(crate) fn invalidate(&self, rejected_token: &str) -> bool {
        let matches = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |s| s.token.as_str() == rejected_token);
        if matches {
            warn!("Backend rejected the session token, signing out");
            self.clear()
        } else {
            debug!("Ignoring rejection of a token that is no longer current");
            false
        }
    }

    fn publish(&self, status: AuthStatus) {
        if self.changes.send(status).is_err() {
            trace!("No session listeners");
        }
    }
}
