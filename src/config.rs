//! Configuration options for the medbook client

use std::path::PathBuf;
use std::time::Duration;

/// Where the session token is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStorageKind {
    /// Kept for the lifetime of the process only
    Memory,
    /// Written to a file
    File(PathBuf),
}

/// Configuration options for the medbook client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Any call not answered within this interval fails with a network error
    pub request_timeout: Duration,

    /// Value of the `X-Client-Info` header
    pub client_info: String,

    /// Where the token is persisted
    pub token_storage: TokenStorageKind,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            client_info: format!("medbook/{}", env!("CARGO_PKG_VERSION")),
            token_storage: TokenStorageKind::Memory,
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the client info header
    pub fn with_client_info(mut self, value: &str) -> Self {
        self.client_info = value.to_string();
        self
    }

    /// Persist the token in the given file
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_storage = TokenStorageKind::File(path.into());
        self
    }

    /// Keep the token in memory only
    pub fn with_memory_token_storage(mut self) -> Self {
        self.token_storage = TokenStorageKind::Memory;
        self
    }

    /// Apply `MEDBOOK_TIMEOUT_SECS` and `MEDBOOK_TOKEN_FILE` on top of the defaults.
    ///
    /// Unparseable timeout values are ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(secs) = std::env::var("MEDBOOK_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => options.request_timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid MEDBOOK_TIMEOUT_SECS value: {}", secs),
            }
        }
        if let Ok(path) = std::env::var("MEDBOOK_TOKEN_FILE") {
            options.token_storage = TokenStorageKind::File(PathBuf::from(path));
        }
        options
    }
}
