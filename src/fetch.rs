//! HTTP gateway to the appointment backend
//!
//! Every request goes through [`FetchBuilder::send`], which is the one place
//! non-success answers are turned into [`Error`] values. An authentication
//! rejection of the session token clears the session right there, so no caller
//! has to handle expiry itself.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::auth::SessionState;
use crate::config::ClientOptions;
use crate::error::{Error, Result};

/// Which credential a request presents
#[derive(Debug, Clone)]
enum RequestAuth {
    /// No bearer token (login, registration)
    Anonymous,
    /// The live session's token; fails locally when there is none
    Session,
    /// An explicit token not yet bound to a session
    Token(String),
}

/// Error body produced by the backend
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
    #[serde(default)]
    validation_errors: HashMap<String, String>,
    #[serde(default)]
    details: Vec<String>,
}

impl ErrorBody {
    fn describe(raw: &str, status: StatusCode) -> String {
        let parsed: ErrorBody = serde_json::from_str(raw).unwrap_or_default();
        let mut parts: Vec<String> = Vec::new();
        if let Some(message) = parsed.message.or(parsed.error) {
            parts.push(message);
        }
        let mut fields: Vec<_> = parsed.validation_errors.into_iter().collect();
        fields.sort();
        parts.extend(fields.into_iter().map(|(field, msg)| format!("{}: {}", field, msg)));
        parts.extend(parsed.details);

        if !parts.is_empty() {
            parts.join("; ")
        } else if !raw.trim().is_empty() && !raw.trim_start().starts_with('{') {
            raw.trim().to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }
    }
}

/// Thin transport shared by the session store and the domain clients
#[derive(Clone)]
pub struct Gateway {
    base_url: String,
    client: Client,
    client_info: String,
    session: Arc<SessionState>,
}

impl Gateway {
    pub(crate) fn new(
        base_url: &str,
        options: &ClientOptions,
        session: Arc<SessionState>,
    ) -> Result<Self> {
        // validate early so a bad base URL is a construction error
        Url::parse(base_url)?;
        let client = Client::builder().timeout(options.request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            client_info: options.client_info.clone(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// Create a GET request
    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::GET, path)
    }

    /// Create a POST request
    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::PUT, path)
    }

    /// Create a DELETE request
    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, Method::DELETE, path)
    }
}

/// Helper for building and executing one request
pub struct FetchBuilder<'a> {
    gateway: &'a Gateway,
    method: Method,
    path: String,
    auth: RequestAuth,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    fn new(gateway: &'a Gateway, method: Method, path: &str) -> Self {
        Self {
            gateway,
            method,
            path: path.to_string(),
            auth: RequestAuth::Session,
            query: Vec::new(),
            body: None,
        }
    }

    /// Send without a bearer token
    pub(crate) fn anonymous(mut self) -> Self {
        self.auth = RequestAuth::Anonymous;
        self
    }

    /// Present `token` instead of the session's
    pub(crate) fn bearer_auth(mut self, token: &str) -> Self {
        self.auth = RequestAuth::Token(token.to_string());
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    async fn send(&self) -> Result<Response> {
        let token = match &self.auth {
            RequestAuth::Anonymous => None,
            RequestAuth::Session => Some(self.gateway.session.token().ok_or(Error::Unauthenticated)?),
            RequestAuth::Token(token) => Some(token.clone()),
        };

        let url = self.gateway.url(&self.path)?;
        let mut req = self
            .gateway
            .client
            .request(self.method.clone(), url)
            .header("Content-Type", "application/json")
            .header("X-Client-Info", &self.gateway.client_info);
        if !self.query.is_empty() {
            req = req.query(&self.query);
        }
        if let Some(token) = &token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        trace!("{} {}", self.method, self.path);
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        Err(self.classify(status, &raw, token.as_deref()))
    }

    fn classify(&self, status: StatusCode, raw: &str, token: Option<&str>) -> Error {
        let message = ErrorBody::describe(raw, status);
        match status {
            StatusCode::UNAUTHORIZED => {
                if let (RequestAuth::Session, Some(token)) = (&self.auth, token) {
                    self.gateway.session.invalidate(token);
                }
                Error::Unauthorized
            }
            StatusCode::FORBIDDEN => Error::Forbidden(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::CONFLICT => Error::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Rejected {
                status: status.as_u16(),
                message,
            },
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute a list request; `204 No Content` and an empty body mean an empty list
    pub async fn execute_list<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let response = self.send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute the request, discarding any response body
    pub async fn execute_empty(self) -> Result<()> {
        self.send().await?;
        Ok(())
    }
}
