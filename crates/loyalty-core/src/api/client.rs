//! Generic JSON request/response handling for the backend.

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use crate::config::Config;
use crate::session::SessionStore;

/// Standard User-Agent header for backend requests.
pub const USER_AGENT: &str = concat!("loyalty/", env!("CARGO_PKG_VERSION"));

/// A single backend call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// HTTP client bound to a backend base URL and an optional bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Builds a client from config, applying the request timeout if set.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self::with_http(http, &config.api_url))
    }

    fn with_http(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.set_bearer(token);
        self
    }

    /// Authenticates requests as the store's current user, if any.
    #[must_use]
    pub fn with_session(self, store: &SessionStore) -> Self {
        self.with_bearer(store.access_token())
    }

    /// Sets or clears the bearer token. Empty tokens are treated as absent.
    pub fn set_bearer(&mut self, token: Option<&str>) {
        self.bearer = token.filter(|t| !t.is_empty()).map(str::to_string);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_bearer(&self) -> bool {
        self.bearer.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends a request and returns the parsed JSON body.
    ///
    /// An empty 2xx body yields `Value::Null`.
    ///
    /// # Errors
    /// `ApiError::Http` for non-2xx responses, `ApiError::Network` when the
    /// server cannot be reached, `ApiError::Decode` for an unparsable 2xx body.
    pub async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.url(&request.path);
        tracing::debug!(method = %request.method, %url, "backend request");

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            tracing::debug!(error = %err, %url, "backend unreachable");
            ApiError::from(err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), %url, "backend returned error status");
            return Err(ApiError::from_response(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// POSTs a serializable body.
    ///
    /// # Errors
    /// Same as [`Self::send`].
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let body =
            serde_json::to_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;
        self.send(ApiRequest::post(path).json(body)).await
    }

    /// GETs a path with query parameters.
    ///
    /// # Errors
    /// Same as [`Self::send`].
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Value> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, *v));
        self.send(request).await
    }
}
