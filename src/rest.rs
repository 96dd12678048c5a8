//! Thin helpers over `reqwest` shared by the backend clients.

use std::borrow::Cow;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::HttpConfig;

/// Per-request adjustments, applied in order.
#[derive(Debug, Clone)]
pub enum RequestOption {
    BasicAuth { username: String, password: String },
    BearerAuth(String),
    JsonMimeType,
    Header(String, String),
}

impl RequestOption {
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        RequestOption::Header(name.into(), value.into())
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            RequestOption::BasicAuth { username, password } => {
                request.basic_auth(username, Some(password))
            }
            RequestOption::BearerAuth(token) => request.bearer_auth(token),
            RequestOption::JsonMimeType => request.header(CONTENT_TYPE, "application/json"),
            RequestOption::Header(name, value) => request.header(name.as_str(), value.as_str()),
        }
    }
}

/// HTTP client shared by all backends.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
}

impl RestClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure)
            .user_agent(concat!("hpecli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, options: &[RequestOption]) -> Result<Response> {
        self.send(self.client.request(Method::GET, url), url, options)
            .await
    }

    /// GET with query parameters.
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &Q,
        options: &[RequestOption],
    ) -> Result<Response> {
        self.send(self.client.request(Method::GET, url).query(query), url, options)
            .await
    }

    /// POST a JSON body. The content type is set automatically.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: &[RequestOption],
    ) -> Result<Response> {
        self.send(self.client.request(Method::POST, url).json(body), url, options)
            .await
    }

    /// POST without a body.
    pub async fn post(&self, url: &str, options: &[RequestOption]) -> Result<Response> {
        self.send(self.client.request(Method::POST, url), url, options)
            .await
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &str,
        options: &[RequestOption],
    ) -> Result<Response> {
        let request = options.iter().fold(request, |request, option| option.apply(request));

        let response = request
            .send()
            .await
            .with_context(|| format!("HTTP request to {url} failed"))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?
            .to_vec();

        debug!(url, status = %status, bytes = body.len(), "received response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// A fully read HTTP response.
///
/// Non-success statuses are returned as-is; call
/// [`Response::error_for_status`] to turn them into errors.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The body re-indented with two spaces, or the raw body if it isn't JSON.
    pub fn pretty_json(&self) -> String {
        match serde_json::from_slice::<serde_json::Value>(self.bytes())
            .and_then(|value| serde_json::to_string_pretty(&value))
        {
            Ok(pretty) => pretty,
            Err(e) => {
                debug!(error = %e, "unable to pretty-print response body");
                self.text().into_owned()
            }
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.bytes())
            .with_context(|| format!("Unexpected response body: {}", self.text()))
    }

    /// Fail with the status and body unless the status is 2xx.
    pub fn error_for_status(self, action: &str) -> Result<Self> {
        if !self.is_success() {
            anyhow::bail!("{action} failed ({}): {}", self.status, self.text());
        }
        Ok(self)
    }
}
