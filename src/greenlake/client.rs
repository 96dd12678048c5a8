use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::rest::{RequestOption, Response, RestClient};

/// Client for the HPE GreenLake identity and SCIM APIs.
pub struct GreenLakeClient {
    rest: RestClient,
    host: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    tenant_id: &'a str,
}

/// Response of a client-credentials token request.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl GreenLakeClient {
    pub fn new(rest: RestClient, host: impl Into<String>) -> Self {
        Self {
            rest,
            host: host.into(),
            token: None,
        }
    }

    /// Use an access token from an earlier login.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn auth(&self) -> Result<RequestOption> {
        let token = self
            .token
            .as_deref()
            .context("GreenLake client has no access token")?;
        Ok(RequestOption::BearerAuth(token.to_string()))
    }

    /// Exchange API client credentials for an access token.
    pub async fn login(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<TokenResponse> {
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id,
            client_secret: client_secret.expose_secret(),
            tenant_id,
        };

        self.rest
            .post_json(&self.url("/identity/v1/token"), &body, &[])
            .await?
            .error_for_status("GreenLake login")?
            .json()
    }

    /// `{host}/scim/v1/tenant/{tenant_id}/Users`, with the tenant id
    /// percent-encoded as a single path segment.
    pub fn users_url(&self, tenant_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.host)
            .with_context(|| format!("Invalid GreenLake host: {}", self.host))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Invalid GreenLake host: {}", self.host))?
            .pop_if_empty()
            .extend(["scim", "v1", "tenant", tenant_id, "Users"]);
        Ok(url)
    }

    /// List the users of a tenant.
    pub async fn get_users(&self, tenant_id: &str) -> Result<Response> {
        let url = self.users_url(tenant_id)?;
        self.rest
            .get(url.as_str(), &[self.auth()?, RequestOption::JsonMimeType])
            .await?
            .error_for_status("GreenLake get users")
    }
}
