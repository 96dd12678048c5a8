use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::rest::{RequestOption, Response, RestClient};

/// Header carrying the Redfish session token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Client for the Redfish API of an HPE iLO.
pub struct IloClient {
    rest: RestClient,
    host: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SessionRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

/// A Redfish session created by [`IloClient::login`].
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    /// URI of the session resource, used to log out.
    pub location: Option<String>,
}

impl IloClient {
    pub fn new(rest: RestClient, host: impl Into<String>) -> Self {
        Self {
            rest,
            host: host.into(),
            token: None,
        }
    }

    /// Use a session token from an earlier login.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Create a Redfish session. The token comes back in a response header.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session> {
        let body = SessionRequest {
            user_name: username,
            password: password.expose_secret(),
        };

        let response = self
            .rest
            .post_json(
                &self.url("/redfish/v1/SessionService/Sessions/"),
                &body,
                &[],
            )
            .await?
            .error_for_status("iLO login")?;

        let token = response
            .header(AUTH_TOKEN_HEADER)
            .filter(|token| !token.is_empty())
            .with_context(|| format!("iLO login response has no {AUTH_TOKEN_HEADER} header"))?
            .to_string();

        Ok(Session {
            token,
            location: response.header("Location").map(str::to_string),
        })
    }

    /// Fetch the Redfish service root.
    pub async fn get_service_root(&self) -> Result<Response> {
        let token = self
            .token
            .as_deref()
            .context("iLO client has no session token")?;

        self.rest
            .get(
                &self.url("/redfish/v1/"),
                &[
                    RequestOption::header(AUTH_TOKEN_HEADER, token),
                    RequestOption::JsonMimeType,
                ],
            )
            .await?
            .error_for_status("iLO get service root")
    }
}
