use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rest::{RequestOption, RestClient};

/// REST API version sent with every OneView request.
pub const API_VERSION: &str = "800";

/// Client for the HPE OneView REST API.
pub struct OneViewClient {
    rest: RestClient,
    host: String,
    session_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginSessionRequest<'a> {
    user_name: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_login_domain: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct LoginSession {
    #[serde(rename = "sessionID")]
    pub session_id: String,
}

/// A page of server hardware resources.
///
/// Page metadata (`type`, `uri`, `nextPageUri`, ...) is kept verbatim so the
/// page serializes back to the shape the appliance returned.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerHardwareList {
    #[serde(default)]
    pub members: Vec<Value>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ServerHardwareList {
    pub fn total(&self) -> Option<u64> {
        self.metadata.get("total").and_then(Value::as_u64)
    }

    pub fn count(&self) -> Option<u64> {
        self.metadata.get("count").and_then(Value::as_u64)
    }

    pub fn next_page_uri(&self) -> Option<&str> {
        self.metadata.get("nextPageUri").and_then(Value::as_str)
    }
}

impl OneViewClient {
    pub fn new(rest: RestClient, host: impl Into<String>) -> Self {
        Self {
            rest,
            host: host.into(),
            session_id: None,
        }
    }

    /// Use a session id from an earlier login.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn options(&self) -> Result<[RequestOption; 3]> {
        let session_id = self
            .session_id
            .as_deref()
            .context("OneView client has no session id")?;
        Ok([
            RequestOption::header("Auth", session_id),
            RequestOption::header("X-API-Version", API_VERSION),
            RequestOption::JsonMimeType,
        ])
    }

    /// Create a login session.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        domain: Option<&str>,
    ) -> Result<LoginSession> {
        let body = LoginSessionRequest {
            user_name: username,
            password: password.expose_secret(),
            auth_login_domain: domain,
        };

        self.rest
            .post_json(
                &self.url("/rest/login-sessions"),
                &body,
                &[RequestOption::header("X-API-Version", API_VERSION)],
            )
            .await?
            .error_for_status("OneView login")?
            .json()
    }

    /// List server hardware, optionally restricted by a OneView filter expression.
    pub async fn get_server_hardware_list(
        &self,
        filter: Option<&str>,
    ) -> Result<ServerHardwareList> {
        let url = self.url("/rest/server-hardware");
        let options = self.options()?;
        let response = match filter {
            Some(filter) => {
                self.rest
                    .get_with_query(&url, &[("filter", filter)], &options)
                    .await?
            }
            None => self.rest.get(&url, &options).await?,
        };

        response
            .error_for_status("OneView get server hardware")?
            .json()
    }

    /// Fetch a single server by its name.
    pub async fn get_server_hardware_by_name(&self, name: &str) -> Result<Option<Value>> {
        let filter = format!("name='{}'", name.replace('\'', "''"));
        let list = self.get_server_hardware_list(Some(&filter)).await?;
        Ok(list.members.into_iter().next())
    }
}
