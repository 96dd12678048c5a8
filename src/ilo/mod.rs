//! HPE iLO management controller (Redfish).

mod client;

pub use client::{IloClient, Session, AUTH_TOKEN_HEADER};

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::backend::{normalize_host, Backend};
use crate::context::{ContextCache, ContextKeys};
use crate::rest::RestClient;

pub const BACKEND: Backend = Backend {
    name: "HPE iLO",
    command: "ilo",
    keys: ContextKeys {
        pointer_key: "ilo-context",
        token_prefix: "iloToken-",
        tenant_prefix: "iloTenantID-",
    },
};

/// Parameters of `hpecli ilo login`.
#[derive(Debug)]
pub struct LoginRequest {
    pub host: String,
    pub username: String,
    pub password: SecretString,
}

/// Log in and cache the session token as the current iLO context.
pub async fn login(rest: &RestClient, cache: &ContextCache, request: &LoginRequest) -> Result<()> {
    let host = normalize_host(&request.host);
    info!(host = %host, username = %request.username, "logging in to iLO");

    let client = IloClient::new(rest.clone(), host.as_str());
    let session = match client.login(&request.username, &request.password).await {
        Ok(session) => session,
        Err(e) => {
            warn!(host = %host, "unable to login with supplied credentials to iLO");
            return Err(e.context(format!("Unable to login to iLO at {host}")));
        }
    };
    debug!(location = ?session.location, "created iLO session");

    cache
        .set_context(&host, "", &session.token)
        .context("Unable to save iLO login")?;

    info!(host = %host, "successfully logged into iLO");
    Ok(())
}

/// `hpecli ilo get serviceroot`.
pub async fn get_service_root(rest: &RestClient, cache: &ContextCache) -> Result<String> {
    let context = BACKEND.require_login(cache)?;
    debug!(host = %context.host, "attempting get ilo service root");

    let client = IloClient::new(rest.clone(), context.host.as_str()).with_token(context.access_token);
    let response = client.get_service_root().await?;
    Ok(response.pretty_json())
}
