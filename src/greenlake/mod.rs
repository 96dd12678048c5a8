//! HPE GreenLake cloud portal.
//!
//! Login uses API client credentials scoped to a tenant; the tenant id is
//! cached next to the token because later calls address it in their paths.

mod client;

pub use client::{GreenLakeClient, TokenResponse};

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::backend::{normalize_host, Backend};
use crate::context::{ContextCache, ContextKeys};
use crate::rest::RestClient;

pub const BACKEND: Backend = Backend {
    name: "GreenLake",
    command: "greenlake",
    keys: ContextKeys {
        pointer_key: "greenlake-context",
        token_prefix: "glToken-",
        tenant_prefix: "glTenantID-",
    },
};

/// Parameters of `hpecli greenlake login`.
#[derive(Debug)]
pub struct LoginRequest {
    pub host: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Log in and cache the resulting token as the current GreenLake context.
pub async fn login(rest: &RestClient, cache: &ContextCache, request: &LoginRequest) -> Result<()> {
    let host = normalize_host(&request.host);
    info!(host = %host, tenant_id = %request.tenant_id, "logging in to GreenLake");

    let client = GreenLakeClient::new(rest.clone(), host.as_str());
    let token = match client
        .login(&request.tenant_id, &request.client_id, &request.client_secret)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            warn!(host = %host, "unable to login with supplied credentials to GreenLake");
            return Err(e.context(format!("Unable to login to GreenLake at {host}")));
        }
    };

    debug!(
        token_type = ?token.token_type,
        expires_in = ?token.expires_in,
        "received GreenLake access token"
    );

    cache
        .set_context(&host, &request.tenant_id, &token.access_token)
        .context("Unable to save GreenLake login")?;

    info!(host = %host, "successfully logged into GreenLake");
    Ok(())
}

/// `hpecli greenlake get users`: pretty-printed users of the cached tenant.
pub async fn get_users(rest: &RestClient, cache: &ContextCache) -> Result<String> {
    let context = BACKEND.require_login(cache)?;
    info!(host = %context.host, "retrieving GreenLake users");

    let client = GreenLakeClient::new(rest.clone(), context.host.as_str())
        .with_token(context.access_token);
    let response = client.get_users(&context.tenant_id).await?;
    Ok(response.pretty_json())
}
