//! HPE OneView server-fleet manager.

mod client;

pub use client::{LoginSession, OneViewClient, ServerHardwareList, API_VERSION};

use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::backend::{normalize_host, Backend};
use crate::context::{ContextCache, ContextKeys};
use crate::rest::RestClient;

pub const BACKEND: Backend = Backend {
    name: "OneView",
    command: "oneview",
    keys: ContextKeys {
        pointer_key: "oneview-context",
        token_prefix: "ovToken-",
        tenant_prefix: "ovTenantID-",
    },
};

/// Parameters of `hpecli oneview login`.
#[derive(Debug)]
pub struct LoginRequest {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// Directory to authenticate against; the appliance default when unset.
    pub domain: Option<String>,
}

/// Log in and cache the session id as the current OneView context.
pub async fn login(rest: &RestClient, cache: &ContextCache, request: &LoginRequest) -> Result<()> {
    let host = normalize_host(&request.host);
    info!(host = %host, username = %request.username, "logging in to OneView");

    let client = OneViewClient::new(rest.clone(), host.as_str());
    let session = match client
        .login(&request.username, &request.password, request.domain.as_deref())
        .await
    {
        Ok(session) => session,
        Err(e) => {
            warn!(host = %host, "unable to login with supplied credentials to OneView");
            return Err(e.context(format!("Unable to login to OneView at {host}")));
        }
    };

    // OneView has no tenancy; the tenant slot is stored empty.
    cache
        .set_context(&host, "", &session.session_id)
        .context("Unable to save OneView login")?;

    info!(host = %host, "successfully logged into OneView");
    Ok(())
}

/// `hpecli oneview get servers [--name NAME]`.
pub async fn get_servers(
    rest: &RestClient,
    cache: &ContextCache,
    name: Option<&str>,
) -> Result<String> {
    let context = BACKEND.require_login(cache)?;
    info!(host = %context.host, "retrieving data from OneView");

    let client = OneViewClient::new(rest.clone(), context.host.as_str())
        .with_session_id(context.access_token.as_str());

    let servers = match fetch_servers(&client, name).await {
        Ok(servers) => servers,
        Err(e) => {
            warn!(host = %context.host, "unable to retrieve server hardware from OneView");
            return Err(e.context(format!(
                "Unable to retrieve server hardware from OneView at {}",
                context.host
            )));
        }
    };

    serde_json::to_string_pretty(&servers).context("Unable to output data as JSON")
}

/// A single server when `name` is given, otherwise the whole list page.
async fn fetch_servers(client: &OneViewClient, name: Option<&str>) -> Result<serde_json::Value> {
    match name {
        Some(name) => client
            .get_server_hardware_by_name(name)
            .await?
            .with_context(|| format!("No server hardware named {name:?} found")),
        None => {
            let list = client.get_server_hardware_list(None).await?;
            debug!(
                count = list.count(),
                total = list.total(),
                next_page = ?list.next_page_uri(),
                "retrieved server hardware page"
            );
            serde_json::to_value(&list).context("Unable to output data as JSON")
        }
    }
}
