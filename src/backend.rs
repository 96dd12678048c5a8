//! What every backend shares: its store keys, its name in messages, and the
//! "am I logged in?" check run before each authenticated command.

use crate::context::{ContextCache, ContextKeys, LoginContext};
use crate::error::LoginRequired;
use crate::store::Store;
use crate::{greenlake, ilo, oneview};

/// Static description of one backend service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backend {
    /// Name used in user-facing messages.
    pub name: &'static str,
    /// CLI subcommand, e.g. `hpecli <command> login`.
    pub command: &'static str,
    pub keys: ContextKeys,
}

impl Backend {
    pub fn cache(&self, store: Store) -> ContextCache {
        ContextCache::new(store, self.keys)
    }

    /// Fetch the current login, failing with [`LoginRequired`] if there is none.
    pub fn require_login(&self, cache: &ContextCache) -> Result<LoginContext, LoginRequired> {
        let context = cache.get_context();
        if context.is_empty() {
            return Err(LoginRequired {
                backend: self.name,
                command: self.command,
            });
        }
        Ok(context)
    }
}

/// Every backend, in display order.
pub const BACKENDS: [&Backend; 3] = [&greenlake::BACKEND, &oneview::BACKEND, &ilo::BACKEND];

/// Host of the current login for each backend; empty when not logged in.
pub fn current_hosts(store: &Store) -> Vec<(&'static Backend, String)> {
    BACKENDS
        .iter()
        .map(|backend| {
            let context = backend.cache(store.clone()).get_context();
            (*backend, context.host)
        })
        .collect()
}

/// Normalise a user supplied host into a base URL.
///
/// Adds `https://` when no scheme is given and drops trailing slashes, so the
/// same appliance always maps to the same store keys.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() || host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
