//! Cache of the most recent login for each backend.
//!
//! Each backend keeps a single "current" login in the store, spread across
//! three keys:
//!
//! ```text
//! <pointer_key>           -> host of the current login
//! <token_prefix><host>    -> access token
//! <tenant_prefix><host>   -> tenant/account id ("" for backends without tenancy)
//! ```
//!
//! Writing a new login overwrites the pointer, so only the last login per
//! backend is ever current. Reads treat a missing pointer, or a pointer whose
//! token or tenant key is missing, as "not logged in".

use tracing::debug;

use crate::store::{Store, StoreError, StoreHandle};

/// The cached result of a successful login.
///
/// All fields are empty when no login is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginContext {
    pub host: String,
    pub tenant_id: String,
    pub access_token: String,
}

impl LoginContext {
    pub fn new(
        host: impl Into<String>,
        tenant_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            tenant_id: tenant_id.into(),
            access_token: access_token.into(),
        }
    }

    /// True when there is no current login.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }
}

/// Store keys used by one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextKeys {
    pub pointer_key: &'static str,
    pub token_prefix: &'static str,
    pub tenant_prefix: &'static str,
}

impl ContextKeys {
    /// Key holding the access token for `host`. An empty host yields the bare prefix.
    pub fn token_key(&self, host: &str) -> String {
        format!("{}{}", self.token_prefix, host)
    }

    /// Key holding the tenant id for `host`. An empty host yields the bare prefix.
    pub fn tenant_key(&self, host: &str) -> String {
        format!("{}{}", self.tenant_prefix, host)
    }
}

/// Reads and writes the current [`LoginContext`] of one backend.
#[derive(Debug, Clone)]
pub struct ContextCache {
    store: Store,
    keys: ContextKeys,
}

impl ContextCache {
    pub fn new(store: Store, keys: ContextKeys) -> Self {
        Self { store, keys }
    }

    /// Record a successful login, replacing whatever login was current.
    ///
    /// Fails if the store cannot be opened, for example because another
    /// handle holds it.
    pub fn set_context(
        &self,
        host: &str,
        tenant_id: &str,
        access_token: &str,
    ) -> Result<(), StoreError> {
        let mut db = self.store.open()?;

        db.set(&self.keys.token_key(host), access_token)?;
        db.set(&self.keys.tenant_key(host), tenant_id)?;
        db.set(self.keys.pointer_key, host)?;

        db.close();
        debug!(pointer = self.keys.pointer_key, host, "saved login context");
        Ok(())
    }

    /// Return the current login, or an empty context.
    ///
    /// Any failure to read the store is logged and reported as "not logged in".
    pub fn get_context(&self) -> LoginContext {
        match self.try_get_context() {
            Ok(Some(context)) => context,
            Ok(None) => LoginContext::default(),
            Err(e) => {
                debug!(pointer = self.keys.pointer_key, error = %e, "unable to read login context");
                LoginContext::default()
            }
        }
    }

    /// Return the current login.
    ///
    /// `Ok(None)` means no complete login is cached. `Err` means the store
    /// itself could not be opened or read. Nothing is created on disk when
    /// the store has never been written.
    pub fn try_get_context(&self) -> Result<Option<LoginContext>, StoreError> {
        if !self.store.exists() {
            return Ok(None);
        }

        let db = self.store.open()?;
        let context = self.read_context(&db);
        db.close();
        context
    }

    fn read_context(&self, db: &StoreHandle) -> Result<Option<LoginContext>, StoreError> {
        let Some(host) = optional(db.get::<String>(self.keys.pointer_key))? else {
            return Ok(None);
        };

        let Some(access_token) = optional(db.get::<String>(&self.keys.token_key(&host)))? else {
            debug!(host = %host, "login context has no access token");
            return Ok(None);
        };

        let Some(tenant_id) = optional(db.get::<String>(&self.keys.tenant_key(&host)))? else {
            debug!(host = %host, "login context has no tenant id");
            return Ok(None);
        };

        Ok(Some(LoginContext {
            host,
            tenant_id,
            access_token,
        }))
    }
}

fn optional<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_key_absent() => Ok(None),
        Err(e) => Err(e),
    }
}
