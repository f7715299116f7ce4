//! Logout: server-side invalidation followed by a full local purge and a hard
//! navigation to the login page.

use super::SessionStore;
use crate::{
    api::ApiClient,
    config::AuthConfig,
    error::AuthError,
    host::{Navigator, ResettableStore},
    storage::{
        cookies::{expire_auth_cookies, AUTO_LOGIN_COOKIE},
        CookieStore, KeyValueStore,
    },
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const LOGIN_PATH: &str = "/login";
const AUTO_LOGIN_MARKER: &str = "auto";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Auto-login deployments have no server session to end.
    Skipped,
    Succeeded,
    Failed(AuthError),
}

/// Proof that the local purge ran. Only [`LogoutCoordinator::purge`] builds
/// one, and navigation to the login page requires it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurgeReport {
    pub cookies_expired: usize,
    pub preserved_keys: Vec<String>,
    /// Names of the business-data stores that were reset.
    pub stores_reset: Vec<String>,
    /// Storage failures hit while purging; the purge continues past them.
    pub errors: Vec<String>,
    _complete: (),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoutReport {
    pub invalidation: InvalidationOutcome,
    pub purge: PurgeReport,
}

pub struct LogoutCoordinator {
    api: ApiClient,
    session: Arc<SessionStore>,
    cookies: Arc<dyn CookieStore>,
    local: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    stores: Vec<Arc<dyn ResettableStore>>,
    auto_login: bool,
    preserved_keys: Vec<String>,
    cookie_domain: Option<String>,
}

impl LogoutCoordinator {
    pub fn new(
        config: &AuthConfig,
        api: ApiClient,
        session: Arc<SessionStore>,
        cookies: Arc<dyn CookieStore>,
        local: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            session,
            cookies,
            local,
            ephemeral,
            navigator,
            stores: Vec::new(),
            auto_login: config.auto_login,
            preserved_keys: config.preserved_keys.clone(),
            cookie_domain: config.cookie_domain(),
        }
    }

    /// Registers a business-data store to reset during the purge.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResettableStore>) -> Self {
        self.stores.push(store);
        self
    }

    /// Runs the whole logout sequence. Never fails: the local purge and the
    /// navigation happen whatever the invalidation call returns.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> LogoutReport {
        self.session.begin_logout();

        let invalidation = if self.auto_login_active() {
            info!("auto-login active, skipping server logout");
            InvalidationOutcome::Skipped
        } else {
            match self.api.logout().await {
                Ok(()) => InvalidationOutcome::Succeeded,
                Err(err) => {
                    warn!("server logout failed, purging local session anyway: {err}");
                    InvalidationOutcome::Failed(err)
                }
            }
        };

        let purge = self.purge();
        self.navigate_to_login(&purge);
        LogoutReport {
            invalidation,
            purge,
        }
    }

    fn auto_login_active(&self) -> bool {
        if self.auto_login || self.session.snapshot().auto_login == Some(true) {
            return true;
        }
        match self.cookies.get(AUTO_LOGIN_COOKIE) {
            Ok(value) => value.as_deref() == Some(AUTO_LOGIN_MARKER),
            Err(err) => {
                warn!("unable to read auto-login cookie: {err}");
                false
            }
        }
    }

    /// Removes every local trace of the session, keeping only the allow-listed
    /// preference keys in the local store.
    pub fn purge(&self) -> PurgeReport {
        let mut errors = Vec::new();

        self.session.logout();

        let mut stores_reset = Vec::with_capacity(self.stores.len());
        for store in &self.stores {
            store.reset();
            debug!(store = store.name(), "store reset");
            stores_reset.push(store.name().to_string());
        }

        let mut snapshot = Vec::new();
        for key in &self.preserved_keys {
            match self.local.get(key) {
                Ok(Some(value)) => snapshot.push((key.clone(), value)),
                Ok(None) => {}
                Err(err) => errors.push(format!("read {key}: {err}")),
            }
        }
        if let Err(err) = self.local.clear() {
            errors.push(format!("clear local store: {err}"));
        }
        let mut preserved_keys = Vec::with_capacity(snapshot.len());
        for (key, value) in snapshot {
            match self.local.set(&key, &value) {
                Ok(()) => preserved_keys.push(key),
                Err(err) => errors.push(format!("restore {key}: {err}")),
            }
        }

        if let Err(err) = self.ephemeral.clear() {
            errors.push(format!("clear tab storage: {err}"));
        }

        let cookies_expired =
            match expire_auth_cookies(self.cookies.as_ref(), self.cookie_domain.as_deref()) {
                Ok(written) => written,
                Err(err) => {
                    errors.push(format!("expire cookies: {err}"));
                    0
                }
            };

        for error in &errors {
            warn!("logout purge: {error}");
        }
        info!(
            cookies_expired,
            stores_reset = stores_reset.len(),
            "local session purged"
        );

        PurgeReport {
            cookies_expired,
            preserved_keys,
            stores_reset,
            errors,
            _complete: (),
        }
    }

    /// Full page load of the login page, discarding all in-memory state.
    pub fn navigate_to_login(&self, _purge: &PurgeReport) {
        self.navigator.replace(LOGIN_PATH);
    }
}
