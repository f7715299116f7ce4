//! Authoritative in-memory session state.
//!
//! [`SessionStore`] owns the [`Session`]; every other component reads through
//! it and mutates only through `login`/`logout`, which keeps
//! `is_authenticated` in lockstep with the presence of an access token. Each
//! mutation runs under one write lock, so concurrent writers never interleave
//! partial updates and the later write wins. The store never touches
//! persistent storage; cookie writes belong to the callers.

pub mod bootstrap;
pub mod logout;

pub use bootstrap::{BootstrapOutcome, BootstrapState, SessionBootstrap};
pub use logout::{InvalidationOutcome, LogoutCoordinator, LogoutReport, PurgeReport};

use crate::{host::QueryCache, wallet::WalletProvider};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, info};

/// How a session came to be established.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginSource {
    /// Tokens delivered across an OAuth redirect.
    Redirect,
    /// Returning user with an access token cookie.
    Cookie,
    /// Wallet challenge/response.
    Wallet(WalletProvider),
}

impl fmt::Display for LoginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect => f.write_str("redirect"),
            Self::Cookie => f.write_str("cookie"),
            Self::Wallet(wallet) => write!(f, "wallet:{}", wallet.as_str()),
        }
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

#[derive(Debug, Default)]
pub struct Session {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    api_key: Option<SecretString>,
    is_authenticated: bool,
    is_admin: bool,
    auto_login: Option<bool>,
    is_logging_out: bool,
    authentication_error_count: u32,
    source: Option<LoginSource>,
    /// Bumped by every `login` and `logout`.
    generation: u64,
}

/// Non-secret view of the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub auto_login: Option<bool>,
    pub is_logging_out: bool,
    pub authentication_error_count: u32,
    pub has_refresh_token: bool,
    pub has_api_key: bool,
    pub source: Option<LoginSource>,
    pub generation: u64,
}

pub struct SessionStore {
    session: RwLock<Session>,
    cache: Arc<dyn QueryCache>,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self {
            session: RwLock::new(Session::default()),
            cache,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Establishes a session and drops cached server data so nothing fetched
    /// before login is shown afterwards.
    pub fn login(
        &self,
        access_token: SecretString,
        source: LoginSource,
        refresh_token: Option<SecretString>,
    ) {
        {
            let mut session = self.write();
            session.access_token = Some(access_token);
            if refresh_token.is_some() {
                session.refresh_token = refresh_token;
            }
            session.is_authenticated = true;
            session.is_logging_out = false;
            session.authentication_error_count = 0;
            session.source = Some(source);
            session.generation += 1;
        }
        self.cache.clear();
        info!(%source, "session established");
    }

    /// Marks the start of the logout sequence; refreshes are suppressed until
    /// the next login.
    pub fn begin_logout(&self) {
        self.write().is_logging_out = true;
        debug!("logout started");
    }

    /// Resets to unauthenticated defaults and drops cached server data. This is
    /// the only path that clears `is_authenticated`.
    pub fn logout(&self) {
        {
            let mut session = self.write();
            let generation = session.generation + 1;
            let is_logging_out = session.is_logging_out;
            *session = Session {
                auto_login: Some(false),
                is_logging_out,
                generation,
                ..Session::default()
            };
        }
        self.cache.clear();
        info!("session cleared");
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.read();
        SessionSnapshot {
            is_authenticated: session.is_authenticated,
            is_admin: session.is_admin,
            auto_login: session.auto_login,
            is_logging_out: session.is_logging_out,
            authentication_error_count: session.authentication_error_count,
            has_refresh_token: session.refresh_token.is_some(),
            has_api_key: session.api_key.is_some(),
            source: session.source,
            generation: session.generation,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read().access_token.as_ref().map(copy_secret)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read().refresh_token.as_ref().map(copy_secret)
    }

    #[must_use]
    pub fn api_key(&self) -> Option<SecretString> {
        self.read().api_key.as_ref().map(copy_secret)
    }

    pub fn set_admin(&self, is_admin: bool) {
        self.write().is_admin = is_admin;
    }

    pub fn set_auto_login(&self, auto_login: bool) {
        self.write().auto_login = Some(auto_login);
    }

    pub fn set_api_key(&self, api_key: Option<SecretString>) {
        self.write().api_key = api_key;
    }

    /// Counts a rejected authenticated request; returns the new count.
    pub fn record_authentication_error(&self) -> u32 {
        let mut session = self.write();
        session.authentication_error_count = session.authentication_error_count.saturating_add(1);
        session.authentication_error_count
    }

    /// Whether a token refresh may run now. Always false during logout.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        let session = self.read();
        session.is_authenticated && session.refresh_token.is_some() && !session.is_logging_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CountingQueryCache;

    fn store() -> (SessionStore, Arc<CountingQueryCache>) {
        let cache = Arc::new(CountingQueryCache::new());
        (SessionStore::new(cache.clone()), cache)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn starts_unauthenticated() {
        let (store, _) = store();
        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert_eq!(snapshot.auto_login, None);
        assert!(store.access_token().is_none());
    }

    #[test]
    fn login_sets_token_flag_and_clears_cache() {
        let (store, cache) = store();
        store.login(
            secret("T1"),
            LoginSource::Wallet(WalletProvider::Phantom),
            Some(secret("R1")),
        );

        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert!(snapshot.has_refresh_token);
        assert_eq!(
            snapshot.source,
            Some(LoginSource::Wallet(WalletProvider::Phantom))
        );
        assert_eq!(
            store.access_token().map(|t| t.expose_secret().to_string()),
            Some("T1".to_string())
        );
        assert_eq!(cache.clears(), 1);
    }

    #[test]
    fn login_resets_logging_out_flag() {
        let (store, _) = store();
        store.begin_logout();
        assert!(store.snapshot().is_logging_out);

        store.login(secret("T2"), LoginSource::Cookie, None);
        assert!(!store.snapshot().is_logging_out);
    }

    #[test]
    fn logout_resets_everything() {
        let (store, cache) = store();
        store.login(secret("T1"), LoginSource::Redirect, Some(secret("R1")));
        store.set_admin(true);
        store.set_api_key(Some(secret("K1")));
        store.record_authentication_error();

        store.begin_logout();
        assert!(!store.can_refresh());
        store.logout();

        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(!snapshot.is_admin);
        assert!(!snapshot.has_refresh_token);
        assert!(!snapshot.has_api_key);
        assert_eq!(snapshot.auto_login, Some(false));
        assert_eq!(snapshot.authentication_error_count, 0);
        assert_eq!(snapshot.generation, 2);
        assert!(store.access_token().is_none());
        assert_eq!(cache.clears(), 2);
    }

    #[test]
    fn refresh_allowed_only_with_refresh_token() {
        let (store, _) = store();
        store.login(secret("T1"), LoginSource::Cookie, None);
        assert!(!store.can_refresh());

        store.login(secret("T1"), LoginSource::Cookie, Some(secret("R1")));
        assert!(store.can_refresh());
        assert_eq!(store.record_authentication_error(), 1);
        assert_eq!(store.record_authentication_error(), 2);
    }
}
