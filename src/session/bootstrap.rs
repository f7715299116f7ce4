//! One-time reconciliation of persisted tokens into the session at startup.

use super::{LoginSource, SessionStore};
use crate::{
    error::AuthError,
    storage::{
        cookies::{persist_tokens, ACCESS_TOKEN_COOKIE, API_KEY_COOKIE, REFRESH_TOKEN_COOKIE},
        CookieStore, KeyValueStore,
    },
};
use secrecy::SecretString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Query parameters that carry tokens across the OAuth redirect.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";
pub const REFRESH_TOKEN_PARAM: &str = "refresh_token";
const TOKEN_PARAMS: [&str; 3] = [ACCESS_TOKEN_PARAM, REFRESH_TOKEN_PARAM, "token_type"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BootstrapState {
    #[default]
    NotStarted,
    Running,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyAuthenticated,
    PromotedFromLocalStore,
    /// `clean_url` is the location without token parameters, for the host to
    /// swap into the address bar.
    PromotedFromQuery { clean_url: Url },
    RestoredFromCookie,
    Anonymous,
    Failed(AuthError),
    AlreadyRan,
}

impl BootstrapOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AlreadyAuthenticated => "already_authenticated",
            Self::PromotedFromLocalStore => "promoted_from_local_store",
            Self::PromotedFromQuery { .. } => "promoted_from_query",
            Self::RestoredFromCookie => "restored_from_cookie",
            Self::Anonymous => "anonymous",
            Self::Failed(_) => "failed",
            Self::AlreadyRan => "already_ran",
        }
    }
}

pub struct SessionBootstrap {
    session: Arc<SessionStore>,
    cookies: Arc<dyn CookieStore>,
    local: Arc<dyn KeyValueStore>,
    state: Mutex<BootstrapState>,
}

impl SessionBootstrap {
    pub fn new(
        session: Arc<SessionStore>,
        cookies: Arc<dyn CookieStore>,
        local: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            session,
            cookies,
            local,
            state: Mutex::new(BootstrapState::NotStarted),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BootstrapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> BootstrapState {
        *self.lock_state()
    }

    /// Runs the reconciliation once. Later calls, including calls racing a run
    /// in progress, return [`BootstrapOutcome::AlreadyRan`] without side effects.
    ///
    /// Never fails: storage and parse errors are logged and reported as
    /// [`BootstrapOutcome::Failed`], leaving the session anonymous.
    #[instrument(skip_all)]
    pub fn run(&self, location: Option<&Url>) -> BootstrapOutcome {
        {
            let mut state = self.lock_state();
            if *state != BootstrapState::NotStarted {
                debug!(state = ?*state, "bootstrap already ran");
                return BootstrapOutcome::AlreadyRan;
            }
            *state = BootstrapState::Running;
        }

        let outcome = match self.reconcile(location) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("session bootstrap failed: {err}");
                BootstrapOutcome::Failed(err)
            }
        };

        *self.lock_state() = BootstrapState::Done;
        info!(outcome = outcome.label(), "session bootstrap finished");
        outcome
    }

    fn reconcile(&self, location: Option<&Url>) -> Result<BootstrapOutcome, AuthError> {
        if self.session.is_authenticated() {
            self.clear_local_tokens()?;
            return Ok(BootstrapOutcome::AlreadyAuthenticated);
        }

        if self.promote_local_store()? {
            return Ok(BootstrapOutcome::PromotedFromLocalStore);
        }

        if let Some(location) = location {
            if let Some(clean_url) = self.promote_query(location) {
                return Ok(BootstrapOutcome::PromotedFromQuery { clean_url });
            }
        }

        self.restore_from_cookie()
    }

    /// Moves tokens left in the local store by the redirect into cookies and
    /// the session. Both keys are removed on every path, after the tokens they
    /// held have been committed.
    fn promote_local_store(&self) -> Result<bool, AuthError> {
        let access = self.local.get(ACCESS_TOKEN_COOKIE)?;
        let refresh = self.local.get(REFRESH_TOKEN_COOKIE)?;
        if access.is_none() && refresh.is_none() {
            return Ok(false);
        }

        let promoted = access
            .as_deref()
            .map(|value| parse_stored(ACCESS_TOKEN_COOKIE, value))
            .transpose()
            .and_then(|access| {
                refresh
                    .as_deref()
                    .map(|value| parse_stored(REFRESH_TOKEN_COOKIE, value))
                    .transpose()
                    .map(|refresh| self.commit_tokens(access, refresh))
            });

        let cleared = self.clear_local_tokens();
        let promoted = promoted?;
        cleared?;
        Ok(promoted)
    }

    /// Writes the cookies, then logs in. A rejected cookie write is logged and
    /// the tokens still reach the session.
    fn commit_tokens(&self, access: Option<SecretString>, refresh: Option<SecretString>) -> bool {
        if let Err(err) = persist_tokens(self.cookies.as_ref(), access.as_ref(), refresh.as_ref()) {
            warn!("could not write auth cookies: {err}");
        }
        match access {
            Some(access) => {
                self.session.login(access, LoginSource::Redirect, refresh);
                true
            }
            None => {
                debug!("refresh token promoted without an access token");
                false
            }
        }
    }

    /// Removes both token keys, attempting each even if the first fails.
    fn clear_local_tokens(&self) -> Result<(), AuthError> {
        let access = self.local.remove(ACCESS_TOKEN_COOKIE);
        let refresh = self.local.remove(REFRESH_TOKEN_COOKIE);
        access?;
        refresh?;
        Ok(())
    }

    fn promote_query(&self, location: &Url) -> Option<Url> {
        let mut access = None;
        let mut refresh = None;
        for (key, value) in location.query_pairs() {
            if key == ACCESS_TOKEN_PARAM && !value.is_empty() {
                access = Some(SecretString::from(value.into_owned()));
            } else if key == REFRESH_TOKEN_PARAM && !value.is_empty() {
                refresh = Some(SecretString::from(value.into_owned()));
            }
        }
        access.as_ref()?;

        self.commit_tokens(access, refresh);
        Some(strip_token_params(location))
    }

    fn restore_from_cookie(&self) -> Result<BootstrapOutcome, AuthError> {
        let Some(access) = self.cookies.get(ACCESS_TOKEN_COOKIE)?.filter(|v| !v.is_empty()) else {
            return Ok(BootstrapOutcome::Anonymous);
        };
        let refresh = self
            .cookies
            .get(REFRESH_TOKEN_COOKIE)?
            .filter(|v| !v.is_empty())
            .map(SecretString::from);
        let api_key = self
            .cookies
            .get(API_KEY_COOKIE)?
            .filter(|v| !v.is_empty())
            .map(SecretString::from);

        self.session
            .login(SecretString::from(access), LoginSource::Cookie, refresh);
        self.session.set_api_key(api_key);
        Ok(BootstrapOutcome::RestoredFromCookie)
    }
}

/// Accepts a raw token or a JSON-encoded string. Empty values and JSON values
/// that are not strings are rejected.
fn parse_stored(key: &str, value: &str) -> Result<SecretString, AuthError> {
    let trimmed = value.trim();
    let token = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(inner)) => inner,
        Ok(_) => return Err(AuthError::BootstrapParse(format!("{key} is not a string"))),
        Err(_) if trimmed == "undefined" => String::new(),
        Err(_) => trimmed.to_string(),
    };
    if token.trim().is_empty() {
        return Err(AuthError::BootstrapParse(format!("{key} is empty")));
    }
    Ok(SecretString::from(token))
}

fn strip_token_params(location: &Url) -> Url {
    let kept: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(key, _)| !TOKEN_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = location.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}
