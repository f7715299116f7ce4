//! Auth cookie names, attributes and builders.
//!
//! Tokens are written with `path=/`, `SameSite=Lax` and a bounded max-age so the
//! browser attaches them to backend requests. Removal has to match the
//! attributes the cookie was written with, so logout expires every name under
//! each plausible attribute combination.

use super::{CookieStore, StorageError};
use cookie::{Cookie, SameSite};
use secrecy::{ExposeSecret, SecretString};
use time::{Duration, OffsetDateTime};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token_lf";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token_lf";
/// Written by the backend; this crate only reads and expires it.
pub const API_KEY_COOKIE: &str = "apikey_tkn_lflw";
/// Set to `auto` by deployments that log users in without credentials.
pub const AUTO_LOGIN_COOKIE: &str = "auto_login_lf";

/// The cookies logout must leave absent.
pub const AUTH_COOKIES: [&str; 3] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, API_KEY_COOKIE];

pub const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 86_400;
pub const REFRESH_TOKEN_MAX_AGE_SECS: i64 = 604_800;

fn auth_cookie(name: &'static str, value: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

#[must_use]
pub fn access_token_cookie(token: &SecretString) -> Cookie<'static> {
    auth_cookie(
        ACCESS_TOKEN_COOKIE,
        token.expose_secret(),
        ACCESS_TOKEN_MAX_AGE_SECS,
    )
}

#[must_use]
pub fn refresh_token_cookie(token: &SecretString) -> Cookie<'static> {
    auth_cookie(
        REFRESH_TOKEN_COOKIE,
        token.expose_secret(),
        REFRESH_TOKEN_MAX_AGE_SECS,
    )
}

/// Writes the token pair into the cookie store.
///
/// # Errors
/// Returns an error if the cookie store rejects a write.
pub fn persist_tokens(
    store: &dyn CookieStore,
    access_token: Option<&SecretString>,
    refresh_token: Option<&SecretString>,
) -> Result<(), StorageError> {
    if let Some(token) = access_token {
        store.set(access_token_cookie(token))?;
    }
    if let Some(token) = refresh_token {
        store.set(refresh_token_cookie(token))?;
    }
    Ok(())
}

/// Expired copies of `name`: bare, with explicit domain, with `SameSite=Lax`,
/// and with both.
#[must_use]
pub fn removal_variants(name: &str, domain: Option<&str>) -> Vec<Cookie<'static>> {
    let removal = |with_domain: bool, with_same_site: bool| {
        let mut builder = Cookie::build((name.to_string(), String::new()))
            .path("/")
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH);
        if with_domain {
            if let Some(domain) = domain {
                builder = builder.domain(domain.to_string());
            }
        }
        if with_same_site {
            builder = builder.same_site(SameSite::Lax);
        }
        builder.build()
    };

    let mut variants = vec![removal(false, false)];
    if domain.is_some() {
        variants.push(removal(true, false));
    }
    variants.push(removal(false, true));
    if domain.is_some() {
        variants.push(removal(true, true));
    }
    variants
}

/// Expires every auth cookie under every attribute combination.
///
/// Keeps going after a failed write and returns the first error.
///
/// # Errors
/// Returns the first error reported by the cookie store.
pub fn expire_auth_cookies(
    store: &dyn CookieStore,
    domain: Option<&str>,
) -> Result<usize, StorageError> {
    let mut first_error = None;
    let mut written = 0;
    for name in AUTH_COOKIES {
        for removal in removal_variants(name, domain) {
            match store.set(removal) {
                Ok(()) => written += 1,
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(written),
    }
}

/// True when writing `cookie` deletes rather than stores.
pub(super) fn is_removal(cookie: &Cookie<'_>) -> bool {
    if cookie
        .max_age()
        .is_some_and(|max_age| max_age <= Duration::ZERO)
    {
        return true;
    }
    cookie
        .expires_datetime()
        .is_some_and(|expires| expires <= OffsetDateTime::now_utc())
}

/// Two cookies address the same browser slot when name, domain and path match.
pub(super) fn same_identity(left: &Cookie<'_>, right: &Cookie<'_>) -> bool {
    fn domain(cookie: &Cookie<'_>) -> Option<String> {
        cookie.domain().map(str::to_ascii_lowercase)
    }
    left.name() == right.name()
        && domain(left) == domain(right)
        && left.path().unwrap_or("/") == right.path().unwrap_or("/")
}

/// Applies a `set` to an in-memory cookie list.
pub(super) fn apply(jar: &mut Vec<Cookie<'static>>, cookie: Cookie<'static>) {
    jar.retain(|existing| !same_identity(existing, &cookie));
    if !is_removal(&cookie) {
        jar.push(cookie);
    }
}

/// Value of the first stored cookie called `name`.
pub(super) fn lookup(jar: &[Cookie<'static>], name: &str) -> Option<String> {
    jar.iter()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
