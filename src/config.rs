//! Client configuration with environment overrides. Defaults target a backend
//! served from the same origin as the application; `WALLET_SESSION_*` variables
//! override individual values so deployments can change endpoints without
//! rebuilding. Configuration values are public; do not store secrets here.

use std::{env, time::Duration};
use url::Url;

/// Default request timeout applied to every backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default origin for both the application and its backend.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:7860";

pub const ENV_API_BASE_URL: &str = "WALLET_SESSION_API_BASE_URL";
pub const ENV_APP_ORIGIN: &str = "WALLET_SESSION_APP_ORIGIN";
pub const ENV_REQUEST_TIMEOUT: &str = "WALLET_SESSION_REQUEST_TIMEOUT";
pub const ENV_CONSENT_TIMEOUT: &str = "WALLET_SESSION_CONSENT_TIMEOUT";
pub const ENV_AUTO_LOGIN: &str = "WALLET_SESSION_AUTO_LOGIN";

/// Local store keys that survive a logout purge.
pub const DEFAULT_PRESERVED_KEYS: [&str; 3] = ["isDark", "githubStars", "githubStarsLastUpdated"];

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Base URL the `/api/v1/...` paths are joined onto.
    pub api_base_url: Url,
    /// Origin of the application; its host is the explicit cookie domain.
    pub app_origin: Url,
    pub request_timeout: Duration,
    /// Upper bound on wallet consent prompts. `None` waits for the user indefinitely.
    pub consent_timeout: Option<Duration>,
    /// Auto-login deployments have no server-side session to invalidate.
    pub auto_login: bool,
    pub preserved_keys: Vec<String>,
}

impl AuthConfig {
    /// Builds a config whose backend and application share `origin`.
    #[must_use]
    pub fn with_origin(origin: Url) -> Self {
        Self {
            api_base_url: origin.clone(),
            app_origin: origin,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            consent_timeout: None,
            auto_login: false,
            preserved_keys: DEFAULT_PRESERVED_KEYS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Defaults for a same-origin deployment at [`DEFAULT_ORIGIN`].
    ///
    /// # Errors
    /// Returns an error if [`DEFAULT_ORIGIN`] does not parse.
    pub fn try_default() -> Result<Self, url::ParseError> {
        Url::parse(DEFAULT_ORIGIN).map(Self::with_origin)
    }

    /// Loads defaults and applies environment overrides.
    ///
    /// # Errors
    /// Returns an error if [`DEFAULT_ORIGIN`] does not parse.
    pub fn load() -> Result<Self, url::ParseError> {
        let mut config = Self::try_default()?;
        apply_overrides(&mut config, Overrides::from_env());
        Ok(config)
    }

    /// Host used for the explicit `domain=` cookie variants.
    #[must_use]
    pub fn cookie_domain(&self) -> Option<String> {
        self.app_origin.host_str().map(ToString::to_string)
    }
}

#[derive(Default)]
struct Overrides {
    api_base_url: Option<Url>,
    app_origin: Option<Url>,
    request_timeout: Option<Duration>,
    consent_timeout: Option<Duration>,
    auto_login: Option<bool>,
}

impl Overrides {
    fn from_env() -> Self {
        Self {
            api_base_url: read_env(ENV_API_BASE_URL).and_then(|v| Url::parse(&v).ok()),
            app_origin: read_env(ENV_APP_ORIGIN).and_then(|v| Url::parse(&v).ok()),
            request_timeout: read_env(ENV_REQUEST_TIMEOUT).and_then(|v| parse_seconds(&v)),
            consent_timeout: read_env(ENV_CONSENT_TIMEOUT).and_then(|v| parse_seconds(&v)),
            auto_login: read_env(ENV_AUTO_LOGIN).map(|v| parse_flag(&v)),
        }
    }
}

fn apply_overrides(config: &mut AuthConfig, overrides: Overrides) {
    if let Some(value) = overrides.api_base_url {
        config.api_base_url = value;
    }
    if let Some(value) = overrides.app_origin {
        config.app_origin = value;
    }
    if let Some(value) = overrides.request_timeout {
        config.request_timeout = value;
    }
    if let Some(value) = overrides.consent_timeout {
        config.consent_timeout = Some(value);
    }
    if let Some(value) = overrides.auto_login {
        config.auto_login = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| normalize_value(&value))
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "auto"
    )
}
