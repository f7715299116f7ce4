use crate::config::{
    ENV_API_BASE_URL, ENV_APP_ORIGIN, ENV_AUTO_LOGIN, ENV_CONSENT_TIMEOUT, ENV_REQUEST_TIMEOUT,
};
use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, Command};
use std::path::PathBuf;
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_APP_ORIGIN: &str = "app-origin";
pub const ARG_STATE_DIR: &str = "state-dir";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";
pub const ARG_CONSENT_TIMEOUT: &str = "consent-timeout";
pub const ARG_AUTO_LOGIN: &str = "auto-login";

pub const DEFAULT_STATE_DIR: &str = ".wallet-session";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Backend base URL the /api/v1 paths are joined onto")
                .env(ENV_API_BASE_URL)
                .global(true)
                .value_parser(clap::value_parser!(Url)),
        )
        .arg(
            Arg::new(ARG_APP_ORIGIN)
                .long(ARG_APP_ORIGIN)
                .help("Application origin; its host scopes the domain cookie variants")
                .env(ENV_APP_ORIGIN)
                .global(true)
                .value_parser(clap::value_parser!(Url)),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long(ARG_STATE_DIR)
                .help("Directory holding the cookie jar and key/value stores")
                .env("WALLET_SESSION_STATE_DIR")
                .global(true)
                .default_value(DEFAULT_STATE_DIR)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long(ARG_REQUEST_TIMEOUT)
                .help("Backend request timeout in seconds")
                .env(ENV_REQUEST_TIMEOUT)
                .global(true)
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CONSENT_TIMEOUT)
                .long(ARG_CONSENT_TIMEOUT)
                .help("Upper bound in seconds on wallet consent prompts")
                .env(ENV_CONSENT_TIMEOUT)
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_AUTO_LOGIN)
                .long(ARG_AUTO_LOGIN)
                .help("Auto-login deployment: logout skips the server call")
                .env(ENV_AUTO_LOGIN)
                .global(true)
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: Option<Url>,
    pub app_origin: Option<Url>,
    pub state_dir: PathBuf,
    pub request_timeout: u64,
    pub consent_timeout: Option<u64>,
    pub auto_login: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            api_url: matches.get_one::<Url>(ARG_API_URL).cloned(),
            app_origin: matches.get_one::<Url>(ARG_APP_ORIGIN).cloned(),
            state_dir: matches
                .get_one::<PathBuf>(ARG_STATE_DIR)
                .cloned()
                .context("missing required argument: --state-dir")?,
            request_timeout: matches
                .get_one::<u64>(ARG_REQUEST_TIMEOUT)
                .copied()
                .context("missing required argument: --request-timeout")?,
            consent_timeout: matches.get_one::<u64>(ARG_CONSENT_TIMEOUT).copied(),
            auto_login: matches.get_flag(ARG_AUTO_LOGIN),
        })
    }
}
