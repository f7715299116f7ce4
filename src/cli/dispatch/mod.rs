//! Maps parsed CLI arguments to an [`Action`].

use crate::cli::{
    actions::{bootstrap, Action},
    commands::{client, ARG_LOCATION, CMD_BOOTSTRAP, CMD_CHALLENGE, CMD_GOOGLE, CMD_LOGOUT, CMD_STATUS},
    globals::GlobalArgs,
};
use anyhow::{anyhow, Result};
use url::Url;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or the subcommand is unknown.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let options = client::Options::parse(matches)?;

    let mut globals = GlobalArgs::new(options.state_dir)?;
    globals.set_origin(options.api_url, options.app_origin);
    globals.set_timeouts(options.request_timeout, options.consent_timeout);
    globals.config.auto_login = options.auto_login;

    match matches.subcommand() {
        Some((CMD_BOOTSTRAP, sub)) => Ok(Action::Bootstrap(bootstrap::Args {
            globals,
            location: sub.get_one::<Url>(ARG_LOCATION).cloned(),
        })),
        Some((CMD_GOOGLE, _)) => Ok(Action::Google(globals)),
        Some((CMD_CHALLENGE, _)) => Ok(Action::Challenge(globals)),
        Some((CMD_LOGOUT, _)) => Ok(Action::Logout(globals)),
        Some((CMD_STATUS, _)) => Ok(Action::Status(globals)),
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use std::time::Duration;

    fn env_cleared<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("WALLET_SESSION_API_BASE_URL", None::<&str>),
                ("WALLET_SESSION_APP_ORIGIN", None),
                ("WALLET_SESSION_REQUEST_TIMEOUT", None),
                ("WALLET_SESSION_CONSENT_TIMEOUT", None),
                ("WALLET_SESSION_AUTO_LOGIN", None),
            ],
            f,
        );
    }

    #[test]
    fn bootstrap_carries_location_and_config() {
        env_cleared(|| {
            let matches = commands::new().get_matches_from(vec![
                "wallet-session",
                "--api-url",
                "https://api.example.dev",
                "--app-origin",
                "https://app.example.dev",
                "--consent-timeout",
                "30",
                "bootstrap",
                "--location",
                "https://app.example.dev/?access_token=T1",
            ]);

            let args = match handler(&matches) {
                Ok(Action::Bootstrap(args)) => args,
                other => panic!("expected bootstrap action, got {other:?}"),
            };
            assert_eq!(
                args.location.map(String::from),
                Some("https://app.example.dev/?access_token=T1".to_string())
            );
            assert_eq!(args.globals.config.api_base_url.as_str(), "https://api.example.dev/");
            assert_eq!(
                args.globals.config.cookie_domain(),
                Some("app.example.dev".to_string())
            );
            assert_eq!(
                args.globals.config.consent_timeout,
                Some(Duration::from_secs(30))
            );
        });
    }

    #[test]
    fn logout_honours_auto_login_env() {
        env_cleared(|| {
            temp_env::with_var("WALLET_SESSION_AUTO_LOGIN", Some("true"), || {
                let matches = commands::new().get_matches_from(vec!["wallet-session", "logout"]);
                let globals = match handler(&matches) {
                    Ok(Action::Logout(globals)) => globals,
                    other => panic!("expected logout action, got {other:?}"),
                };
                assert!(globals.config.auto_login);
                assert_eq!(globals.config.request_timeout, Duration::from_secs(10));
            });
        });
    }
}
