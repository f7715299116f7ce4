use crate::{
    config::AuthConfig,
    storage::{FileCookieJar, FileStorage},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, sync::Arc, time::Duration};
use url::Url;

pub const COOKIE_JAR_FILE: &str = "cookies.txt";
pub const LOCAL_STORAGE_FILE: &str = "local-storage.json";
pub const TAB_STORAGE_FILE: &str = "session-storage.json";

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: AuthConfig,
    pub state_dir: PathBuf,
}

impl GlobalArgs {
    /// Starts from [`AuthConfig::load`]; command-line flags are applied on top.
    ///
    /// # Errors
    /// Returns an error if the default configuration cannot be built.
    pub fn new(state_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            config: AuthConfig::load().context("failed to load client configuration")?,
            state_dir,
        })
    }

    /// Points both the backend and the application at `origin` unless set
    /// separately afterwards.
    pub fn set_origin(&mut self, api_url: Option<Url>, app_origin: Option<Url>) {
        match (api_url, app_origin) {
            (Some(api), Some(app)) => {
                self.config.api_base_url = api;
                self.config.app_origin = app;
            }
            (Some(api), None) => {
                self.config.app_origin = api.clone();
                self.config.api_base_url = api;
            }
            (None, Some(app)) => {
                self.config.api_base_url = app.clone();
                self.config.app_origin = app;
            }
            (None, None) => {}
        }
    }

    pub fn set_timeouts(&mut self, request_secs: u64, consent_secs: Option<u64>) {
        self.config.request_timeout = Duration::from_secs(request_secs);
        self.config.consent_timeout = consent_secs.map(Duration::from_secs);
    }

    #[must_use]
    pub fn cookie_jar(&self) -> Arc<FileCookieJar> {
        Arc::new(FileCookieJar::new(self.state_dir.join(COOKIE_JAR_FILE)))
    }

    #[must_use]
    pub fn local_storage(&self) -> Arc<FileStorage> {
        Arc::new(FileStorage::new(self.state_dir.join(LOCAL_STORAGE_FILE)))
    }

    #[must_use]
    pub fn tab_storage(&self) -> Arc<FileStorage> {
        Arc::new(FileStorage::new(self.state_dir.join(TAB_STORAGE_FILE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() -> anyhow::Result<()> {
        let args = GlobalArgs::new(PathBuf::from("/tmp/ws"))?;
        assert_eq!(args.config.api_base_url, args.config.app_origin);
        assert_eq!(args.cookie_jar().path(), PathBuf::from("/tmp/ws/cookies.txt"));
        Ok(())
    }

    #[test]
    fn test_set_origin_shares_single_url() -> anyhow::Result<()> {
        let mut args = GlobalArgs::new(PathBuf::from("/tmp/ws"))?;
        args.set_origin(Some(Url::parse("https://api.example.dev")?), None);
        assert_eq!(args.config.app_origin.as_str(), "https://api.example.dev/");

        args.set_origin(
            Some(Url::parse("https://api.example.dev")?),
            Some(Url::parse("https://app.example.dev")?),
        );
        assert_eq!(args.config.cookie_domain(), Some("app.example.dev".to_string()));
        Ok(())
    }

    #[test]
    fn test_set_timeouts() -> anyhow::Result<()> {
        let mut args = GlobalArgs::new(PathBuf::from("/tmp/ws"))?;
        args.set_timeouts(3, None);
        assert_eq!(args.config.request_timeout, Duration::from_secs(3));
        assert_eq!(args.config.consent_timeout, None);
        Ok(())
    }
}
