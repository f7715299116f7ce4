use crate::{
    cli::globals::GlobalArgs,
    host::CountingQueryCache,
    session::{BootstrapOutcome, SessionBootstrap, SessionStore},
};
use anyhow::{bail, Result};
use std::sync::Arc;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub location: Option<Url>,
}

/// Runs the one-time bootstrap against the state directory.
#[must_use]
pub fn run(args: &Args) -> BootstrapOutcome {
    let session = Arc::new(SessionStore::new(Arc::new(CountingQueryCache::new())));
    let bootstrap = SessionBootstrap::new(
        session,
        args.globals.cookie_jar(),
        args.globals.local_storage(),
    );
    bootstrap.run(args.location.as_ref())
}

/// Execute the bootstrap action.
/// # Errors
/// Returns an error if persisted state could not be read.
pub async fn execute(args: Args) -> Result<()> {
    let outcome = run(&args);
    println!("outcome: {}", outcome.label());
    match outcome {
        BootstrapOutcome::PromotedFromQuery { clean_url } => println!("clean_url: {clean_url}"),
        BootstrapOutcome::Failed(err) => bail!("session bootstrap failed: {err}"),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
        CookieStore, KeyValueStore,
    };

    #[test]
    fn promotes_tokens_into_cookie_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let globals = GlobalArgs::new(dir.path().to_path_buf())?;
        let local = globals.local_storage();
        local.set(ACCESS_TOKEN_COOKIE, "T1")?;
        local.set(REFRESH_TOKEN_COOKIE, "R1")?;

        let args = Args {
            globals,
            location: None,
        };
        assert_eq!(run(&args), BootstrapOutcome::PromotedFromLocalStore);

        let jar = args.globals.cookie_jar();
        assert_eq!(jar.get(ACCESS_TOKEN_COOKIE)?, Some("T1".to_string()));
        assert_eq!(jar.get(REFRESH_TOKEN_COOKIE)?, Some("R1".to_string()));
        assert_eq!(local.get(ACCESS_TOKEN_COOKIE)?, None);

        // a fresh process restores from the cookie instead
        assert_eq!(run(&args), BootstrapOutcome::RestoredFromCookie);
        Ok(())
    }

    #[test]
    fn empty_state_dir_is_anonymous() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let args = Args {
            globals: GlobalArgs::new(dir.path().join("missing"))?,
            location: None,
        };
        assert_eq!(run(&args), BootstrapOutcome::Anonymous);
        Ok(())
    }
}
