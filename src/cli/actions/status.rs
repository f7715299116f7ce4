use crate::{
    cli::globals::GlobalArgs,
    host::CountingQueryCache,
    session::{SessionBootstrap, SessionSnapshot, SessionStore},
    storage::MemoryStorage,
};
use anyhow::Result;
use std::sync::Arc;

/// Session as a returning visitor would see it: restored from cookies only.
#[must_use]
pub fn run(globals: &GlobalArgs) -> SessionSnapshot {
    let session = Arc::new(SessionStore::new(Arc::new(CountingQueryCache::new())));
    SessionBootstrap::new(
        session.clone(),
        globals.cookie_jar(),
        Arc::new(MemoryStorage::new()),
    )
    .run(None);
    session.snapshot()
}

/// Execute the status action.
/// # Errors
/// Never fails; the signature matches the other actions.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let snapshot = run(&globals);
    println!("authenticated: {}", snapshot.is_authenticated);
    println!("refresh token: {}", snapshot.has_refresh_token);
    println!("api key: {}", snapshot.has_api_key);
    if let Some(source) = snapshot.source {
        println!("source: {source}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        cookies::{access_token_cookie, refresh_token_cookie},
        CookieStore, KeyValueStore,
    };
    use secrecy::SecretString;

    #[test]
    fn reports_cookie_session_without_touching_local_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let globals = GlobalArgs::new(dir.path().to_path_buf())?;
        let jar = globals.cookie_jar();
        jar.set(access_token_cookie(&SecretString::from("T1".to_string())))?;
        jar.set(refresh_token_cookie(&SecretString::from("R1".to_string())))?;
        globals.local_storage().set("access_token_lf", "T2")?;

        let snapshot = run(&globals);
        assert!(snapshot.is_authenticated);
        assert!(snapshot.has_refresh_token);
        assert_eq!(
            globals.local_storage().get("access_token_lf")?,
            Some("T2".to_string())
        );
        Ok(())
    }

    #[test]
    fn empty_jar_is_anonymous() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let snapshot = run(&GlobalArgs::new(dir.path().to_path_buf())?);
        assert!(!snapshot.is_authenticated);
        Ok(())
    }
}
