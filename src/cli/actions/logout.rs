use crate::{
    api::ApiClient,
    cli::globals::GlobalArgs,
    host::{CountingQueryCache, Navigation, RecordingNavigator},
    session::{InvalidationOutcome, LogoutCoordinator, LogoutReport, SessionBootstrap, SessionStore},
};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Restores the session from the state directory and logs it out.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub async fn run(globals: &GlobalArgs) -> Result<(LogoutReport, Option<Navigation>)> {
    let session = Arc::new(SessionStore::new(Arc::new(CountingQueryCache::new())));
    let cookies = globals.cookie_jar();
    let local = globals.local_storage();

    let restored = SessionBootstrap::new(session.clone(), cookies.clone(), local.clone())
        .run(None);
    debug!(outcome = restored.label(), "session restored before logout");

    let navigator = Arc::new(RecordingNavigator::new());
    let coordinator = LogoutCoordinator::new(
        &globals.config,
        ApiClient::new(&globals.config)?,
        session,
        cookies,
        local,
        globals.tab_storage(),
        navigator.clone(),
    );

    let report = coordinator.logout().await;
    Ok((report, navigator.last()))
}

/// Execute the logout action.
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let (report, navigation) = run(&globals).await?;

    match &report.invalidation {
        InvalidationOutcome::Skipped => println!("server logout: skipped (auto-login)"),
        InvalidationOutcome::Succeeded => println!("server logout: ok"),
        InvalidationOutcome::Failed(err) => println!("server logout: failed ({err})"),
    }
    println!("cookies expired: {}", report.purge.cookies_expired);
    println!("preserved keys: {}", report.purge.preserved_keys.join(", "));
    for error in &report.purge.errors {
        eprintln!("purge error: {error}");
    }
    if let Some(Navigation::Replace(path)) = navigation {
        println!("next: {path}");
    }
    Ok(())
}
