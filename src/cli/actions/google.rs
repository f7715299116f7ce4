use crate::{
    api::ApiClient,
    cli::globals::GlobalArgs,
    notify::Notification,
    wallet::Provider,
};
use anyhow::{anyhow, Result};

/// Execute the google action: print the consent URL a browser would open.
/// # Errors
/// Returns an error if the backend cannot provide the URL.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let api = ApiClient::new(&globals.config)?;
    match api.google_authorization_url().await {
        Ok(url) => {
            println!("{url}");
            Ok(())
        }
        Err(err) => {
            let notification = Notification::for_error(Provider::Google, &err);
            Err(anyhow!("{}: {}", notification.title, notification.list.join(" ")))
        }
    }
}
