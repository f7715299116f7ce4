use crate::{api::ApiClient, cli::globals::GlobalArgs};
use anyhow::{Context, Result};

/// Execute the challenge action.
/// # Errors
/// Returns an error if the challenge cannot be fetched.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let api = ApiClient::new(&globals.config)?;
    let challenge = api
        .wallet_challenge()
        .await
        .context("failed to fetch wallet challenge")?;

    println!("nonce: {}", challenge.nonce);
    println!("message:\n{}", challenge.message);
    Ok(())
}
