use crate::cli::actions::{bootstrap, challenge, google, logout, status, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Bootstrap(args) => bootstrap::execute(args).await,
        Action::Google(globals) => google::execute(globals).await,
        Action::Challenge(globals) => challenge::execute(globals).await,
        Action::Logout(globals) => logout::execute(globals).await,
        Action::Status(globals) => status::execute(globals).await,
    }
}
