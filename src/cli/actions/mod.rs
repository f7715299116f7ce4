pub mod bootstrap;
pub mod challenge;
pub mod google;
pub mod logout;
pub mod status;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Bootstrap(bootstrap::Args),
    Google(GlobalArgs),
    Challenge(GlobalArgs),
    Logout(GlobalArgs),
    Status(GlobalArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
