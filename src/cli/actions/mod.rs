pub mod canonicalize;
pub mod contract;
pub mod login;
pub mod password;
pub mod strategies;

// Internal "interpreter" for `Action`.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Strategies(GlobalArgs),
    Login(login::Args),
    CheckPassword(password::Args),
    Canonicalize(canonicalize::Args),
    Contract(contract::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
