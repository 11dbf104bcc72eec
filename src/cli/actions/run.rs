use crate::cli::actions::{canonicalize, contract, login, password, strategies, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Strategies(globals) => strategies::execute(globals).await,
        Action::Login(args) => login::execute(args).await,
        Action::CheckPassword(args) => password::execute(&args),
        Action::Canonicalize(args) => canonicalize::execute(&args),
        Action::Contract(args) => contract::execute(args).await,
    }
}
