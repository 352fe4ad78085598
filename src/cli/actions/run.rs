use crate::cli::actions::{account, federated, login, signup, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Signup(args) => signup::execute(args).await,
        Action::Login(args) => login::execute(args).await,
        Action::Federated(args) => federated::execute(args).await,
        Action::Account(args) => account::execute(args).await,
    }
}
