use crate::backend::FederatedToken;
use crate::cli::{
    actions::{report, show_landing},
    globals::GlobalArgs,
};
use crate::shell::Route;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub token: FederatedToken,
    pub signup: bool,
}

/// Execute the federated login (or signup) action.
/// # Errors
/// Returns the screen message if the provider rejects the token or a
/// follow-up step fails.
pub async fn execute(args: Args) -> Result<()> {
    let path = if args.signup {
        Route::Signup.path()
    } else {
        Route::Login.path()
    };
    let mut shell = args.globals.shell(path)?;
    shell.ready().await;

    let succeeded = shell.submit_federated(&args.token, args.signup).await;
    report(&shell, succeeded)?;
    show_landing(&shell).await;
    Ok(())
}
