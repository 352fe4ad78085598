use crate::cli::{actions::report, globals::GlobalArgs};
use crate::features::auth::SignupRequest;
use crate::shell::Route;
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub request: SignupRequest,
}

/// Execute the signup action.
/// # Errors
/// Returns the screen message if any signup step fails.
pub async fn execute(args: Args) -> Result<()> {
    let mut shell = args.globals.shell(Route::Signup.path())?;
    shell.ready().await;

    let succeeded = shell.submit_signup(&args.request).await;
    debug!(route = shell.route().path(), "signup finished");
    report(&shell, succeeded)
}
