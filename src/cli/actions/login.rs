use crate::cli::{
    actions::{failure, report, show_landing},
    globals::GlobalArgs,
};
use crate::shell::{AppShell, Route, View};
use anyhow::Result;
use secrecy::SecretString;

pub struct Args {
    pub globals: GlobalArgs,
    pub identifier: String,
    pub password: SecretString,
    pub resend_verification: bool,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("globals", &self.globals)
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .field("resend_verification", &self.resend_verification)
            .finish()
    }
}

/// Start a shell on the login view and submit the credentials. Used by the
/// account subcommands as well.
///
/// # Errors
/// Returns the login screen message when the login fails, after sending a
/// new verification email if `resend_verification` is set.
pub(crate) async fn sign_in(
    globals: &GlobalArgs,
    identifier: &str,
    password: &SecretString,
    resend_verification: bool,
) -> Result<AppShell> {
    let mut shell = globals.shell(Route::Login.path())?;
    shell.ready().await;

    if shell.submit_login(identifier, password).await {
        return Ok(shell);
    }

    let can_resend = matches!(
        shell.view(),
        View::Login {
            can_resend_verification: true
        }
    );
    if resend_verification && can_resend {
        eprintln!("{}", shell.notice().map(ToString::to_string).unwrap_or_default());
        let sent = shell.resend_verification().await;
        report(&shell, sent)?;
        anyhow::bail!("log in again once the email address is verified");
    }
    Err(failure(&shell))
}

/// Execute the login action.
/// # Errors
/// Returns the login screen message if the login fails.
pub async fn execute(args: Args) -> Result<()> {
    let shell = sign_in(
        &args.globals,
        &args.identifier,
        &args.password,
        args.resend_verification,
    )
    .await?;
    show_landing(&shell).await;
    Ok(())
}
