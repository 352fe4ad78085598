pub mod account;
pub mod federated;
pub mod login;
pub mod signup;

// Internal "interpreter" for `Action`.
mod run;

use crate::features::account::LANDING_MESSAGE;
use crate::shell::{AppShell, View};
use anyhow::{anyhow, Result};

#[derive(Debug)]
pub enum Action {
    Signup(signup::Args),
    Login(login::Args),
    Federated(federated::Args),
    Account(account::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

/// Print the success notice, or turn the failure notice into the error.
fn report(shell: &AppShell, succeeded: bool) -> Result<()> {
    if succeeded {
        if let Some(notice) = shell.notice() {
            println!("{notice}");
        }
        return Ok(());
    }
    Err(failure(shell))
}

fn failure(shell: &AppShell) -> anyhow::Error {
    anyhow!(shell
        .notice()
        .map_or_else(|| "action failed".to_string(), ToString::to_string))
}

/// Wait for the loading gate and print the landing view.
async fn show_landing(shell: &AppShell) {
    shell.ready().await;
    if let View::Landing {
        greeting,
        avatar_url,
        ..
    } = shell.view()
    {
        println!("{greeting}");
        println!("{LANDING_MESSAGE}");
        if let Some(url) = avatar_url {
            println!("avatar: {url}");
        }
    }
}
