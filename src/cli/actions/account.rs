use crate::cli::{
    actions::{login::sign_in, report, show_landing},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub enum Operation {
    Rename { to: String },
    ChangePassword { new: SecretString },
    Avatar { file: PathBuf },
    Logout,
}

pub struct Args {
    pub globals: GlobalArgs,
    pub identifier: String,
    pub password: SecretString,
    pub operation: Operation,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("globals", &self.globals)
            .field("identifier", &self.identifier)
            .field("password", &"***")
            .field("operation", &self.operation)
            .finish()
    }
}

/// Content type for an avatar file, from its extension.
fn image_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Execute an account action after logging in.
/// # Errors
/// Returns the login or landing screen message if a step fails.
pub async fn execute(args: Args) -> Result<()> {
    let mut shell = sign_in(&args.globals, &args.identifier, &args.password, false).await?;
    shell.ready().await;

    let succeeded = match args.operation {
        Operation::Rename { to } => shell.rename(&to).await,
        Operation::ChangePassword { new } => shell.change_secret(&new).await,
        Operation::Avatar { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            debug!(size = bytes.len(), "avatar file loaded");
            shell.upload_avatar(bytes, image_content_type(&file)).await
        }
        Operation::Logout => shell.sign_out().await,
    };
    report(&shell, succeeded)?;

    if shell.sessions().is_signed_in() {
        show_landing(&shell).await;
    }
    Ok(())
}
