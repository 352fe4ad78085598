use crate::backend::{firebase::FirebaseConfig, FederatedToken};
use crate::cli::{
    actions::{account, federated, login, signup, Action},
    commands::shell::ARG_LOADING_MS,
    globals::GlobalArgs,
};
use crate::features::auth::SignupRequest;
use crate::shell::GateConfig;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn secret(matches: &ArgMatches, id: &str) -> Result<SecretString> {
    required(matches, id).map(SecretString::from)
}

/// Build the settings shared by every subcommand from the root matches.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let mut firebase = FirebaseConfig::new(
        secret(matches, "api-key")?,
        required(matches, "project-id")?,
    )
    .with_auth_base_url(required(matches, "auth-url")?)
    .with_firestore_base_url(required(matches, "firestore-url")?)
    .with_storage_base_url(required(matches, "storage-url")?);
    if let Some(bucket) = matches.get_one::<String>("storage-bucket") {
        firebase = firebase.with_storage_bucket(bucket.clone());
    }

    let loading_ms = matches
        .get_one::<u64>(ARG_LOADING_MS)
        .copied()
        .unwrap_or_else(|| {
            u64::try_from(GateConfig::DEFAULT_MIN_DISPLAY.as_millis()).unwrap_or(u64::MAX)
        });
    let gate = GateConfig::new().with_min_display(Duration::from_millis(loading_ms));

    Ok(GlobalArgs::new(firebase, gate))
}

fn account_operation(matches: &ArgMatches) -> Result<account::Operation> {
    match matches.subcommand() {
        Some(("rename", sub)) => Ok(account::Operation::Rename {
            to: required(sub, "to")?,
        }),
        Some(("password", sub)) => Ok(account::Operation::ChangePassword {
            new: secret(sub, "new")?,
        }),
        Some(("avatar", sub)) => Ok(account::Operation::Avatar {
            file: PathBuf::from(required(sub, "file")?),
        }),
        Some(("logout", _)) => Ok(account::Operation::Logout),
        _ => Err(anyhow!("missing account operation")),
    }
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    match matches.subcommand() {
        Some(("signup", sub)) => Ok(Action::Signup(signup::Args {
            globals,
            request: SignupRequest {
                handle: required(sub, "username")?,
                email: required(sub, "email")?,
                secret: secret(sub, "password")?,
                confirmation: secret(sub, "confirm-password")?,
            },
        })),
        Some(("login", sub)) => Ok(Action::Login(login::Args {
            globals,
            identifier: required(sub, "identifier")?,
            password: secret(sub, "password")?,
            resend_verification: sub.get_flag("resend-verification"),
        })),
        Some(("federated", sub)) => Ok(Action::Federated(federated::Args {
            globals,
            token: FederatedToken::new(required(sub, "provider-id")?, secret(sub, "id-token")?),
            signup: sub.get_flag("signup"),
        })),
        Some(("account", sub)) => Ok(Action::Account(account::Args {
            globals,
            identifier: required(sub, "identifier")?,
            password: secret(sub, "password")?,
            operation: account_operation(sub)?,
        })),
        _ => Err(anyhow!("missing subcommand")),
    }
}
