pub mod backend;
pub mod logging;
pub mod shell;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, Command,
};

fn secret_arg(id: &'static str, env: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .env(env)
        .hide_env_values(true)
        .required(true)
}

fn signup_command() -> Command {
    Command::new("signup")
        .about("Create an account and send the verification email")
        .arg(
            Arg::new("username")
                .long("username")
                .help("Handle shown to other players, also usable to log in")
                .required(true),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .help("Email address for the new account")
                .required(true),
        )
        .arg(secret_arg("password", "TIDEGATE_PASSWORD", "Account password"))
        .arg(secret_arg(
            "confirm-password",
            "TIDEGATE_CONFIRM_PASSWORD",
            "Account password, again",
        ))
}

fn login_command() -> Command {
    Command::new("login")
        .about("Log in with an email address or a username")
        .arg(
            Arg::new("identifier")
                .long("identifier")
                .short('i')
                .help("Email address or username")
                .env("TIDEGATE_IDENTIFIER")
                .required(true),
        )
        .arg(secret_arg("password", "TIDEGATE_PASSWORD", "Account password"))
        .arg(
            Arg::new("resend-verification")
                .long("resend-verification")
                .help("Send a new verification email if the address is not verified yet")
                .action(ArgAction::SetTrue),
        )
}

fn federated_command() -> Command {
    Command::new("federated")
        .about("Log in (or sign up) with a federated provider ID token")
        .arg(secret_arg(
            "id-token",
            "TIDEGATE_ID_TOKEN",
            "ID token issued by the federated provider",
        ))
        .arg(
            Arg::new("provider-id")
                .long("provider-id")
                .help("Federated provider id")
                .default_value("google.com"),
        )
        .arg(
            Arg::new("signup")
                .long("signup")
                .help("Create the profile record when the provider sees this account for the first time")
                .action(ArgAction::SetTrue),
        )
}

fn account_command() -> Command {
    Command::new("account")
        .about("Log in and manage the account")
        .arg(
            Arg::new("identifier")
                .long("identifier")
                .short('i')
                .help("Email address or username")
                .env("TIDEGATE_IDENTIFIER")
                .required(true),
        )
        .arg(secret_arg("password", "TIDEGATE_PASSWORD", "Account password"))
        .subcommand_required(true)
        .subcommand(
            Command::new("rename")
                .about("Change the username")
                .arg(Arg::new("to").long("to").help("New username").required(true)),
        )
        .subcommand(
            Command::new("password")
                .about("Change the password")
                .arg(secret_arg(
                    "new",
                    "TIDEGATE_NEW_PASSWORD",
                    "New password, at least 6 characters",
                )),
        )
        .subcommand(
            Command::new("avatar")
                .about("Upload a new profile picture")
                .arg(
                    Arg::new("file")
                        .long("file")
                        .help("Image file (png, jpeg, gif or webp)")
                        .required(true),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out"))
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("tidegate")
        .about("Account client: login by username or email, signup, account actions")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(clap::ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .subcommand(signup_command())
        .subcommand(login_command())
        .subcommand(federated_command())
        .subcommand(account_command());

    let command = backend::with_args(command);
    let command = shell::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [&str; 5] = ["tidegate", "--api-key", "key", "--project-id", "demo"];

    fn args(extra: &[&str]) -> Vec<String> {
        BASE.iter()
            .chain(extra.iter())
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_new() {
        let command = new();
        assert_eq!(command.get_name(), "tidegate");
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(
            [
                ("TIDEGATE_PASSWORD", None::<&str>),
                ("TIDEGATE_LOADING_MS", None),
            ],
            || {
                let matches = new().get_matches_from(args(&[
                    "login",
                    "--identifier",
                    "nova",
                    "--password",
                    "hunter22",
                ]));
                assert_eq!(
                    matches.get_one::<String>("api-key").cloned(),
                    Some("key".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>(shell::ARG_LOADING_MS).copied(),
                    Some(6000)
                );

                let (name, sub) = matches.subcommand().unwrap_or_else(|| panic!("no subcommand"));
                assert_eq!(name, "login");
                assert_eq!(
                    sub.get_one::<String>("identifier").cloned(),
                    Some("nova".to_string())
                );
                assert!(!sub.get_flag("resend-verification"));
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("TIDEGATE_API_KEY", Some("env-key")),
                ("TIDEGATE_PROJECT_ID", Some("env-project")),
                ("TIDEGATE_LOADING_MS", Some("250")),
                ("TIDEGATE_PASSWORD", Some("from-env")),
                ("TIDEGATE_ID_TOKEN", Some("id-token")),
                ("TIDEGATE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(["tidegate", "federated", "--signup"]);
                assert_eq!(
                    matches.get_one::<String>("project-id").cloned(),
                    Some("env-project".to_string())
                );
                assert_eq!(
                    matches.get_one::<u64>(shell::ARG_LOADING_MS).copied(),
                    Some(250)
                );
                assert_eq!(matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(), Some(2));

                let (_, sub) = matches.subcommand().unwrap_or_else(|| panic!("no subcommand"));
                assert_eq!(
                    sub.get_one::<String>("provider-id").cloned(),
                    Some("google.com".to_string())
                );
                assert!(sub.get_flag("signup"));
            },
        );
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("TIDEGATE_LOG_LEVEL", None::<String>)], || {
                let mut argv = args(&["account", "-i", "nova", "--password", "x", "logout"]);
                if index > 0 {
                    argv.push(format!("-{}", "v".repeat(index)));
                }
                let matches = new().get_matches_from(argv);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_account_requires_an_operation() {
        let result = new().try_get_matches_from(args(&["account", "-i", "nova", "--password", "x"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        temp_env::with_vars([("TIDEGATE_API_KEY", None::<&str>)], || {
            let result = new().try_get_matches_from([
                "tidegate",
                "--project-id",
                "demo",
                "login",
                "-i",
                "nova",
                "--password",
                "x",
            ]);
            assert!(result.is_err());
        });
    }
}
