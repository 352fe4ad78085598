use crate::backend::firebase::{
    DEFAULT_AUTH_BASE_URL, DEFAULT_FIRESTORE_BASE_URL, DEFAULT_STORAGE_BASE_URL,
};
use clap::{Arg, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("Web API key of the identity project")
                .env("TIDEGATE_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("project-id")
                .long("project-id")
                .help("Project id owning the profile collection")
                .env("TIDEGATE_PROJECT_ID")
                .required(true),
        )
        .arg(
            Arg::new("storage-bucket")
                .long("storage-bucket")
                .help("Bucket holding profile pictures, example: my-project.appspot.com")
                .env("TIDEGATE_STORAGE_BUCKET"),
        )
        .arg(
            Arg::new("auth-url")
                .long("auth-url")
                .help("Identity toolkit base URL (override to target an emulator)")
                .env("TIDEGATE_AUTH_URL")
                .default_value(DEFAULT_AUTH_BASE_URL),
        )
        .arg(
            Arg::new("firestore-url")
                .long("firestore-url")
                .help("Document database base URL")
                .env("TIDEGATE_FIRESTORE_URL")
                .default_value(DEFAULT_FIRESTORE_BASE_URL),
        )
        .arg(
            Arg::new("storage-url")
                .long("storage-url")
                .help("Object storage base URL")
                .env("TIDEGATE_STORAGE_URL")
                .default_value(DEFAULT_STORAGE_BASE_URL),
        )
}
