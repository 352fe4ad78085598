use crate::cli::{actions::Action, commands, dispatch, telemetry};
use crate::GIT_COMMIT_HASH;
use anyhow::Result;
use clap::ArgMatches;
use tracing::{debug, Level};

/// `-v` count to tracing level. No flag keeps the default (errors only).
const fn level_for(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn verbosity(matches: &ArgMatches) -> Option<Level> {
    level_for(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or_default(),
    )
}

/// Parse the command line, install the subscriber and pick the action.
///
/// # Errors
///
/// Returns an error if the subscriber cannot be installed or a required
/// argument is missing.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(
        verbosity(&matches),
        matches.get_flag(commands::logging::ARG_LOG_JSON),
    )?;
    debug!(commit = GIT_COMMIT_HASH, "tidegate starting");

    dispatch::handler(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_counts_map_to_levels() {
        assert_eq!(level_for(0), None);
        assert_eq!(level_for(1), Some(Level::WARN));
        assert_eq!(level_for(3), Some(Level::DEBUG));
        assert_eq!(level_for(9), Some(Level::TRACE));
    }

    #[test]
    fn repeated_flag_raises_verbosity() {
        let matches = commands::new().get_matches_from([
            "tidegate",
            "--api-key",
            "key",
            "--project-id",
            "demo",
            "-vv",
            "login",
            "-i",
            "nova",
            "--password",
            "pw",
        ]);
        assert_eq!(verbosity(&matches), Some(Level::INFO));
    }
}
