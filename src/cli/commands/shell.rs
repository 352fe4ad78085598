use crate::shell::GateConfig;
use clap::{Arg, Command};

pub const ARG_LOADING_MS: &str = "loading-ms";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let default_ms: &'static str = Box::leak(
        GateConfig::DEFAULT_MIN_DISPLAY
            .as_millis()
            .to_string()
            .into_boxed_str(),
    );

    command.arg(
        Arg::new(ARG_LOADING_MS)
            .long("loading-ms")
            .help("Minimum time the loading screen is shown after each navigation, in milliseconds")
            .env("TIDEGATE_LOADING_MS")
            .default_value(default_ms)
            .value_parser(clap::value_parser!(u64)),
    )
}
