//! A set of utilities to enable logging configuration using tracing_subscriber.

use std::{error::Error, io::IsTerminal, sync::Once};

use tracing_subscriber::{EnvFilter, filter::LevelFilter};

static SERVICEX_LOG_ENV_VAR: &str = "SERVICEX_LOG";

/// Initializes a tracing subscriber for logging.
pub fn init() {
    // Tests call this once per test function, wrap it in `Once` to prevent multiple
    // initializations.
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let (env_filter, log_level) = env_filter_and_log_level();

        // `try_init` so a subscriber installed by the test runner is left alone.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init();

        tracing::info!("log level: {}", log_level);
    });
}

/// Renders the chain of sources below `err`, outermost first.
///
/// Meant for the `error_source` field of structured log events, next to `error = %err`.
pub fn error_source(err: &dyn Error) -> String {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    format!("{chain:?}")
}

/// List of crates in the workspace.
const WORKSPACE_CRATES: &[&str] = &[
    "monitoring",
    "servicex_client",
    "servicex_config",
    "servicex_object_store",
    "servicex_query",
    "tests",
];

fn env_filter_and_log_level() -> (EnvFilter, String) {
    // Parse directives from RUST_LOG
    let directive_string = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(&directive_string);

    let log_level = std::env::var(SERVICEX_LOG_ENV_VAR).unwrap_or_else(|_| "info".to_string());

    for crate_name in WORKSPACE_CRATES {
        // Add directives for each workspace crate, if not overriden by RUST_LOG
        if directive_string.contains(&format!("{crate_name}=")) {
            continue;
        }
        match format!("{crate_name}={log_level}").parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(err) => {
                eprintln!("ignoring invalid {SERVICEX_LOG_ENV_VAR} value {log_level:?}: {err}");
                break;
            }
        }
    }

    (env_filter, log_level)
}
