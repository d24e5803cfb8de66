//! A set of utilities to enable logging configuration using tracing_subscriber.

use std::{io::IsTerminal, sync::Once};

use tracing_subscriber::{EnvFilter, filter::LevelFilter};

static INGEST_LOG_ENV_VAR: &str = "INGEST_LOG";

/// Initializes a tracing subscriber for logging.
///
/// Workspace crates log at the level named by `INGEST_LOG` (default `info`) unless `RUST_LOG`
/// carries a directive for them; everything else defaults to `error`.
pub fn init() {
    // Since we also use this function to enable logging in tests, wrap it in `Once` to prevent
    // multiple initializations.
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let (env_filter, log_level) = env_filter_and_log_level();

        // Another subscriber may already be installed by the embedding application.
        let installed = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init()
            .is_ok();

        if installed {
            tracing::info!("log level: {}", log_level);
        }
    });
}

/// List of crates in the workspace.
const INGEST_CRATES: &[&str] = &[
    "backfill_db",
    "evm_codec",
    "evm_schema",
    "ingest_config",
    "monitoring",
];

fn env_filter_and_log_level() -> (EnvFilter, String) {
    // Parse directives from RUST_LOG, ignoring the ones that do not parse
    let directive_string = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::ERROR.into())
        .parse_lossy(&directive_string);

    let log_level = std::env::var(INGEST_LOG_ENV_VAR).unwrap_or_else(|_| "info".to_string());

    for crate_name in INGEST_CRATES {
        // Add directives for each crate in INGEST_CRATES, if not overriden by RUST_LOG
        if directive_string.contains(&format!("{crate_name}=")) {
            continue;
        }
        match format!("{crate_name}={log_level}").parse() {
            Ok(directive) => env_filter = env_filter.add_directive(directive),
            Err(err) => {
                eprintln!("ignoring invalid {INGEST_LOG_ENV_VAR} level {log_level:?}: {err}");
                break;
            }
        }
    }

    (env_filter, log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// If this fails, just update the above `INGEST_CRATES` to match reality.
    #[test]
    fn ingest_crates_match_workspace_members() {
        use cargo_metadata::MetadataCommand;

        let cmd = MetadataCommand::new()
            .exec()
            .expect("cargo metadata should run");
        let mut names: Vec<String> = cmd
            .workspace_packages()
            .into_iter()
            .map(|pkg| pkg.name.replace("-", "_"))
            .collect();
        names.sort();
        assert_eq!(names, INGEST_CRATES);
    }

    #[test]
    fn init_is_idempotent() {
        //* When
        init();
        init();

        //* Then
        tracing::info!("logging initialized twice without panicking");
    }
}
