//! Logging initialisation via `tracing-subscriber`.
//!
//! Call [`init`] once at startup, after the config is loaded. Logs go to
//! stderr so `coursemate ask` can print the answer alone on stdout.

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// Priority: `RUST_LOG` > `level` (from `[logging] level`). Calling this
/// twice is harmless; the second subscriber is dropped.
pub fn init(level: &str) -> Result<()> {
    parse_level(level)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log level '{}': {}", level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();

    Ok(())
}

/// Validate a level string (`error`, `warn`, `info`, `debug`, `trace`, `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    if level.is_empty() {
        return Err(anyhow!("log level must not be empty"));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| anyhow!("unrecognised log level: '{}'", level))
}
