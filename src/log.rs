//! Structured logging for catalyst.
//!
//! Log levels:
//! - ERROR: Failures that end a turn or a session
//! - WARN: Recoverable conditions (taxonomy gaps, ignored hints, store failures)
//! - INFO: Session lifecycle and phase transitions
//! - DEBUG: Cache lookups, routing decisions, provider calls
//! - TRACE: Per-competency scores
//!
//! Debug mode can be enabled with `--debug` flag or `CATALYST_DEBUG=1` env var.
//! `CATALYST_LOG` accepts a full filter directive (e.g. `catalyst=trace`) and
//! overrides both.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Environment variable holding a filter directive.
pub const LOG_FILTER_ENV: &str = "CATALYST_LOG";

/// Environment variable toggling debug mode.
pub const DEBUG_ENV: &str = "CATALYST_DEBUG";

/// Initialize logging to ~/.catalyst/catalyst.log.
///
/// The log file is truncated on startup. If the home directory is not
/// available, events go to stderr instead. Calling this twice is harmless;
/// the first subscriber stays installed.
pub fn init_with_debug(debug: bool) {
    let debug_enabled = debug || env_debug();

    let filter = std::env::var(LOG_FILTER_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(debug_enabled)));

    let log_file = Config::catalyst_dir().ok().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        File::create(dir.join("catalyst.log")).ok()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = match log_file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

fn env_debug() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}
