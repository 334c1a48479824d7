#![warn(missing_docs)]

//! Shared logging helpers and CLI argument definitions for the layoutd workspace.
//!
//! - [`LogArgs`]: flags every binary flattens into its CLI.
//! - [`compute_spec`]: resolve those flags and `RUST_LOG` into one filter spec.
//! - [`init`]: install the global compact fmt subscriber.

use std::{env, io};

use clap::Args;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "layoutd_engine=trace,mac_focus_watcher=debug"
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Disable ANSI colors in log output
    #[arg(long)]
    pub no_color: bool,
}

impl LogArgs {
    /// Filter spec for these flags, falling back to `RUST_LOG`.
    pub fn spec(&self) -> String {
        compute_spec(
            self.trace,
            self.debug,
            self.log_level.as_deref(),
            self.log_filter.as_deref(),
        )
    }
}

/// List of crate targets that constitute "our" logs.
pub fn our_crates() -> &'static [&'static str] {
    &[
        // App and core
        "layoutd",
        "layoutd_engine",
        // macOS integration crates
        "mac_focus_watcher",
        "mac_input_source",
        // Utilities
        "permissions",
        "logging",
    ]
}

/// Build a filter directive string that sets the same `level` for all of our crates.
pub fn level_spec_for(level: &str) -> String {
    let lvl = level.to_ascii_lowercase();
    our_crates()
        .iter()
        .map(|t| format!("{}={}", t, lvl))
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute the final filter spec string with precedence:
/// - `log_filter`
/// - `trace`/`debug`/`log_level` (crate-scoped)
/// - `RUST_LOG` env
/// - default to crate-scoped `info`
pub fn compute_spec(
    trace: bool,
    debug: bool,
    log_level: Option<&str>,
    log_filter: Option<&str>,
) -> String {
    if let Some(spec) = log_filter {
        return spec.to_string();
    }
    if trace {
        return level_spec_for("trace");
    }
    if debug {
        return level_spec_for("debug");
    }
    if let Some(lvl) = log_level {
        return level_spec_for(lvl);
    }
    env::var("RUST_LOG").unwrap_or_else(|_| level_spec_for("info"))
}

/// Install the global subscriber: `EnvFilter` from `args`, compact fmt output
/// on stderr. A second call is a no-op.
pub fn init(args: &LogArgs) {
    let env_filter = EnvFilter::new(args.spec());
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .compact()
                .with_ansi(!args.no_color)
                .with_writer(io::stderr),
        )
        .try_init();
}
