//! Binary entrypoint for the layoutd daemon.
use std::process;

use clap::{Parser, Subcommand};
use layoutd_engine::Config;
use tracing::error;

#[cfg(target_os = "macos")]
mod bridge;
#[cfg(target_os = "macos")]
mod commands;
#[cfg(target_os = "macos")]
mod daemon;
mod error;
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod service;
#[cfg(target_os = "macos")]
mod watch;

pub use error::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "layoutd",
    about = "Remember the keyboard input source of every application",
    version
)]
/// Command-line interface for the `layoutd` binary.
struct Cli {
    /// Optional subcommand; defaults to `run`.
    #[command(subcommand)]
    command: Option<Command>,

    /// Extra bundle identifier to never watch (repeatable)
    #[arg(long, value_name = "BUNDLE_ID")]
    exclude: Vec<String>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
/// Top-level CLI subcommands.
enum Command {
    /// Run the daemon in the foreground until interrupted.
    Run,
    /// Show permission state, active input source and focused app, then exit.
    Status,
    /// List selectable keyboard input sources, then exit.
    Sources,
    /// Install the launchd user agent.
    Install,
    /// Stop and remove the launchd user agent.
    Uninstall,
    /// Reinstall the launchd user agent.
    Reinstall,
    /// Start the launchd user agent, installing it first if needed.
    Start,
    /// Stop the launchd user agent.
    Stop,
    /// Restart the launchd user agent.
    Restart,
}

impl Cli {
    /// Engine configuration from the command line.
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    fn config(&self) -> Config {
        Config::default().with_excluded_apps(self.exclude.iter().map(String::as_str))
    }
}

#[cfg(target_os = "macos")]
/// Dispatch the selected command.
fn dispatch(cli: &Cli) -> Result<()> {
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => daemon::run(cli.config()),
        Command::Status => commands::status(),
        Command::Sources => commands::sources(),
        Command::Install => service::Service::current(&cli.exclude)?.install(),
        Command::Uninstall => service::Service::current(&cli.exclude)?.uninstall(),
        Command::Reinstall => service::Service::current(&cli.exclude)?.reinstall(),
        Command::Start => service::Service::current(&cli.exclude)?.start(),
        Command::Stop => service::Service::current(&cli.exclude)?.stop(),
        Command::Restart => service::Service::current(&cli.exclude)?.restart(),
    }
}

#[cfg(not(target_os = "macos"))]
/// Dispatch the selected command.
fn dispatch(_cli: &Cli) -> Result<()> {
    Err(Error::Unsupported)
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);

    if let Err(e) = dispatch(&cli) {
        error!("{}", e);
        eprintln!("layoutd: {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use layoutd_engine::AppId;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["layoutd"]).expect("parse");
        assert_eq!(cli.command, None);
        let cli = Cli::try_parse_from(["layoutd", "sources"]).expect("parse");
        assert_eq!(cli.command, Some(Command::Sources));
    }

    #[test]
    fn service_subcommands_parse() {
        for (word, cmd) in [
            ("install", Command::Install),
            ("uninstall", Command::Uninstall),
            ("reinstall", Command::Reinstall),
            ("start", Command::Start),
            ("stop", Command::Stop),
            ("restart", Command::Restart),
        ] {
            let cli = Cli::try_parse_from(["layoutd", word]).expect("parse");
            assert_eq!(cli.command, Some(cmd), "{word}");
        }
        let cli = Cli::try_parse_from(["layoutd", "--exclude", "com.example.Panel", "install"])
            .expect("parse");
        assert_eq!(cli.command, Some(Command::Install));
        assert_eq!(cli.exclude, vec!["com.example.Panel".to_string()]);
    }

    #[test]
    fn excludes_extend_defaults() {
        let cli = Cli::try_parse_from([
            "layoutd",
            "--exclude",
            "com.example.Panel",
            "--exclude",
            "org.example.Other",
        ])
        .expect("parse");
        let cfg = cli.config();
        assert!(cfg.exclusions.contains(&AppId::from("com.example.Panel")));
        assert!(cfg.exclusions.contains(&AppId::from("org.example.Other")));
        assert!(cfg.exclusions.contains(&AppId::from("com.apple.dock")));
    }

    #[test]
    fn log_flags_are_flattened() {
        let cli = Cli::try_parse_from(["layoutd", "--debug", "--no-color", "status"])
            .expect("parse");
        assert!(cli.log.debug);
        assert!(cli.log.no_color);
        assert_eq!(cli.command, Some(Command::Status));
    }
}
