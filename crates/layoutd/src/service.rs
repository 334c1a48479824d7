//! launchd user agent management: install, remove, start and stop layoutd as a
//! LaunchAgent of the logged-in user.

use std::{
    env, fs, iter,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{info, warn};

use crate::{Error, Result};

/// launchd label of the agent.
pub const LABEL: &str = "org.layoutd.agent";

/// Path to the launchctl binary.
const LAUNCHCTL: &str = "/bin/launchctl";

/// A LaunchAgent definition for one executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// launchd label.
    label: String,
    /// Executable launchd runs.
    bin_path: PathBuf,
    /// `~/Library/LaunchAgents/<label>.plist`.
    plist_path: PathBuf,
    /// Extra `--exclude` arguments passed to the daemon.
    excludes: Vec<String>,
}

impl Service {
    /// The agent for the running executable, installed for the current user.
    pub fn current(excludes: &[String]) -> Result<Self> {
        let home = env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or(Error::HomeNotSet)?;
        let bin_path = env::current_exe().map_err(Error::ExePath)?;
        Ok(Self::new(LABEL, bin_path, Path::new(&home), excludes))
    }

    /// An agent labelled `label` running `bin_path`, with its plist under `home`.
    pub fn new(label: &str, bin_path: PathBuf, home: &Path, excludes: &[String]) -> Self {
        Self {
            label: label.to_string(),
            bin_path,
            plist_path: home
                .join("Library/LaunchAgents")
                .join(format!("{label}.plist")),
            excludes: excludes.to_vec(),
        }
    }

    /// Location of the plist.
    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    /// True if the plist exists.
    pub fn is_installed(&self) -> bool {
        self.plist_path.is_file()
    }

    /// Write the plist. An existing plist is left untouched.
    pub fn install(&self) -> Result<()> {
        if self.is_installed() {
            warn!(
                "existing launch agent at `{}`, skipping installation",
                self.plist_path.display()
            );
            return Ok(());
        }
        if let Some(dir) = self.plist_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.plist_path, self.launchd_plist())?;
        info!("installed launch agent to `{}`", self.plist_path.display());
        Ok(())
    }

    /// Stop the agent (best effort) and remove the plist.
    pub fn uninstall(&self) -> Result<()> {
        if !self.is_installed() {
            warn!(
                "no launch agent at `{}`, skipping uninstallation",
                self.plist_path.display()
            );
            return Ok(());
        }
        if let Err(e) = self.stop() {
            warn!("failed to stop service: {}", e);
        }
        fs::remove_file(&self.plist_path)?;
        info!("removed launch agent at `{}`", self.plist_path.display());
        Ok(())
    }

    /// Uninstall, then install with the current definition.
    pub fn reinstall(&self) -> Result<()> {
        self.uninstall()?;
        self.install()
    }

    /// Install if needed, load the agent into the user's GUI domain and
    /// (re)start it.
    pub fn start(&self) -> Result<()> {
        if !self.is_installed() {
            self.install()?;
        }
        info!("starting service...");
        if let Err(e) = launchctl(&[
            "bootstrap",
            &self.domain(),
            &self.plist_path.to_string_lossy(),
        ]) {
            // Already bootstrapped agents refuse a second bootstrap.
            warn!("bootstrap: {}", e);
        }
        launchctl(&["kickstart", "-k", &self.target()])?;
        info!("service started");
        Ok(())
    }

    /// Unload the agent from the user's GUI domain.
    pub fn stop(&self) -> Result<()> {
        info!("stopping service...");
        launchctl(&["bootout", &self.target()])?;
        info!("service stopped");
        Ok(())
    }

    /// Stop, then start.
    pub fn restart(&self) -> Result<()> {
        self.stop()?;
        self.start()
    }

    /// `gui/<uid>`.
    fn domain(&self) -> String {
        format!("gui/{}", unsafe { libc::getuid() })
    }

    /// `gui/<uid>/<label>`.
    fn target(&self) -> String {
        format!("{}/{}", self.domain(), self.label)
    }

    /// Daemon arguments after the executable. Top-level flags precede the
    /// subcommand.
    fn program_arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        for app in &self.excludes {
            args.push("--exclude".to_string());
            args.push(app.clone());
        }
        args.push("--no-color".to_string());
        args.push("run".to_string());
        args
    }

    /// The plist contents.
    pub fn launchd_plist(&self) -> String {
        let args: String = iter::once(self.bin_path.to_string_lossy().into_owned())
            .chain(self.program_arguments())
            .map(|a| format!("        <string>{}</string>\n", xml_escape(&a)))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{args}    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
    <key>StandardOutPath</key>
    <string>/tmp/{label}.out.log</string>
    <key>StandardErrorPath</key>
    <string>/tmp/{label}.err.log</string>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
        )
    }
}

/// Run launchctl, failing on a non-zero exit.
fn launchctl(args: &[&str]) -> Result<()> {
    let out = Command::new(LAUNCHCTL).args(args).output()?;
    if out.status.success() {
        return Ok(());
    }
    Err(Error::Launchctl {
        command: args.join(" "),
        code: out.status.code(),
        stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
    })
}

/// Escape text for a plist `<string>`.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use std::process;

    use super::*;

    fn scratch_home(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("layoutd-service-{name}-{}", process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn service(home: &Path, excludes: &[&str]) -> Service {
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        Service::new(
            "org.layoutd.test",
            PathBuf::from("/opt/layoutd/bin/layoutd"),
            home,
            &excludes,
        )
    }

    #[test]
    fn plist_lives_under_launch_agents() {
        let svc = service(Path::new("/Users/someone"), &[]);
        assert_eq!(
            svc.plist_path(),
            Path::new("/Users/someone/Library/LaunchAgents/org.layoutd.test.plist")
        );
    }

    #[test]
    fn plist_runs_the_daemon_with_excludes() {
        let plist = service(Path::new("/h"), &["com.example.Panel"]).launchd_plist();
        assert!(plist.contains("<string>org.layoutd.test</string>"));
        assert!(plist.contains("<string>/opt/layoutd/bin/layoutd</string>"));
        assert!(plist.contains("<string>run</string>"));
        assert!(plist.contains(
            "<string>--exclude</string>\n        <string>com.example.Panel</string>"
        ));
        assert!(plist.contains("<key>RunAtLoad</key>\n    <true/>"));
    }

    #[test]
    fn agent_arguments_parse_as_run() {
        use clap::Parser;

        let svc = service(Path::new("/h"), &["com.example.Panel"]);
        let argv = iter::once("layoutd".to_string()).chain(svc.program_arguments());
        let cli = crate::Cli::try_parse_from(argv).expect("parse");
        assert_eq!(cli.command, Some(crate::Command::Run));
        assert_eq!(cli.exclude, vec!["com.example.Panel".to_string()]);
        assert!(cli.log.no_color);
    }

    #[test]
    fn plist_text_is_escaped() {
        assert_eq!(xml_escape("a&b<c>"), "a&amp;b&lt;c&gt;");
    }

    #[test]
    fn install_writes_once_and_uninstall_removes() {
        let home = scratch_home("install");
        let svc = service(&home, &[]);
        assert!(!svc.is_installed());

        svc.install().expect("install");
        assert!(svc.is_installed());
        let written = fs::read_to_string(svc.plist_path()).expect("read plist");
        assert_eq!(written, svc.launchd_plist());

        // A second install leaves the existing file alone.
        fs::write(svc.plist_path(), "custom").expect("overwrite");
        svc.install().expect("install again");
        assert_eq!(fs::read_to_string(svc.plist_path()).expect("read"), "custom");

        // Stopping may fail outside a GUI session; removal still happens.
        svc.uninstall().expect("uninstall");
        assert!(!svc.is_installed());
        let _ = fs::remove_dir_all(&home);
    }

    #[test]
    fn uninstall_without_plist_is_ok() {
        let home = scratch_home("absent");
        service(&home, &[]).uninstall().expect("uninstall");
    }
}
