use std::env;
use std::process::Command;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use log::{error, info, warn};

use crate::constants::REQUIRED_TOOLS;
use crate::events::AppEvent;

/// Can a required helper tool be found in the current environment?
pub trait ToolProbe {
    fn is_available(&self, tool: &str) -> bool;
}

/// Installs a missing helper tool. Implementations decide the mechanism
/// (package manager subprocess in production, recording mock in tests).
pub trait ToolInstaller {
    fn install(&mut self, tool: &str) -> anyhow::Result<()>;
}

/// Typed outcome of the startup precondition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightOutcome {
    Satisfied,
    InstallFailed { tool: String, reason: String },
}

/// Single-pass check-then-install: probe every required tool, then attempt
/// installation of exactly the missing subset, in listed order, stopping at
/// the first failure. No automatic retry; the dialog offers a manual one.
pub fn run_preflight(
    required: &[&str],
    probe: &dyn ToolProbe,
    installer: &mut dyn ToolInstaller,
    progress: &mut dyn FnMut(String),
) -> PreflightOutcome {
    progress("Checking required tools...".to_string());

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|tool| !probe.is_available(tool))
        .collect();

    if missing.is_empty() {
        progress("All required tools are available".to_string());
        return PreflightOutcome::Satisfied;
    }

    progress(format!("Missing tools: {}", missing.join(", ")));
    progress("Attempting installation...".to_string());

    for tool in &missing {
        progress(format!("Installing {}...", tool));
        if let Err(e) = installer.install(tool) {
            warn!("Installation of '{}' failed: {:#}", tool, e);
            progress("Installation failed, install manually".to_string());
            return PreflightOutcome::InstallFailed {
                tool: tool.to_string(),
                reason: format!("{:#}", e),
            };
        }
    }

    progress("Tool installation succeeded".to_string());
    PreflightOutcome::Satisfied
}

/// Probes by scanning the `PATH` environment variable for an executable.
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn is_available(&self, tool: &str) -> bool {
        let Some(paths) = env::var_os("PATH") else {
            return false;
        };
        env::split_paths(&paths).any(|dir| {
            dir.join(tool).is_file() || dir.join(format!("{}.exe", tool)).is_file()
        })
    }
}

/// Installs by shelling out to the first platform package manager found.
pub struct PackageManagerInstaller {
    manager: Option<(&'static str, &'static [&'static str])>,
}

impl PackageManagerInstaller {
    // (binary, install subcommand) candidates in preference order
    const CANDIDATES: &'static [(&'static str, &'static [&'static str])] = &[
        ("apt-get", &["install", "-y"]),
        ("dnf", &["install", "-y"]),
        ("pacman", &["-S", "--noconfirm"]),
        ("brew", &["install"]),
    ];

    pub fn detect(probe: &dyn ToolProbe) -> Self {
        let manager = Self::CANDIDATES
            .iter()
            .copied()
            .find(|(binary, _)| probe.is_available(binary));
        if let Some((binary, _)) = manager {
            info!("Using package manager: {}", binary);
        }
        Self { manager }
    }
}

impl ToolInstaller for PackageManagerInstaller {
    fn install(&mut self, tool: &str) -> anyhow::Result<()> {
        let (binary, args) = self
            .manager
            .context("no supported package manager found on this system")?;

        let output = Command::new(binary)
            .args(args)
            .arg(tool)
            .output()
            .with_context(|| format!("failed to run {}", binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Runs the preflight check on a background thread, reporting progress lines
/// and the terminal outcome over the app event channel.
pub fn spawn_preflight(sender: mpsc::Sender<AppEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let probe = PathProbe;
        let mut installer = PackageManagerInstaller::detect(&probe);
        let progress_sender = sender.clone();

        let outcome = run_preflight(REQUIRED_TOOLS, &probe, &mut installer, &mut |line| {
            if let Err(e) = progress_sender.send(AppEvent::PreflightProgress(line)) {
                error!("Failed to send preflight progress: {}", e);
            }
        });

        let satisfied = outcome == PreflightOutcome::Satisfied;
        if let Err(e) = sender.send(AppEvent::PreflightComplete(satisfied)) {
            error!("Failed to send preflight result: {}", e);
        }
    })
}

/// Quick availability re-check used as the gate before starting a merge.
pub fn tools_available(required: &[&str]) -> bool {
    let probe = PathProbe;
    required.iter().all(|tool| probe.is_available(tool))
}
