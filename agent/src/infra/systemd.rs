//! systemd implementation of the service backend ports.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{AppBackend, AppTarget, CommandRunner, ServiceInstaller};
use crate::domain::ServiceUnit;
use crate::domain::service_unit::systemd_unit;
use crate::infra::command_runner::ensure_success;

const SYSTEMCTL: &str = "systemctl";

/// Runs applications as systemd units named after the application.
pub struct SystemdBackend<R> {
    runner: R,
    unit_dir: PathBuf,
}

impl<R: CommandRunner> SystemdBackend<R> {
    pub fn new(runner: R, unit_dir: PathBuf) -> Self {
        Self { runner, unit_dir }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<String> {
        let output = self.runner.run(SYSTEMCTL, args).await?;
        ensure_success(SYSTEMCTL, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{name}.service"))
    }
}

/// Parse `systemctl show --property MainPID` output. `0` means no process.
///
/// # Errors
///
/// Returns an error if the value is missing, not a number, or zero.
pub fn parse_main_pid(output: &str) -> Result<u32> {
    let value = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("MainPID="))
        .unwrap_or_else(|| output.trim());
    let pid: u32 = value
        .trim()
        .parse()
        .with_context(|| format!("unexpected MainPID value {value:?}"))?;
    anyhow::ensure!(pid != 0, "Not found process");
    Ok(pid)
}

impl<R: CommandRunner> ServiceInstaller for SystemdBackend<R> {
    async fn install(&self, unit: &ServiceUnit) -> Result<()> {
        let path = self.unit_dir.join(unit.file_name());
        tokio::fs::create_dir_all(&self.unit_dir)
            .await
            .with_context(|| format!("creating {}", self.unit_dir.display()))?;
        tokio::fs::write(&path, systemd_unit(unit))
            .await
            .with_context(|| format!("writing unit {}", path.display()))?;
        self.systemctl(&["daemon-reload"]).await?;
        tracing::info!(unit = %path.display(), "service unit installed");
        Ok(())
    }

    async fn enable(&self, target: &AppTarget) -> Result<()> {
        self.systemctl(&["enable", &target.name]).await.map(|_| ())
    }
}

impl<R: CommandRunner> AppBackend for SystemdBackend<R> {
    async fn start(&self, target: &AppTarget) -> Result<()> {
        self.systemctl(&["start", &target.name]).await.map(|_| ())
    }

    async fn stop(&self, target: &AppTarget) -> Result<()> {
        self.systemctl(&["stop", &target.name]).await.map(|_| ())
    }

    async fn remove(&self, target: &AppTarget) -> Result<()> {
        if let Err(e) = self.systemctl(&["disable", &target.name]).await {
            tracing::debug!(unit = %target.name, error = %format!("{e:#}"), "disable failed");
        }
        let path = self.unit_path(&target.name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("removing unit {}", path.display()))?;
        }
        self.systemctl(&["daemon-reload"]).await.map(|_| ())
    }

    async fn resolve_pid(&self, target: &AppTarget) -> Result<Option<u32>> {
        let out = self
            .systemctl(&["show", "--property", "MainPID", &target.name])
            .await?;
        parse_main_pid(&out).map(Some)
    }
}
