//! Windows service control manager backend.
//!
//! Applications register themselves: their run file accepts
//! `install|start|stop|remove` and is invoked with the venv interpreter.
//! The SCM does not report pids back here.

use anyhow::{Context, Result};
use device_common::manifest::DEFAULT_RUN_FILE;

use crate::application::ports::{AppBackend, AppTarget, CommandRunner, ServiceInstaller};
use crate::domain::ServiceUnit;
use crate::infra::command_runner::ensure_success;

pub struct WindowsServiceBackend<R> {
    runner: R,
}

impl<R: CommandRunner> WindowsServiceBackend<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn service_verb(&self, target: &AppTarget, run_file: &str, verb: &str) -> Result<()> {
        let python = target
            .interpreter
            .as_ref()
            .with_context(|| format!("{} has no interpreter", target.name))?;
        let python = python.to_string_lossy();
        let script = target.dir.join(run_file);
        let script = script.to_string_lossy();
        let output = self.runner.run(&python, &[&script, verb]).await?;
        ensure_success(&python, &output)
    }
}

impl<R: CommandRunner> ServiceInstaller for WindowsServiceBackend<R> {
    async fn install(&self, unit: &ServiceUnit) -> Result<()> {
        let target = AppTarget {
            name: unit.name.clone(),
            id: String::new(),
            dir: unit.app_dir.clone(),
            interpreter: unit.interpreter.clone(),
        };
        self.service_verb(&target, &unit.run_file, "install").await
    }

    /// Restart the service 10 s after a failure.
    async fn enable(&self, target: &AppTarget) -> Result<()> {
        let service = format!("{}_{}", target.name, target.id);
        let output = self
            .runner
            .run("sc", &["failure", &service, "reset= 0", "actions= restart/10000"])
            .await?;
        ensure_success("sc", &output)
    }
}

impl<R: CommandRunner> AppBackend for WindowsServiceBackend<R> {
    async fn start(&self, target: &AppTarget) -> Result<()> {
        self.service_verb(target, DEFAULT_RUN_FILE, "start").await
    }

    async fn stop(&self, target: &AppTarget) -> Result<()> {
        self.service_verb(target, DEFAULT_RUN_FILE, "stop").await
    }

    async fn remove(&self, target: &AppTarget) -> Result<()> {
        self.service_verb(target, DEFAULT_RUN_FILE, "remove").await
    }

    async fn resolve_pid(&self, _target: &AppTarget) -> Result<Option<u32>> {
        Ok(None)
    }
}
