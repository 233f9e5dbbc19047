//! Container backend driving the `docker` CLI.

use anyhow::{Context, Result};

use crate::application::ports::{AppBackend, AppTarget, CommandRunner, ContainerProvisioner, ContainerSpec};
use crate::infra::command_runner::ensure_success;

const DOCKER: &str = "docker";

pub struct DockerCli<R> {
    runner: R,
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn docker(&self, args: &[&str]) -> Result<String> {
        let output = self.runner.run(DOCKER, args).await?;
        ensure_success(DOCKER, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Arguments of `docker create` for `spec`.
#[must_use]
pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), spec.name.clone()];
    for (key, value) in &spec.env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
    }
    for port in &spec.ports {
        let proto = if port.protocol.is_empty() { "tcp" } else { port.protocol.as_str() };
        args.push("-p".into());
        args.push(format!("{}:{}/{proto}", port.host_port, port.container_port));
    }
    args.push(spec.image.clone());
    args
}

impl<R: CommandRunner> ContainerProvisioner for DockerCli<R> {
    async fn pull(&self, image: &str) -> Result<()> {
        tracing::info!(image = %image, "pulling image");
        self.docker(&["pull", image]).await.map(|_| ())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<()> {
        let args = create_args(spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.docker(&args).await.map(|_| ())
    }
}

impl<R: CommandRunner> AppBackend for DockerCli<R> {
    async fn start(&self, target: &AppTarget) -> Result<()> {
        self.docker(&["start", &target.container_name()]).await.map(|_| ())
    }

    async fn stop(&self, target: &AppTarget) -> Result<()> {
        self.docker(&["stop", &target.container_name()]).await.map(|_| ())
    }

    async fn remove(&self, target: &AppTarget) -> Result<()> {
        self.docker(&["rm", "-f", &target.container_name()]).await.map(|_| ())
    }

    async fn resolve_pid(&self, target: &AppTarget) -> Result<Option<u32>> {
        let out = self
            .docker(&["inspect", "-f", "{{.State.Pid}}", &target.container_name()])
            .await?;
        let pid: u32 = out
            .parse()
            .with_context(|| format!("unexpected container pid {out:?}"))?;
        anyhow::ensure!(pid != 0, "container {} is not running", target.container_name());
        Ok(Some(pid))
    }
}
