//! The OS service manager of this host, chosen once from the platform.

use anyhow::Result;

use crate::application::ports::{AppBackend, AppTarget, CommandRunner, ServiceInstaller};
use crate::domain::ServiceUnit;
use crate::infra::systemd::SystemdBackend;
use crate::infra::windows_service::WindowsServiceBackend;

pub enum HostServiceBackend<R> {
    Systemd(SystemdBackend<R>),
    Windows(WindowsServiceBackend<R>),
}

impl<R: CommandRunner> ServiceInstaller for HostServiceBackend<R> {
    async fn install(&self, unit: &ServiceUnit) -> Result<()> {
        match self {
            Self::Systemd(b) => b.install(unit).await,
            Self::Windows(b) => b.install(unit).await,
        }
    }

    async fn enable(&self, target: &AppTarget) -> Result<()> {
        match self {
            Self::Systemd(b) => b.enable(target).await,
            Self::Windows(b) => b.enable(target).await,
        }
    }
}

impl<R: CommandRunner> AppBackend for HostServiceBackend<R> {
    async fn start(&self, target: &AppTarget) -> Result<()> {
        match self {
            Self::Systemd(b) => b.start(target).await,
            Self::Windows(b) => b.start(target).await,
        }
    }

    async fn stop(&self, target: &AppTarget) -> Result<()> {
        match self {
            Self::Systemd(b) => b.stop(target).await,
            Self::Windows(b) => b.stop(target).await,
        }
    }

    async fn remove(&self, target: &AppTarget) -> Result<()> {
        match self {
            Self::Systemd(b) => b.remove(target).await,
            Self::Windows(b) => b.remove(target).await,
        }
    }

    async fn resolve_pid(&self, target: &AppTarget) -> Result<Option<u32>> {
        match self {
            Self::Systemd(b) => b.resolve_pid(target).await,
            Self::Windows(b) => b.resolve_pid(target).await,
        }
    }
}
