//! Runtime backend selection and application lookup.
//!
//! The backend for an application is chosen once, from its registry record's
//! `managed` field, instead of branching on the platform at every call site.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{AppBackend, AppTarget, DeviceHost, RegistryStore};
use crate::domain::{AppRecord, Managed};

/// The runtime backend owning one application.
pub enum Backend<'a, H: DeviceHost> {
    Service(&'a H::Services),
    Container(&'a H::Containers),
}

impl<'a, H: DeviceHost> Backend<'a, H> {
    pub fn for_managed(host: &'a H, managed: Managed) -> Self {
        match managed {
            Managed::Service => Backend::Service(host.services()),
            Managed::Container => Backend::Container(host.containers()),
        }
    }

    pub async fn start(&self, target: &AppTarget) -> Result<()> {
        match self {
            Backend::Service(b) => b.start(target).await,
            Backend::Container(b) => b.start(target).await,
        }
    }

    pub async fn stop(&self, target: &AppTarget) -> Result<()> {
        match self {
            Backend::Service(b) => b.stop(target).await,
            Backend::Container(b) => b.stop(target).await,
        }
    }

    pub async fn remove(&self, target: &AppTarget) -> Result<()> {
        match self {
            Backend::Service(b) => b.remove(target).await,
            Backend::Container(b) => b.remove(target).await,
        }
    }

    pub async fn resolve_pid(&self, target: &AppTarget) -> Result<Option<u32>> {
        match self {
            Backend::Service(b) => b.resolve_pid(target).await,
            Backend::Container(b) => b.resolve_pid(target).await,
        }
    }
}

/// Runtime view of `name`/`id` running in `venv` (empty for none).
pub fn target(host: &impl DeviceHost, name: &str, id: &str, venv: &str) -> AppTarget {
    let settings = host.settings();
    AppTarget {
        name: name.to_string(),
        id: id.to_string(),
        dir: settings.paths.app_dir(name, id),
        interpreter: (!venv.is_empty())
            .then(|| settings.paths.venv_python(venv, settings.platform)),
    }
}

/// Runtime view of a registered application.
pub fn target_for(host: &impl DeviceHost, record: &AppRecord) -> AppTarget {
    target(host, &record.app_name, &record.app_id, &record.app_venv)
}

/// Look up an application by name.
///
/// A registry that cannot be read is logged and treated as "no such application".
pub async fn find_record(host: &impl DeviceHost, name: &str) -> Option<AppRecord> {
    match host.registry().load().await {
        Ok(records) => records.into_iter().find(|r| r.app_name == name),
        Err(e) => {
            tracing::warn!(app = %name, error = %format!("{e:#}"), "registry unreadable");
            None
        }
    }
}

/// Stdout and stderr of a finished process, trimmed and joined.
#[must_use]
pub fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim(), stderr.trim()) {
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{out}\n{err}"),
    }
}
