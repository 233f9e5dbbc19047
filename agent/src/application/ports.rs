//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `device_common`, never
//! from `crate::infra`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use device_common::DeviceConfig;

use crate::domain::command::PortMapping;
use crate::domain::{AgentSettings, AppRecord, ServiceUnit};

// ── Value Types ───────────────────────────────────────────────────────────────

/// An installed application as seen by a runtime backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub name: String,
    pub id: String,
    /// Installed application directory.
    pub dir: PathBuf,
    /// Venv interpreter, when the application runs under one.
    pub interpreter: Option<PathBuf>,
}

impl AppTarget {
    /// Container name used by the container backend.
    #[must_use]
    pub fn container_name(&self) -> String {
        format!("{}-{}", self.name, self.id)
    }
}

/// Parameters for creating a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<Output>;
}

// ── Runtime Backend Ports ─────────────────────────────────────────────────────

/// Lifecycle verbs every runtime backend supports.
#[allow(async_fn_in_trait)]
pub trait AppBackend {
    async fn start(&self, target: &AppTarget) -> Result<()>;
    async fn stop(&self, target: &AppTarget) -> Result<()>;
    /// Deregister the application from the backend (unit file, container).
    async fn remove(&self, target: &AppTarget) -> Result<()>;
    /// Main process id. `Ok(None)` means the backend does not track pids.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend tracks pids but the process is not running.
    async fn resolve_pid(&self, target: &AppTarget) -> Result<Option<u32>>;
}

/// Registers applications with the OS service manager.
#[allow(async_fn_in_trait)]
pub trait ServiceInstaller {
    /// Install the unit so that `AppBackend::start` can run it.
    async fn install(&self, unit: &ServiceUnit) -> Result<()>;
    /// Start the unit on every boot.
    async fn enable(&self, target: &AppTarget) -> Result<()>;
}

/// Creates containers.
#[allow(async_fn_in_trait)]
pub trait ContainerProvisioner {
    async fn pull(&self, image: &str) -> Result<()>;
    async fn create(&self, spec: &ContainerSpec) -> Result<()>;
}

// ── Artifact Port ─────────────────────────────────────────────────────────────

/// Fetches and unpacks application artifacts.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// Download `url` into the file `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
    /// Unpack the zip archive `archive` into `dest_dir`.
    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<()>;
}

// ── State Ports ───────────────────────────────────────────────────────────────

/// Durable list of installed applications.
///
/// Every method reads and rewrites the whole store.
#[allow(async_fn_in_trait)]
pub trait RegistryStore {
    async fn load(&self) -> Result<Vec<AppRecord>>;
    /// # Errors
    ///
    /// Fails with `RegistryError::AlreadyExists` when the name is taken.
    async fn add(&self, record: AppRecord) -> Result<()>;
    /// Remove by name, returning the removed record's id.
    async fn remove_by_name(&self, name: &str) -> Result<Option<String>>;
    async fn find_by_group(&self, group_id: &str) -> Result<Vec<AppRecord>>;
}

/// Persistent device state (`device.config/config.json`).
#[allow(async_fn_in_trait)]
pub trait DeviceStateStore {
    async fn load(&self) -> Result<DeviceConfig>;
    /// Write the reboot marker and the request id it belongs to.
    async fn set_reboot_marker(&self, marker: &str, request_id: &str) -> Result<()>;
}

/// Local filesystem operations. Sync; callers run them on short files.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, content: String) -> Result<()>;
    /// Write through a temp file and rename, so readers never see a partial file.
    fn write_atomic(&self, path: &Path, content: &str) -> Result<()>;
    /// Names of the entries directly inside `path`, sorted.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;
}

// ── Messaging Port ────────────────────────────────────────────────────────────

/// Outbound side of the control channel.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    /// Queue `payload` on `topic`, waiting a bounded time for queue space.
    ///
    /// Success means the client accepted the message, not that the broker
    /// acknowledged it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

// ── Composite ─────────────────────────────────────────────────────────────────

/// Everything a command handler may touch, bundled so services take one handle.
pub trait DeviceHost {
    type Runner: CommandRunner;
    type Services: AppBackend + ServiceInstaller;
    type Containers: AppBackend + ContainerProvisioner;
    type Artifacts: ArtifactStore;
    type Registry: RegistryStore;
    type Device: DeviceStateStore;
    type Fs: LocalFs;
    type Publisher: Publisher;

    fn settings(&self) -> &AgentSettings;
    fn runner(&self) -> &Self::Runner;
    fn services(&self) -> &Self::Services;
    fn containers(&self) -> &Self::Containers;
    fn artifacts(&self) -> &Self::Artifacts;
    fn registry(&self) -> &Self::Registry;
    fn device(&self) -> &Self::Device;
    fn fs(&self) -> &Self::Fs;
    fn publisher(&self) -> &Self::Publisher;
    /// Topics of this device.
    fn topics(&self) -> &device_common::Topics;
}
