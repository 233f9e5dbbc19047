//! Application context — every collaborator the agent needs, constructed once.
//!
//! `AppContext` is the production `DeviceHost`. Services receive it as
//! `&impl DeviceHost`, so tests substitute their own host without touching
//! any service signature.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use device_common::{DeviceConfig, Topics};

use crate::application::DeviceHost;
use crate::cli::SettingsArgs;
use crate::domain::config::default_conda_dir;
use crate::domain::{AgentPaths, AgentSettings, DeviceProfile, Platform};
use crate::infra::artifact::HttpArtifactStore;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::device_config::JsonDeviceStore;
use crate::infra::docker::DockerCli;
use crate::infra::fs::LocalFs;
use crate::infra::mqtt::{BrokerAuth, MqttPublisher};
use crate::infra::registry::JsonRegistryStore;
use crate::infra::services::HostServiceBackend;
use crate::infra::systemd::SystemdBackend;
use crate::infra::windows_service::WindowsServiceBackend;

/// Combine CLI settings with the device configuration file.
#[must_use]
pub fn build_settings(args: &SettingsArgs, device: &DeviceConfig) -> AgentSettings {
    let root = &args.root_dir;
    let paths = AgentPaths {
        root: root.clone(),
        apps_dir: args.apps_dir.clone(),
        venv_dir: args.venv_dir.clone().unwrap_or_else(|| root.join("venv")),
        conda_dir: args
            .conda_dir
            .clone()
            .unwrap_or_else(|| default_conda_dir(&args.home_user)),
        unit_dir: args.unit_dir.clone(),
        cert_dir: args.cert_dir.clone().unwrap_or_else(|| root.join("cert")),
    };
    AgentSettings {
        paths,
        platform: args.platform.unwrap_or_else(Platform::current),
        device: DeviceProfile {
            asset_code: device.assetcode.clone(),
            device_type: device.devicetype.clone(),
            service_type: device.servicetype.clone(),
        },
        package_index: AgentSettings::resolve_index(
            args.index_host.as_deref(),
            args.index_port,
            &device.servicetype,
            &device.serverip,
        ),
        install_timeout: Duration::from_secs(args.install_timeout_secs),
    }
}

/// Broker credentials from the CLI.
#[must_use]
pub fn broker_auth(args: &SettingsArgs) -> BrokerAuth {
    BrokerAuth {
        username: args.mqtt_user.clone(),
        password: args.mqtt_password.clone(),
    }
}

/// Device config file location for `args`.
#[must_use]
pub fn device_config_path(args: &SettingsArgs) -> PathBuf {
    AgentPaths::with_root(&args.root_dir, &args.home_user).device_config_file()
}

/// Production host: real process runner, service manager, docker, HTTP, and broker.
pub struct AppContext {
    settings: AgentSettings,
    topics: Topics,
    runner: TokioCommandRunner,
    services: HostServiceBackend<TokioCommandRunner>,
    containers: DockerCli<TokioCommandRunner>,
    artifacts: HttpArtifactStore,
    registry: JsonRegistryStore,
    device: JsonDeviceStore,
    fs: LocalFs,
    publisher: MqttPublisher,
}

impl AppContext {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        settings: AgentSettings,
        topics: Topics,
        command_timeout: Duration,
        publisher: MqttPublisher,
    ) -> Result<Self> {
        let runner = || TokioCommandRunner::new(command_timeout);
        let services = match settings.platform {
            Platform::Linux => HostServiceBackend::Systemd(SystemdBackend::new(
                runner(),
                settings.paths.unit_dir.clone(),
            )),
            Platform::Windows => HostServiceBackend::Windows(WindowsServiceBackend::new(runner())),
        };
        Ok(Self {
            topics,
            runner: runner(),
            services,
            containers: DockerCli::new(runner()),
            artifacts: HttpArtifactStore::new()?,
            registry: JsonRegistryStore::new(settings.paths.registry_file()),
            device: JsonDeviceStore::new(settings.paths.device_config_file()),
            fs: LocalFs,
            publisher,
            settings,
        })
    }
}

impl DeviceHost for AppContext {
    type Runner = TokioCommandRunner;
    type Services = HostServiceBackend<TokioCommandRunner>;
    type Containers = DockerCli<TokioCommandRunner>;
    type Artifacts = HttpArtifactStore;
    type Registry = JsonRegistryStore;
    type Device = JsonDeviceStore;
    type Fs = LocalFs;
    type Publisher = MqttPublisher;

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn runner(&self) -> &Self::Runner {
        &self.runner
    }

    fn services(&self) -> &Self::Services {
        &self.services
    }

    fn containers(&self) -> &Self::Containers {
        &self.containers
    }

    fn artifacts(&self) -> &Self::Artifacts {
        &self.artifacts
    }

    fn registry(&self) -> &Self::Registry {
        &self.registry
    }

    fn device(&self) -> &Self::Device {
        &self.device
    }

    fn fs(&self) -> &Self::Fs {
        &self.fs
    }

    fn publisher(&self) -> &Self::Publisher {
        &self.publisher
    }

    fn topics(&self) -> &Topics {
        &self.topics
    }
}
