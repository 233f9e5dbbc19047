//! Agent settings: filesystem layout, host platform, and package index.
//!
//! Pure types only — no I/O, no async, no filesystem access.

use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Constants ────────────────────────────────────────────────────────────────

/// Venv name that means "use the environment the manifest declares".
pub const APP_STORE_VENV: &str = "app-store";

/// Venv created at startup and shared by ad-hoc scripts.
pub const BASE_VENV: &str = "base";

/// Per-application configuration file patched by deploys and model updates.
pub const APP_CONFIG_FILE: &str = "config.json";

/// Port of the package index on on-prem installs (served by `serverip`).
pub const ONPREM_INDEX_PORT: u16 = 32421;

// ── Platform ─────────────────────────────────────────────────────────────────

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Platform the binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Shell used for free-form commands: program and the flag that takes a script.
    #[must_use]
    pub fn shell(self) -> (&'static str, &'static str) {
        match self {
            Platform::Linux => ("sh", "-c"),
            Platform::Windows => ("cmd", "/C"),
        }
    }
}

// ── Paths ────────────────────────────────────────────────────────────────────

/// Well-known directories the agent reads and writes.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    /// Agent root, e.g. `/etc/sdt`.
    pub root: PathBuf,
    /// Installed applications, one `{name}_{id}` directory each.
    pub apps_dir: PathBuf,
    /// Virtual environments, one directory each.
    pub venv_dir: PathBuf,
    /// Conda installation (contains `bin/conda`).
    pub conda_dir: PathBuf,
    /// Where service units are installed.
    pub unit_dir: PathBuf,
    /// TLS material for the broker connection.
    pub cert_dir: PathBuf,
}

impl AgentPaths {
    /// Default layout under `root` for the given home user.
    #[must_use]
    pub fn with_root(root: &Path, home_user: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            apps_dir: PathBuf::from("/usr/local/sdt/app"),
            venv_dir: root.join("venv"),
            conda_dir: default_conda_dir(home_user),
            unit_dir: PathBuf::from("/etc/systemd/system"),
            cert_dir: root.join("cert"),
        }
    }

    #[must_use]
    pub fn registry_file(&self) -> PathBuf {
        self.root.join("device.config").join("app.json")
    }

    #[must_use]
    pub fn device_config_file(&self) -> PathBuf {
        self.root.join("device.config").join("config.json")
    }

    /// Directory of an installed application.
    #[must_use]
    pub fn app_dir(&self, app_name: &str, app_id: &str) -> PathBuf {
        self.apps_dir.join(format!("{app_name}_{app_id}"))
    }

    #[must_use]
    pub fn venv(&self, name: &str) -> PathBuf {
        self.venv_dir.join(name)
    }

    #[must_use]
    pub fn conda_bin(&self) -> PathBuf {
        self.conda_dir.join("bin")
    }

    /// The `conda` executable.
    #[must_use]
    pub fn conda(&self, platform: Platform) -> PathBuf {
        match platform {
            Platform::Linux => self.conda_bin().join("conda"),
            Platform::Windows => self.conda_dir.join("Scripts").join("conda.exe"),
        }
    }

    /// Interpreter inside a venv.
    #[must_use]
    pub fn venv_python(&self, name: &str, platform: Platform) -> PathBuf {
        match platform {
            Platform::Linux => self.venv(name).join("bin").join("python"),
            Platform::Windows => self.venv(name).join("python.exe"),
        }
    }

    /// `pip` inside a venv.
    #[must_use]
    pub fn venv_pip(&self, name: &str, platform: Platform) -> PathBuf {
        match platform {
            Platform::Linux => self.venv(name).join("bin").join("pip"),
            Platform::Windows => self.venv(name).join("Scripts").join("pip.exe"),
        }
    }
}

/// Conda location for `home_user` (`/root/miniconda3` for root).
#[must_use]
pub fn default_conda_dir(home_user: &str) -> PathBuf {
    if home_user.is_empty() || home_user == "root" {
        PathBuf::from("/root/miniconda3")
    } else {
        PathBuf::from("/home").join(home_user).join("miniconda3")
    }
}

// ── Package index ────────────────────────────────────────────────────────────

/// Python package index that serves the device default packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIndex {
    pub host: String,
    pub port: u16,
}

impl PackageIndex {
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "http://{}:{}/api/packages/app.manager/pypi/simple/",
            self.host, self.port
        )
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

/// Device identity needed by services (from the device config file).
#[derive(Debug, Clone, Default)]
pub struct DeviceProfile {
    pub asset_code: String,
    pub device_type: String,
    pub service_type: String,
}

/// Everything a service needs to know about the host, constructed once at startup.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub paths: AgentPaths,
    pub platform: Platform,
    pub device: DeviceProfile,
    pub package_index: Option<PackageIndex>,
    /// Timeout for environment creation and package installation.
    pub install_timeout: Duration,
}

impl AgentSettings {
    /// Resolve the package index: explicit host wins, on-prem falls back to `server_ip`.
    #[must_use]
    pub fn resolve_index(
        host: Option<&str>,
        port: Option<u16>,
        service_type: &str,
        server_ip: &str,
    ) -> Option<PackageIndex> {
        match host.filter(|h| !h.is_empty()) {
            Some(h) => Some(PackageIndex {
                host: h.to_string(),
                port: port.unwrap_or(80),
            }),
            None if service_type == "onprem" && !server_ip.is_empty() => Some(PackageIndex {
                host: server_ip.to_string(),
                port: port.unwrap_or(ONPREM_INDEX_PORT),
            }),
            None => None,
        }
    }
}
