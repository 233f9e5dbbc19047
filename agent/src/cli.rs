//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::Platform;

/// Device control agent: executes cloud commands on an edge device
#[derive(Parser)]
#[command(name = "device-control", version, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "DEVICE_CONTROL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Connect to the broker and execute commands (default)
    Run,

    /// Show version
    Version,
}

/// Host layout and connection settings.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Agent root holding `device.config/`, `venv/`, and `cert/`
    #[arg(long, env = "DEVICE_CONTROL_ROOT_DIR", default_value = "/etc/sdt")]
    pub root_dir: PathBuf,

    /// Installed applications
    #[arg(long, env = "DEVICE_CONTROL_APPS_DIR", default_value = "/usr/local/sdt/app")]
    pub apps_dir: PathBuf,

    /// Virtual environments [default: <root-dir>/venv]
    #[arg(long, env = "DEVICE_CONTROL_VENV_DIR")]
    pub venv_dir: Option<PathBuf>,

    /// Conda installation [default: miniconda3 under the home user's home]
    #[arg(long, env = "DEVICE_CONTROL_CONDA_DIR")]
    pub conda_dir: Option<PathBuf>,

    /// Owner of the conda installation
    #[arg(long, env = "DEVICE_CONTROL_HOME_USER", default_value = "root")]
    pub home_user: String,

    /// Where systemd units are installed
    #[arg(long, env = "DEVICE_CONTROL_UNIT_DIR", default_value = "/etc/systemd/system")]
    pub unit_dir: PathBuf,

    /// Host platform [default: the compile target]
    #[arg(long, env = "DEVICE_CONTROL_PLATFORM", value_enum)]
    pub platform: Option<Platform>,

    /// Broker username for tcp:// connections
    #[arg(long, env = "DEVICE_CONTROL_MQTT_USER")]
    pub mqtt_user: Option<String>,

    /// Broker password for tcp:// connections
    #[arg(long, env = "DEVICE_CONTROL_MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// TLS material for ssl:// connections [default: <root-dir>/cert]
    #[arg(long, env = "DEVICE_CONTROL_CERT_DIR")]
    pub cert_dir: Option<PathBuf>,

    /// Python package index host for default packages
    #[arg(long, env = "DEVICE_CONTROL_INDEX_HOST")]
    pub index_host: Option<String>,

    /// Python package index port
    #[arg(long, env = "DEVICE_CONTROL_INDEX_PORT")]
    pub index_port: Option<u16>,

    /// Timeout for shell, systemctl, and docker commands
    #[arg(long, env = "DEVICE_CONTROL_COMMAND_TIMEOUT_SECS", default_value_t = 300)]
    pub command_timeout_secs: u64,

    /// Timeout for venv creation and package installs
    #[arg(long, env = "DEVICE_CONTROL_INSTALL_TIMEOUT_SECS", default_value_t = 1800)]
    pub install_timeout_secs: u64,
}

impl Cli {
    /// The subcommand to run; `run` when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}
