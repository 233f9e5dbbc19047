//! Inbound command model: one variant per `cmdType`, decoded then validated.
//!
//! Decoding never fails on a malformed payload. A payload that does not fit
//! its variant decodes to the variant's zero value and the decode error is
//! handed back for logging; `Command::validate` then rejects it.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::error::CommandError;

// ── Payloads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellInfo {
    pub cmd: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceInfo {
    pub cmd: String,
    pub service: String,
}

/// Published port of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerOptions {
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerInfo {
    pub image: String,
    pub app_id: String,
    pub app_name: String,
    pub options: ContainerOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VenvInfo {
    pub venv_name: String,
    /// Requirements text, one package per line.
    pub requirement: String,
    pub bin_file: String,
    /// Interpreter, e.g. `python3.9`.
    pub run_time: String,
}

/// One member of a group deploy.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupMember {
    pub app_type: String,
    pub app_id: String,
    pub app_name: String,
    pub app: String,
    pub file_url: String,
    pub venv_name: String,
    pub parameter: Option<Map<String, Value>>,
    pub model_id: String,
    pub model_name: String,
    pub model_version: i64,
    pub model_url: String,
    pub model_file_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeployInfo {
    pub app_id: String,
    pub app_name: String,
    /// Top-level directory inside the artifact archive.
    pub app: String,
    pub app_type: String,
    pub image: String,
    pub file_url: String,
    pub venv_name: String,
    pub app_group_id: String,
    pub apps: Vec<GroupMember>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelInfo {
    pub app_id: String,
    pub app_name: String,
    pub model_id: String,
    pub model_name: String,
    pub model_version: i64,
    pub model_url: String,
    pub model_file_key: String,
    pub parameter: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigInfo {
    pub app_id: String,
    pub app_name: String,
    pub file_name: String,
    pub parameter: Option<Map<String, Value>>,
}

// ── Operations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOp {
    Deploy,
    Delete,
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenvOp {
    Create,
    Delete,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOp {
    Deploy,
    Delete,
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOp {
    /// Patch a configuration file.
    Fix,
    /// Read every configuration file of an application.
    Get,
}

fn app_op(sub: &str) -> Option<DeployOp> {
    match sub {
        "appDeploy" => Some(DeployOp::Deploy),
        "appDelete" => Some(DeployOp::Delete),
        "appStart" => Some(DeployOp::Start),
        "appStop" => Some(DeployOp::Stop),
        _ => None,
    }
}

// ── Command ──────────────────────────────────────────────────────────────────

/// A decoded command, one variant per `cmdType`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Shell(ShellInfo),
    Service(ServiceInfo),
    Container(ContainerOp, ContainerInfo),
    Venv(VenvOp, VenvInfo),
    Deploy(DeployOp, DeployInfo),
    Model(ModelInfo),
    Config(ConfigOp, ConfigInfo),
}

/// Result of the decode phase.
#[derive(Debug)]
pub struct Decoded {
    pub command: Command,
    /// Payload that did not fit the variant; the command carries zero values.
    pub payload_error: Option<serde_json::Error>,
}

fn decode_payload<T>(raw: &Value) -> (T, Option<serde_json::Error>)
where
    T: Default + for<'de> Deserialize<'de>,
{
    if raw.is_null() {
        return (T::default(), None);
    }
    match serde_json::from_value(raw.clone()) {
        Ok(v) => (v, None),
        Err(e) => (T::default(), Some(e)),
    }
}

impl Command {
    /// Select the variant for `cmd_type`/`sub_cmd_type` and decode `cmd_info` into it.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NotFound`] for an unknown command or subcommand.
    pub fn decode(cmd_type: &str, sub_cmd_type: &str, cmd_info: &Value) -> Result<Decoded, CommandError> {
        let (command, payload_error) = match cmd_type {
            "bash" => {
                let (info, err) = decode_payload(cmd_info);
                (Command::Shell(info), err)
            }
            "systemd" => {
                let (info, err) = decode_payload(cmd_info);
                (Command::Service(info), err)
            }
            "docker" => {
                let op = match app_op(sub_cmd_type).ok_or(CommandError::NotFound)? {
                    DeployOp::Deploy => ContainerOp::Deploy,
                    DeployOp::Delete => ContainerOp::Delete,
                    DeployOp::Start => ContainerOp::Start,
                    DeployOp::Stop => ContainerOp::Stop,
                };
                let (info, err) = decode_payload(cmd_info);
                (Command::Container(op, info), err)
            }
            "virtualEnv" => {
                let op = match sub_cmd_type {
                    "venvCreate" => VenvOp::Create,
                    "venvDelete" => VenvOp::Delete,
                    "venvUpdate" => VenvOp::Update,
                    _ => return Err(CommandError::NotFound),
                };
                let (info, err) = decode_payload(cmd_info);
                (Command::Venv(op, info), err)
            }
            "deploy" => {
                let op = app_op(sub_cmd_type).ok_or(CommandError::NotFound)?;
                let (info, err) = decode_payload(cmd_info);
                (Command::Deploy(op, info), err)
            }
            "model" => {
                if sub_cmd_type != "update" {
                    return Err(CommandError::NotFound);
                }
                let (info, err) = decode_payload(cmd_info);
                (Command::Model(info), err)
            }
            "config" => {
                let op = match sub_cmd_type {
                    "configFix" => ConfigOp::Fix,
                    "getConfig" => ConfigOp::Get,
                    _ => return Err(CommandError::NotFound),
                };
                let (info, err) = decode_payload(cmd_info);
                (Command::Config(op, info), err)
            }
            _ => return Err(CommandError::NotFound),
        };
        Ok(Decoded {
            command,
            payload_error,
        })
    }

    /// Check that the fields the handler needs are present.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Malformed`] when a required field is empty.
    pub fn validate(&self) -> Result<(), CommandError> {
        let ok = match self {
            Command::Shell(i) => !i.cmd.trim().is_empty(),
            Command::Service(i) => !i.cmd.is_empty() && !i.service.is_empty(),
            Command::Container(ContainerOp::Deploy, i) => !i.image.is_empty(),
            Command::Container(_, i) => !i.app_name.is_empty(),
            Command::Venv(VenvOp::Create, i) => !i.venv_name.is_empty() && !i.bin_file.is_empty(),
            Command::Venv(_, i) => !i.venv_name.is_empty(),
            Command::Deploy(DeployOp::Deploy, i) => {
                !i.file_url.is_empty() || !i.image.is_empty() || !i.apps.is_empty()
            }
            Command::Deploy(_, i) => !i.app_name.is_empty() || !i.app_group_id.is_empty(),
            Command::Model(i) => !i.app_name.is_empty(),
            Command::Config(_, i) => !i.app_name.is_empty(),
        };
        if ok { Ok(()) } else { Err(CommandError::Malformed) }
    }

    /// Whether the shell command asks for a device reboot.
    #[must_use]
    pub fn is_reboot(&self) -> bool {
        matches!(self, Command::Shell(i) if i.cmd.trim() == "reboot")
    }
}

// ── Result messages ──────────────────────────────────────────────────────────

#[must_use]
pub fn success_message(app_name: &str, sub_cmd_type: &str) -> String {
    format!("{app_name}'s {sub_cmd_type} successed.")
}

#[must_use]
pub fn failure_message(app_name: &str, sub_cmd_type: &str) -> String {
    format!("{app_name}'s {sub_cmd_type} failed.")
}
