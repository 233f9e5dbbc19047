//! Application service — command dispatch.
//!
//! Turns one inbound envelope into at most two outbound envelopes: the
//! command's result and, for commands that change an application's
//! configuration, a snapshot of that configuration.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::path::PathBuf;

use device_common::{CommandEnvelope, CommandResult, REBOOT_PENDING, ResultEnvelope, Status, UNKNOWN};
use serde_json::{Map, Value};

use crate::application::ports::{CommandRunner, DeviceHost, DeviceStateStore, RegistryStore};
use crate::application::services::backend::{combined_output, find_record};
use crate::application::services::deployment::{self, DeploySpec, Deployed, failure_status};
use crate::application::services::outbound::now_millis;
use crate::application::services::venv::{self, Requirements};
use crate::application::services::{config_patch, model_update};
use crate::domain::artifact::is_safe_relative_path;
use crate::domain::command::{
    ConfigInfo, ConfigOp, ContainerInfo, ContainerOp, ContainerOptions, DeployInfo, DeployOp,
    ModelInfo, ServiceInfo, ShellInfo, VenvInfo, VenvOp, failure_message, success_message,
};
use crate::domain::config::APP_CONFIG_FILE;
use crate::domain::error::{BAD_REQUEST, INTERNAL};
use crate::domain::{Command, DeployError, Managed, Platform, VenvError};

const NOT_CHANGED: &str = "Not change.";
const NO_CONTENT: u16 = 204;

/// Outbound envelopes produced by one command.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// `None` only for a reboot, whose reply is deferred to the next start.
    pub result: Option<ResultEnvelope>,
    pub config_result: Option<ResultEnvelope>,
}

impl Dispatched {
    fn reply(result: ResultEnvelope) -> Self {
        Self {
            result: Some(result),
            config_result: None,
        }
    }
}

/// Per-command context used to build replies.
struct Reply<'a> {
    asset_code: &'a str,
    request_id: &'a str,
    cmd_type: &'a str,
    sub_cmd_type: &'a str,
}

impl Reply<'_> {
    fn blank(&self) -> CommandResult {
        let mut result = CommandResult::new(self.cmd_type, self.sub_cmd_type);
        result.updated_at = now_millis();
        result
    }

    fn for_app(&self, app_name: &str, app_id: &str) -> CommandResult {
        let mut result = self.blank();
        result.app_name = app_name.to_string();
        result.app_id = app_id.to_string();
        result
    }

    fn single(&self, result: CommandResult, status: Status) -> ResultEnvelope {
        ResultEnvelope::single(self.asset_code, self.request_id, result, status)
    }

    fn group(&self, group_id: &str, results: Vec<CommandResult>, status: Status) -> ResultEnvelope {
        ResultEnvelope::group(self.asset_code, self.request_id, group_id, results, status)
    }

    fn failed(&self, mut result: CommandResult, status: Status) -> Dispatched {
        if result.message.is_empty() && !result.app_name.is_empty() {
            result.message = failure_message(&result.app_name, self.sub_cmd_type);
        }
        Dispatched::reply(self.single(result, status))
    }

    fn succeeded(&self, mut result: CommandResult, status: Status) -> Dispatched {
        if result.message.is_empty() && !result.app_name.is_empty() {
            result.message = success_message(&result.app_name, self.sub_cmd_type);
        }
        Dispatched::reply(self.single(result, status))
    }
}

/// Decode, validate, and execute one command.
///
/// Never fails: every error becomes a failed [`ResultEnvelope`].
pub async fn dispatch(host: &impl DeviceHost, envelope: &CommandEnvelope) -> Dispatched {
    let reply = Reply {
        asset_code: &host.settings().device.asset_code,
        request_id: &envelope.request_id,
        cmd_type: &envelope.cmd_type,
        sub_cmd_type: &envelope.sub_cmd_type,
    };

    // Phase 1: Decode.
    let decoded = match Command::decode(
        &envelope.cmd_type,
        &envelope.sub_cmd_type,
        &envelope.cmd_info,
    ) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(cmd = %envelope.cmd_type, sub = %envelope.sub_cmd_type, error = %e, "unknown command");
            return reply.failed(reply.blank(), Status::failed(e.status_code(), e.to_string()));
        }
    };
    if let Some(e) = &decoded.payload_error {
        tracing::warn!(cmd = %envelope.cmd_type, error = %e, "cmdInfo does not fit its command, using empty fields");
    }

    // Phase 2: Validate.
    if let Err(e) = decoded.command.validate() {
        tracing::warn!(cmd = %envelope.cmd_type, sub = %envelope.sub_cmd_type, "malformed command rejected");
        return reply.failed(reply.blank(), Status::failed(e.status_code(), e.to_string()));
    }

    tracing::info!(cmd = %envelope.cmd_type, sub = %envelope.sub_cmd_type, request = %envelope.request_id, "executing command");
    let is_reboot = decoded.command.is_reboot();
    match decoded.command {
        Command::Shell(info) if is_reboot => reboot(host, &reply, &info).await,
        Command::Shell(info) => shell(host, &reply, &info).await,
        Command::Service(info) => service(host, &reply, &info).await,
        Command::Container(op, info) => container(host, &reply, op, &info).await,
        Command::Venv(op, info) => virtual_env(host, &reply, op, &info).await,
        Command::Deploy(op, info) => deploy(host, &reply, op, &info).await,
        Command::Model(info) => model(host, &reply, &info).await,
        Command::Config(op, info) => config(host, &reply, op, &info).await,
    }
}

// ── Shell and service ────────────────────────────────────────────────────────

async fn shell(host: &impl DeviceHost, reply: &Reply<'_>, info: &ShellInfo) -> Dispatched {
    let (program, flag) = host.settings().platform.shell();
    let mut result = reply.blank();
    match host.runner().run(program, &[flag, &info.cmd]).await {
        Ok(output) => {
            result.message = combined_output(&output);
            if output.status.success() {
                reply.succeeded(result, Status::ok())
            } else {
                let msg = result.message.clone();
                reply.failed(result, Status::failed(BAD_REQUEST, msg))
            }
        }
        Err(e) => reply.failed(result, Status::failed(BAD_REQUEST, format!("{e:#}"))),
    }
}

/// Persist the reboot marker, then reboot. The reply is sent by the next process.
async fn reboot(host: &impl DeviceHost, reply: &Reply<'_>, info: &ShellInfo) -> Dispatched {
    if let Err(e) = host
        .device()
        .set_reboot_marker(REBOOT_PENDING, reply.request_id)
        .await
    {
        tracing::error!(error = %format!("{e:#}"), "cannot persist reboot marker, not rebooting");
        return reply.failed(reply.blank(), Status::failed(INTERNAL, format!("{e:#}")));
    }
    tracing::warn!(request = %reply.request_id, "rebooting device");
    let (program, flag) = host.settings().platform.shell();
    match host.runner().run(program, &[flag, &info.cmd]).await {
        Ok(output) if !output.status.success() => {
            tracing::error!(output = %combined_output(&output), "reboot command failed");
        }
        Err(e) => tracing::error!(error = %format!("{e:#}"), "reboot command failed"),
        Ok(_) => {}
    }
    Dispatched::default()
}

async fn service(host: &impl DeviceHost, reply: &Reply<'_>, info: &ServiceInfo) -> Dispatched {
    if host.settings().platform == Platform::Windows {
        return reply.failed(
            reply.blank(),
            Status::failed(BAD_REQUEST, "systemd is not available on this platform."),
        );
    }
    let mut result = reply.blank();
    match host
        .runner()
        .run("systemctl", &[info.cmd.as_str(), info.service.as_str()])
        .await
    {
        Ok(output) if output.status.success() => {
            result.message = combined_output(&output);
            reply.succeeded(result, Status::ok())
        }
        Ok(output) => {
            let msg = combined_output(&output);
            reply.failed(result, Status::failed(BAD_REQUEST, msg))
        }
        Err(e) => reply.failed(result, Status::failed(BAD_REQUEST, format!("{e:#}"))),
    }
}

// ── Applications ─────────────────────────────────────────────────────────────

fn deployed_result(reply: &Reply<'_>, d: &Deployed) -> CommandResult {
    let mut result = reply.for_app(&d.app_name, &d.app_id);
    result.pid = d.pid;
    result.size = d.size;
    result.app_repo_path.clone_from(&d.app_repo_path);
    result.venv_name.clone_from(&d.venv_name);
    result.venv_requirement.clone_from(&d.venv_requirement);
    if let Some(inf) = &d.inference {
        result.model_id.clone_from(&inf.model_id);
        result.model_name.clone_from(&inf.model_name);
        result.model_version = inf.model_version;
    }
    result.message = success_message(&d.app_name, reply.sub_cmd_type);
    result
}

fn failed_result(reply: &Reply<'_>, app_name: &str, app_id: &str, err: &DeployError) -> CommandResult {
    let mut result = reply.for_app(app_name, app_id);
    result.message = failure_message(app_name, reply.sub_cmd_type);
    if matches!(err, DeployError::NotRunning(_)) {
        result.message = err.to_string();
    }
    result
}

/// Configuration snapshot of one application, as published after a change.
fn snapshot(host: &impl DeviceHost, reply: &Reply<'_>, app_name: &str, app_id: &str) -> Option<CommandResult> {
    let dir = host.settings().paths.app_dir(app_name, app_id);
    match config_patch::read_configs(host.fs(), &dir) {
        Ok(configs) => {
            let mut result = reply.for_app(app_name, app_id);
            result.command = "config".to_string();
            result.sub_command = "getConfig".to_string();
            result.parameter = configs;
            Some(result)
        }
        Err(e) => {
            tracing::warn!(app = %app_name, error = %e, "no configuration snapshot");
            None
        }
    }
}

fn snapshot_envelope(host: &impl DeviceHost, reply: &Reply<'_>, app_name: &str, app_id: &str) -> Option<ResultEnvelope> {
    snapshot(host, reply, app_name, app_id).map(|r| reply.single(r, Status::ok()))
}

/// Verbs shared by container and service applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Delete,
    Start,
    Stop,
}

async fn lifecycle(host: &impl DeviceHost, reply: &Reply<'_>, op: Lifecycle, name: &str) -> Dispatched {
    let outcome = match op {
        Lifecycle::Delete => deployment::delete(host, name).await.map(|r| (r, UNKNOWN)),
        Lifecycle::Start => deployment::start(host, name).await,
        Lifecycle::Stop => deployment::stop(host, name).await.map(|r| (r, UNKNOWN)),
    };
    match outcome {
        Ok((record, pid)) => {
            let mut result = reply.for_app(&record.app_name, &record.app_id);
            result.pid = pid;
            result.venv_name.clone_from(&record.app_venv);
            reply.succeeded(result, Status::ok())
        }
        Err(e) => reply.failed(reply.for_app(name, ""), failure_status(&e)),
    }
}

async fn container(host: &impl DeviceHost, reply: &Reply<'_>, op: ContainerOp, info: &ContainerInfo) -> Dispatched {
    let op = match op {
        ContainerOp::Deploy => return container_deploy(host, reply, info).await,
        ContainerOp::Delete => Lifecycle::Delete,
        ContainerOp::Start => Lifecycle::Start,
        ContainerOp::Stop => Lifecycle::Stop,
    };
    lifecycle(host, reply, op, &info.app_name).await
}

async fn container_deploy(host: &impl DeviceHost, reply: &Reply<'_>, info: &ContainerInfo) -> Dispatched {
    match deployment::deploy_container(host, info).await {
        Ok(d) => reply.succeeded(deployed_result(reply, &d), Status::ok()),
        Err(e) => {
            if e.needs_rollback() {
                deployment::roll_back(host, &info.app_name, &info.app_id, Managed::Container).await;
            }
            reply.failed(failed_result(reply, &info.app_name, &info.app_id, &e), failure_status(&e))
        }
    }
}

async fn deploy(host: &impl DeviceHost, reply: &Reply<'_>, op: DeployOp, info: &DeployInfo) -> Dispatched {
    let op = match op {
        DeployOp::Deploy if !info.apps.is_empty() => return deploy_group(host, reply, info).await,
        DeployOp::Deploy if info.file_url.is_empty() => {
            let container = ContainerInfo {
                image: info.image.clone(),
                app_id: info.app_id.clone(),
                app_name: info.app_name.clone(),
                options: ContainerOptions::default(),
            };
            return container_deploy(host, reply, &container).await;
        }
        DeployOp::Deploy => return deploy_single(host, reply, info).await,
        DeployOp::Delete => Lifecycle::Delete,
        DeployOp::Start => Lifecycle::Start,
        DeployOp::Stop => Lifecycle::Stop,
    };
    if info.app_name.is_empty() {
        group_lifecycle(host, reply, op, &info.app_group_id).await
    } else {
        lifecycle(host, reply, op, &info.app_name).await
    }
}

async fn deploy_single(host: &impl DeviceHost, reply: &Reply<'_>, info: &DeployInfo) -> Dispatched {
    let spec = DeploySpec::from_info(info);
    match deployment::deploy(host, &spec).await {
        Ok(d) => Dispatched {
            result: Some(reply.single(deployed_result(reply, &d), Status::ok())),
            config_result: snapshot_envelope(host, reply, &d.app_name, &d.app_id),
        },
        Err(e) => {
            tracing::error!(app = %spec.app_name, error = %e, "deploy failed");
            if e.needs_rollback() {
                deployment::roll_back(host, &spec.app_name, &spec.app_id, Managed::Service).await;
            }
            let mut result = failed_result(reply, &spec.app_name, &spec.app_id, &e);
            result.venv_name.clone_from(&spec.venv_name);
            reply.failed(result, failure_status(&e))
        }
    }
}

async fn deploy_group(host: &impl DeviceHost, reply: &Reply<'_>, info: &DeployInfo) -> Dispatched {
    let group_id = info.app_group_id.as_str();
    let report = match deployment::deploy_group(host, info).await {
        Ok(r) => r,
        Err(e) => return Dispatched::reply(reply.group(group_id, Vec::new(), failure_status(&e))),
    };
    let mut results: Vec<CommandResult> = report.deployed.iter().map(|d| deployed_result(reply, d)).collect();

    let Some((spec, err)) = &report.failure else {
        let snapshots = report
            .deployed
            .iter()
            .filter_map(|d| snapshot(host, reply, &d.app_name, &d.app_id))
            .collect::<Vec<_>>();
        return Dispatched {
            result: Some(reply.group(group_id, results, Status::ok())),
            config_result: (!snapshots.is_empty()).then(|| reply.group(group_id, snapshots, Status::ok())),
        };
    };

    results.push(failed_result(reply, &spec.app_name, &spec.app_id, err));
    deployment::roll_back_group(host, group_id, &report.touched()).await;
    Dispatched::reply(reply.group(group_id, results, failure_status(err)))
}

async fn group_lifecycle(host: &impl DeviceHost, reply: &Reply<'_>, op: Lifecycle, group_id: &str) -> Dispatched {
    if op == Lifecycle::Delete {
        return match deployment::delete_group(host, group_id).await {
            Ok(records) => {
                let results = records
                    .iter()
                    .map(|r| {
                        let mut result = reply.for_app(&r.app_name, &r.app_id);
                        result.message = success_message(&r.app_name, reply.sub_cmd_type);
                        result
                    })
                    .collect();
                Dispatched::reply(reply.group(group_id, results, Status::ok()))
            }
            Err(e) => Dispatched::reply(reply.group(group_id, Vec::new(), failure_status(&e))),
        };
    }

    let records = match host.registry().find_by_group(group_id).await {
        Ok(r) if !r.is_empty() => r,
        Ok(_) => {
            let e = DeployError::NotFound(group_id.to_string());
            return Dispatched::reply(reply.group(group_id, Vec::new(), failure_status(&e)));
        }
        Err(e) => {
            let e = DeployError::Registry(format!("{e:#}"));
            return Dispatched::reply(reply.group(group_id, Vec::new(), failure_status(&e)));
        }
    };
    let mut results = Vec::with_capacity(records.len());
    let mut first_err = None;
    for record in &records {
        let outcome = match op {
            Lifecycle::Start => deployment::start(host, &record.app_name).await.map(|(_, pid)| pid),
            Lifecycle::Stop | Lifecycle::Delete => deployment::stop(host, &record.app_name).await.map(|_| UNKNOWN),
        };
        match outcome {
            Ok(pid) => {
                let mut result = reply.for_app(&record.app_name, &record.app_id);
                result.pid = pid;
                result.message = success_message(&record.app_name, reply.sub_cmd_type);
                results.push(result);
            }
            Err(e) => {
                results.push(failed_result(reply, &record.app_name, &record.app_id, &e));
                first_err.get_or_insert(e);
            }
        }
    }
    let status = first_err.as_ref().map_or_else(Status::ok, failure_status);
    Dispatched::reply(reply.group(group_id, results, status))
}

// ── Virtual environments ─────────────────────────────────────────────────────

async fn virtual_env(host: &impl DeviceHost, reply: &Reply<'_>, op: VenvOp, info: &VenvInfo) -> Dispatched {
    let name = info.venv_name.as_str();
    let outcome = match op {
        VenvOp::Create => {
            let runtime = info.run_time.trim();
            let version = runtime.strip_prefix("python").unwrap_or(runtime);
            let created = match venv::create(host, name, version, Requirements::Text(&info.requirement)).await {
                Ok(message) => venv::install_default_packages(host, name).await.map(|()| message),
                Err(e) => Err(e),
            };
            if let Err(e) = &created {
                if !matches!(e, VenvError::AlreadyExists(_) | VenvError::InvalidName)
                    && venv::exists(host, name)
                {
                    tracing::warn!(venv = %name, "removing partially created venv");
                    venv::delete(host, name).ok();
                }
            }
            created
        }
        VenvOp::Delete => venv::delete_unused(host, name).await,
        VenvOp::Update => venv::update(host, name, &info.requirement).await,
    };

    let mut result = reply.blank();
    result.venv_name = name.to_string();
    result.venv_requirement.clone_from(&info.requirement);
    match outcome {
        Ok(message) => {
            result.message = message;
            reply.succeeded(result, Status::ok())
        }
        Err(e) => {
            tracing::error!(venv = %name, error = %e, "venv command failed");
            reply.failed(result, Status::failed(e.status_code(), e.to_string()))
        }
    }
}

// ── Model and configuration ──────────────────────────────────────────────────

async fn model(host: &impl DeviceHost, reply: &Reply<'_>, info: &ModelInfo) -> Dispatched {
    let mut result = reply.for_app(&info.app_name, &info.app_id);
    result.model_id.clone_from(&info.model_id);
    result.model_name.clone_from(&info.model_name);
    result.model_version = info.model_version;
    match model_update::update(host, info).await {
        Ok(configs) => {
            result.parameter = configs;
            reply.succeeded(result, Status::ok())
        }
        Err(e) => reply.failed(result, failure_status(&e)),
    }
}

/// Installed directory of `name`, preferring the registered id over `id_hint`.
async fn app_dir(host: &impl DeviceHost, name: &str, id_hint: &str) -> (String, PathBuf) {
    let id = match find_record(host, name).await {
        Some(record) => record.app_id,
        None => id_hint.to_string(),
    };
    let dir = host.settings().paths.app_dir(name, &id);
    (id, dir)
}

async fn config(host: &impl DeviceHost, reply: &Reply<'_>, op: ConfigOp, info: &ConfigInfo) -> Dispatched {
    let (app_id, dir) = app_dir(host, &info.app_name, &info.app_id).await;
    let mut result = reply.for_app(&info.app_name, &app_id);
    match op {
        ConfigOp::Get => match config_patch::read_configs(host.fs(), &dir) {
            Ok(configs) if configs.is_empty() => reply.succeeded(result, Status::success(NO_CONTENT)),
            Ok(configs) => {
                result.parameter = configs;
                reply.succeeded(result, Status::ok())
            }
            Err(e) => reply.failed(result, Status::failed(e.status_code(), e.to_string())),
        },
        ConfigOp::Fix => {
            let parameter: Map<String, Value> = info.parameter.clone().unwrap_or_default();
            if parameter.is_empty() {
                result.message = NOT_CHANGED.to_string();
                return reply.succeeded(result, Status::ok());
            }
            let file_name = if info.file_name.is_empty() {
                APP_CONFIG_FILE
            } else {
                info.file_name.as_str()
            };
            if !is_safe_relative_path(file_name) {
                return reply.failed(result, Status::failed(BAD_REQUEST, format!("Invalid file name {file_name}")));
            }
            match config_patch::patch_file(host.fs(), &dir.join(file_name), &parameter) {
                Ok(applied) => {
                    tracing::info!(app = %info.app_name, patch = %applied, "configuration changed");
                    result.parameter = parameter;
                    Dispatched {
                        config_result: snapshot_envelope(host, reply, &info.app_name, &app_id),
                        ..reply.succeeded(result, Status::ok())
                    }
                }
                Err(e) => reply.failed(result, Status::failed(e.status_code(), e.to_string())),
            }
        }
    }
}
