//! Application service — application deployment, removal, and lifecycle.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Deploy never rolls itself back: on failure it returns an error whose
//! `needs_rollback()` tells the caller whether to run [`roll_back`].

use std::path::{Path, PathBuf};

use device_common::{CommandResult, FrameworkManifest, ResultEnvelope, Runtime, Status, UNKNOWN};
use serde_json::{Map, Value};

use crate::application::ports::{
    AppTarget, ArtifactStore, ContainerProvisioner, ContainerSpec, DeviceHost, LocalFs,
    RegistryStore, ServiceInstaller,
};
use crate::application::services::backend::{Backend, find_record, target, target_for};
use crate::application::services::outbound::publish_json;
use crate::application::services::venv::{self, Requirements};
use crate::application::services::config_patch;
use crate::domain::artifact::{self, is_safe_component, is_safe_relative_path};
use crate::domain::command::{ContainerInfo, DeployInfo, GroupMember};
use crate::domain::config::{APP_CONFIG_FILE, APP_STORE_VENV};
use crate::domain::manifest::{self, MANIFEST_FILES, ManifestFormat};
use crate::domain::patch;
use crate::domain::service_unit::ERROR_LOG;
use crate::domain::{AppRecord, DeployError, InferenceInfo, Managed, RegistryDocument, ServiceUnit};

/// Subdirectories every inference application gets.
pub const INFERENCE_DIRS: &[&str] = &["weights", "result", "logs", "data"];

const INFERENCE_TYPE: &str = "INFERENCE";
const REQUEST_TYPE: &str = "REQUEST";

// ── Inputs and outputs ───────────────────────────────────────────────────────

/// Model weights installed with an inference application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceSpec {
    pub model_id: String,
    pub model_name: String,
    pub model_version: i64,
    pub model_url: String,
    /// Dotted key path inside `parameter` naming the weight file.
    pub model_file_key: String,
    pub parameter: Map<String, Value>,
}

/// One application to install from an artifact archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploySpec {
    pub app_id: String,
    pub app_name: String,
    /// Top-level directory inside the archive; empty to detect it.
    pub archive_root: String,
    pub file_url: String,
    /// Requested venv; empty or `app-store` defers to the manifest.
    pub venv_name: String,
    pub app_group_id: String,
    pub inference: Option<InferenceSpec>,
}

impl DeploySpec {
    #[must_use]
    pub fn from_info(info: &DeployInfo) -> Self {
        Self {
            app_id: info.app_id.clone(),
            app_name: info.app_name.clone(),
            archive_root: info.app.clone(),
            file_url: info.file_url.clone(),
            venv_name: info.venv_name.clone(),
            app_group_id: info.app_group_id.clone(),
            inference: None,
        }
    }

    /// Spec for one group member.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::AppType`] for types other than `INFERENCE` and `REQUEST`.
    pub fn from_member(member: &GroupMember, app_group_id: &str) -> Result<Self, DeployError> {
        let inference = match member.app_type.as_str() {
            INFERENCE_TYPE => Some(InferenceSpec {
                model_id: member.model_id.clone(),
                model_name: member.model_name.clone(),
                model_version: member.model_version,
                model_url: member.model_url.clone(),
                model_file_key: member.model_file_key.clone(),
                parameter: member.parameter.clone().unwrap_or_default(),
            }),
            REQUEST_TYPE => None,
            other => return Err(DeployError::AppType(other.to_string())),
        };
        Ok(Self {
            app_id: member.app_id.clone(),
            app_name: member.app_name.clone(),
            archive_root: member.app.clone(),
            file_url: member.file_url.clone(),
            venv_name: member.venv_name.clone(),
            app_group_id: app_group_id.to_string(),
            inference,
        })
    }
}

/// A running, registered application.
#[derive(Debug, Clone, PartialEq)]
pub struct Deployed {
    pub app_name: String,
    pub app_id: String,
    /// Main process id, [`UNKNOWN`] when the backend does not track pids.
    pub pid: i64,
    /// Archive size in bytes.
    pub size: i64,
    pub app_repo_path: String,
    pub venv_name: String,
    /// Requirements the application ships with.
    pub venv_requirement: String,
    pub inference: Option<InferenceInfo>,
}

/// Outcome of a group deploy. Members after the first failure are not attempted.
#[derive(Debug, Default)]
pub struct GroupReport {
    pub deployed: Vec<Deployed>,
    /// The member that failed, with its error.
    pub failure: Option<(DeploySpec, DeployError)>,
}

impl GroupReport {
    /// `(name, id)` of every member that may have left state behind.
    #[must_use]
    pub fn touched(&self) -> Vec<(String, String)> {
        let mut apps: Vec<_> = self
            .deployed
            .iter()
            .map(|d| (d.app_name.clone(), d.app_id.clone()))
            .collect();
        if let Some((spec, err)) = &self.failure {
            if err.needs_rollback() {
                apps.push((spec.app_name.clone(), spec.app_id.clone()));
            }
        }
        apps
    }
}

fn pid_value(pid: Option<u32>) -> i64 {
    pid.map_or(UNKNOWN, i64::from)
}

// ── Deploy ───────────────────────────────────────────────────────────────────

/// Install and start one application from its artifact archive.
///
/// Steps:
/// 1. Guard: names are safe and not yet registered
/// 2. Download and unpack into `{apps_dir}/{name}_{id}`
/// 3. Resync the manifest's app name
/// 4. Resolve runtime and venv, creating the venv if missing
/// 5. Register the application
/// 6. Install the service unit (and inference extras), start, enable
/// 7. Resolve the pid; on failure return the service's error log
///
/// # Errors
///
/// Step 1 failures leave the device untouched. Any later failure may leave
/// state behind and `needs_rollback()` is true.
pub async fn deploy(host: &impl DeviceHost, spec: &DeploySpec) -> Result<Deployed, DeployError> {
    // Step 1: Guard.
    guard_new_app(host, &spec.app_name, &spec.app_id).await?;
    tracing::info!(app = %spec.app_name, id = %spec.app_id, "deploying application");

    // Step 2: Fetch.
    let paths = &host.settings().paths;
    let app_dir = paths.app_dir(&spec.app_name, &spec.app_id);
    let size = fetch_archive(host, spec, &app_dir).await?;
    let app_repo_path = artifact::repo_path(&spec.file_url);

    // Step 3: Manifest.
    let manifest = sync_manifest(host, &app_dir, &spec.app_name)?;

    // Step 4: Runtime and venv.
    let (venv_name, interpreter) = prepare_runtime(host, spec, &manifest, &app_dir).await?;
    let venv_requirement = read_requirements(host, &app_dir, &manifest);

    // Step 5: Register.
    let inference = spec.inference.as_ref().map(|i| InferenceInfo {
        model_id: i.model_id.clone(),
        model_name: i.model_name.clone(),
        model_version: i.model_version,
    });
    let mut record = AppRecord::service(&spec.app_name, &spec.app_id, &venv_name);
    record.app_group_id.clone_from(&spec.app_group_id);
    record.inference.clone_from(&inference);
    host.registry()
        .add(record)
        .await
        .map_err(|e| DeployError::Registry(format!("{e:#}")))?;

    // Step 6: Install and start.
    let unit = ServiceUnit {
        name: spec.app_name.clone(),
        app_dir: app_dir.clone(),
        interpreter: interpreter.clone(),
        run_file: manifest.run_file().to_string(),
    };
    let services = host.services();
    services
        .install(&unit)
        .await
        .map_err(|e| DeployError::Service(format!("{e:#}")))?;
    if let Some(inf) = &spec.inference {
        install_inference(host, &app_dir, inf).await?;
    }
    let app = AppTarget {
        name: spec.app_name.clone(),
        id: spec.app_id.clone(),
        dir: app_dir.clone(),
        interpreter,
    };
    let backend = Backend::for_managed(host, Managed::Service);
    backend
        .start(&app)
        .await
        .map_err(|e| DeployError::Service(format!("{e:#}")))?;
    services
        .enable(&app)
        .await
        .map_err(|e| DeployError::Service(format!("{e:#}")))?;

    // Step 7: Verify.
    let pid = match backend.resolve_pid(&app).await {
        Ok(pid) => pid_value(pid),
        Err(e) => {
            let log = read_error_log(host, &app_dir);
            tracing::error!(app = %spec.app_name, error = %format!("{e:#}"), "application did not start");
            return Err(DeployError::NotRunning(if log.is_empty() {
                format!("{e:#}")
            } else {
                log
            }));
        }
    };

    tracing::info!(app = %spec.app_name, pid, "application deployed");
    Ok(Deployed {
        app_name: spec.app_name.clone(),
        app_id: spec.app_id.clone(),
        pid,
        size: i64::try_from(size).unwrap_or(i64::MAX),
        app_repo_path,
        venv_name,
        venv_requirement,
        inference,
    })
}

/// Deploy every member of a group in order, stopping at the first failure.
///
/// # Errors
///
/// Returns [`DeployError::EmptyGroup`] when there is nothing to deploy.
pub async fn deploy_group(host: &impl DeviceHost, info: &DeployInfo) -> Result<GroupReport, DeployError> {
    if info.apps.is_empty() {
        return Err(DeployError::EmptyGroup);
    }
    let total = info.apps.len();
    let mut report = GroupReport::default();
    for (idx, member) in info.apps.iter().enumerate() {
        tracing::info!(group = %info.app_group_id, app = %member.app_name, "deploying group member {}/{total}", idx + 1);
        let outcome = match DeploySpec::from_member(member, &info.app_group_id) {
            Ok(spec) => deploy(host, &spec).await.map_err(|e| (spec, e)),
            Err(e) => Err((
                DeploySpec {
                    app_id: member.app_id.clone(),
                    app_name: member.app_name.clone(),
                    app_group_id: info.app_group_id.clone(),
                    ..DeploySpec::default()
                },
                e,
            )),
        };
        match outcome {
            Ok(deployed) => report.deployed.push(deployed),
            Err((spec, e)) => {
                tracing::error!(group = %info.app_group_id, app = %spec.app_name, error = %e, "group member failed");
                report.failure = Some((spec, e));
                break;
            }
        }
    }
    Ok(report)
}

/// Undo a failed group deploy: every touched member plus every registered member of the group.
pub async fn roll_back_group(host: &impl DeviceHost, app_group_id: &str, touched: &[(String, String)]) {
    for (name, id) in touched {
        roll_back(host, name, id, Managed::Service).await;
    }
    match host.registry().find_by_group(app_group_id).await {
        Ok(records) => {
            for record in records {
                teardown(host, &record).await.ok();
            }
        }
        Err(e) => {
            tracing::warn!(group = %app_group_id, error = %format!("{e:#}"), "cannot list group for rollback");
        }
    }
}

/// Remove whatever a failed deploy of `name`/`id` left behind.
pub async fn roll_back(host: &impl DeviceHost, name: &str, id: &str, managed: Managed) {
    tracing::warn!(app = %name, id = %id, "rolling back deploy");
    let record = match find_record(host, name).await {
        Some(r) if r.app_id == id => r,
        Some(_) => {
            tracing::warn!(app = %name, "registered under another id, leaving it alone");
            return;
        }
        None => AppRecord {
            managed,
            ..AppRecord::service(name, id, "")
        },
    };
    if let Err(e) = teardown(host, &record).await {
        tracing::warn!(app = %name, error = %e, "rollback incomplete");
    }
}

async fn guard_new_app(host: &impl DeviceHost, name: &str, id: &str) -> Result<(), DeployError> {
    if !is_safe_component(name) || !is_safe_component(id) {
        return Err(DeployError::InvalidName);
    }
    let apps = host
        .registry()
        .load()
        .await
        .map_err(|e| DeployError::RegistryUnavailable(format!("{e:#}")))?;
    let doc = RegistryDocument { apps };
    if doc.find(name).is_some() {
        return Err(DeployError::AlreadyExists(name.to_string()));
    }
    Ok(())
}

/// Download the archive and move its root directory to `app_dir`.
async fn fetch_archive(host: &impl DeviceHost, spec: &DeploySpec, app_dir: &Path) -> Result<u64, DeployError> {
    let fs = host.fs();
    let apps_dir = &host.settings().paths.apps_dir;
    let download = |e: anyhow::Error| DeployError::Download(format!("{e:#}"));

    let archive_name = artifact::archive_name(&spec.file_url)
        .filter(|n| is_safe_component(n))
        .ok_or_else(|| DeployError::Download(format!("no archive name in {}", spec.file_url)))?;
    fs.create_dir_all(apps_dir).map_err(download)?;
    if fs.exists(app_dir) {
        tracing::warn!(dir = %app_dir.display(), "removing stale application directory");
        fs.remove_dir_all(app_dir).map_err(download)?;
    }

    let archive = apps_dir.join(&archive_name);
    let staging = apps_dir.join(format!(
        ".staging-{}",
        artifact::app_dir_name(&spec.app_name, &spec.app_id)
    ));
    let result = async {
        let size = host.artifacts().download(&spec.file_url, &archive).await?;
        tracing::info!(archive = %archive.display(), size, "artifact downloaded");
        host.artifacts().unpack(&archive, &staging).await?;
        let root = archive_root(fs, &staging, &spec.archive_root)?;
        fs.rename(&root, app_dir)?;
        Ok::<u64, anyhow::Error>(size)
    }
    .await;

    if fs.exists(&staging) {
        fs.remove_dir_all(&staging).ok();
    }
    if fs.exists(&archive) {
        if let Err(e) = fs.remove_file(&archive) {
            tracing::warn!(archive = %archive.display(), error = %format!("{e:#}"), "cannot remove archive");
        }
    }
    result.map_err(download)
}

/// Directory inside the unpacked archive that becomes the application directory.
fn archive_root(fs: &impl LocalFs, staging: &Path, declared: &str) -> anyhow::Result<PathBuf> {
    if !declared.is_empty() {
        anyhow::ensure!(is_safe_component(declared), "invalid archive root {declared:?}");
        let root = staging.join(declared);
        if fs.exists(&root) {
            return Ok(root);
        }
        tracing::warn!(root = %declared, "declared archive root missing, detecting it");
    }
    let entries = fs.list_dir(staging)?;
    if let [only] = entries.as_slice() {
        let root = staging.join(only);
        if !MANIFEST_FILES.contains(&only.as_str()) && fs.list_dir(&root).is_ok() {
            return Ok(root);
        }
    }
    // Flat archive: the staging directory itself is the application.
    Ok(staging.to_path_buf())
}

/// Rewrite the manifest's app name to `app_name` and parse it.
fn sync_manifest(host: &impl DeviceHost, app_dir: &Path, app_name: &str) -> Result<FrameworkManifest, DeployError> {
    let fs = host.fs();
    let manifest_err = |e: String| DeployError::Manifest(e);
    let Some(file) = MANIFEST_FILES.iter().find(|f| fs.exists(&app_dir.join(f))) else {
        return Err(DeployError::Manifest(format!(
            "no {} in {}",
            MANIFEST_FILES.join(" or "),
            app_dir.display()
        )));
    };
    let path = app_dir.join(file);
    let format = ManifestFormat::from_file_name(file);
    let text = fs
        .read_to_string(&path)
        .map_err(|e| manifest_err(format!("{e:#}")))?;
    let synced = manifest::resync_app_name(&text, format, app_name).map_err(manifest_err)?;
    fs.write(&path, synced.clone())
        .map_err(|e| manifest_err(format!("{e:#}")))?;
    manifest::parse(&synced, format).map_err(manifest_err)
}

/// Resolve the venv and interpreter, creating the venv when it is missing.
async fn prepare_runtime(
    host: &impl DeviceHost,
    spec: &DeploySpec,
    manifest: &FrameworkManifest,
    app_dir: &Path,
) -> Result<(String, Option<PathBuf>), DeployError> {
    let settings = host.settings();
    match manifest.runtime() {
        Runtime::Go => Ok((String::new(), None)),
        Runtime::Other(raw) => Err(DeployError::Manifest(format!("unsupported runtime {raw:?}"))),
        Runtime::Python(version) => {
            let venv_name = if spec.venv_name.is_empty() || spec.venv_name == APP_STORE_VENV {
                manifest.spec.env.virtual_env.clone()
            } else {
                spec.venv_name.clone()
            };
            if venv_name.is_empty() {
                return Err(DeployError::Manifest("no virtual environment declared".into()));
            }
            if !venv::exists(host, &venv_name) {
                create_venv_for(host, &venv_name, &version, manifest, app_dir).await?;
            }
            let python = settings.paths.venv_python(&venv_name, settings.platform);
            Ok((venv_name, Some(python)))
        }
    }
}

async fn create_venv_for(
    host: &impl DeviceHost,
    venv_name: &str,
    version: &str,
    manifest: &FrameworkManifest,
    app_dir: &Path,
) -> Result<(), DeployError> {
    tracing::warn!(venv = %venv_name, "venv not found, creating it");
    let package = manifest.spec.env.package.trim();
    let req_file = app_dir.join(package);
    let packages = if !package.is_empty() && is_safe_relative_path(package) && host.fs().exists(&req_file) {
        Requirements::File(&req_file)
    } else {
        Requirements::Text("")
    };
    let created = match venv::create(host, venv_name, version, packages).await {
        Ok(message) => venv::install_default_packages(host, venv_name).await.map(|()| message),
        Err(e) => Err(e),
    };
    let message = match created {
        Ok(m) => m,
        Err(e) => {
            if venv::exists(host, venv_name) {
                venv::delete(host, venv_name).ok();
            }
            return Err(e.into());
        }
    };

    let mut result = CommandResult::new("virtualEnv", "venvCreate");
    result.venv_name = venv_name.to_string();
    result.venv_requirement = read_requirements(host, app_dir, manifest);
    result.message = message;
    let envelope = ResultEnvelope::single(
        &host.settings().device.asset_code,
        &uuid::Uuid::new_v4().to_string(),
        result,
        Status::ok(),
    );
    publish_json(host, &host.topics().self_deploy(), &envelope).await;
    Ok(())
}

fn read_requirements(host: &impl DeviceHost, app_dir: &Path, manifest: &FrameworkManifest) -> String {
    let package = manifest.spec.env.package.trim();
    if package.is_empty() || !is_safe_relative_path(package) {
        return String::new();
    }
    host.fs()
        .read_to_string(&app_dir.join(package))
        .unwrap_or_default()
}

fn read_error_log(host: &impl DeviceHost, app_dir: &Path) -> String {
    match host.fs().read_to_string(&app_dir.join(ERROR_LOG)) {
        Ok(log) => log,
        Err(e) => {
            tracing::warn!(dir = %app_dir.display(), error = %format!("{e:#}"), "no error log");
            String::new()
        }
    }
}

// ── Inference extras ─────────────────────────────────────────────────────────

/// Resolve the weight file named by `key` inside `parameter`.
///
/// # Errors
///
/// Returns [`DeployError::Weight`] if the key is missing, not a string, or
/// points outside the application directory.
pub fn weight_file(parameter: &Map<String, Value>, key: &str) -> Result<String, DeployError> {
    if key.is_empty() {
        return Err(DeployError::Weight("Cannot found 'modelFileKey' Key.".into()));
    }
    let name = patch::lookup(parameter, key)
        .and_then(Value::as_str)
        .ok_or_else(|| DeployError::Weight(format!("Cannot found '{key}' Key.")))?;
    if !is_safe_relative_path(name) {
        return Err(DeployError::Weight(format!("Filename is invalid: {name}")));
    }
    Ok(name.to_string())
}

/// Download the weight file named by `key` into `app_dir`.
///
/// # Errors
///
/// Fails when the key cannot be resolved or the download fails.
pub async fn fetch_weight(
    host: &impl DeviceHost,
    app_dir: &Path,
    model_url: &str,
    key: &str,
    parameter: &Map<String, Value>,
) -> Result<PathBuf, DeployError> {
    let file = weight_file(parameter, key)?;
    let dest = app_dir.join(&file);
    if let Some(parent) = dest.parent() {
        host.fs()
            .create_dir_all(parent)
            .map_err(|e| DeployError::Weight(format!("{e:#}")))?;
    }
    let size = host
        .artifacts()
        .download(model_url, &dest)
        .await
        .map_err(|e| DeployError::Download(format!("{e:#}")))?;
    tracing::info!(file = %dest.display(), size, "weight file downloaded");
    Ok(dest)
}

async fn install_inference(host: &impl DeviceHost, app_dir: &Path, inf: &InferenceSpec) -> Result<(), DeployError> {
    for dir in INFERENCE_DIRS {
        host.fs()
            .create_dir_all(&app_dir.join(dir))
            .map_err(|e| DeployError::Weight(format!("{e:#}")))?;
    }
    fetch_weight(host, app_dir, &inf.model_url, &inf.model_file_key, &inf.parameter).await?;
    config_patch::patch_file(host.fs(), &app_dir.join(APP_CONFIG_FILE), &inf.parameter)?;
    Ok(())
}

// ── Containers ───────────────────────────────────────────────────────────────

/// Pull, create, and start a container, then register it.
///
/// # Errors
///
/// Guard failures leave the device untouched; engine failures need rollback.
pub async fn deploy_container(host: &impl DeviceHost, info: &ContainerInfo) -> Result<Deployed, DeployError> {
    guard_new_app(host, &info.app_name, &info.app_id).await?;
    let app = target(host, &info.app_name, &info.app_id, "");
    let containers = host.containers();
    let engine = |e: anyhow::Error| DeployError::Service(format!("{e:#}"));

    tracing::info!(app = %info.app_name, image = %info.image, "deploying container");
    containers.pull(&info.image).await.map_err(engine)?;
    containers
        .create(&ContainerSpec {
            name: app.container_name(),
            image: info.image.clone(),
            env: info.options.env.clone(),
            ports: info.options.ports.clone(),
        })
        .await
        .map_err(engine)?;
    let backend = Backend::for_managed(host, Managed::Container);
    backend.start(&app).await.map_err(engine)?;
    host.registry()
        .add(AppRecord::container(&info.app_name, &info.app_id))
        .await
        .map_err(|e| DeployError::Registry(format!("{e:#}")))?;
    let pid = backend.resolve_pid(&app).await.map_err(|e| DeployError::NotRunning(format!("{e:#}")))?;
    Ok(Deployed {
        app_name: info.app_name.clone(),
        app_id: info.app_id.clone(),
        pid: pid_value(pid),
        size: UNKNOWN,
        app_repo_path: info.image.clone(),
        venv_name: String::new(),
        venv_requirement: String::new(),
        inference: None,
    })
}

// ── Delete / Start / Stop ────────────────────────────────────────────────────

/// Stop and deregister an application, remove its directory, then drop its record.
///
/// Every step but the last is best-effort.
async fn teardown(host: &impl DeviceHost, record: &AppRecord) -> Result<(), DeployError> {
    let app = target_for(host, record);
    let backend = Backend::for_managed(host, record.managed);
    if let Err(e) = backend.stop(&app).await {
        tracing::warn!(app = %record.app_name, error = %format!("{e:#}"), "stop failed during delete");
    }
    if let Err(e) = backend.remove(&app).await {
        tracing::warn!(app = %record.app_name, error = %format!("{e:#}"), "deregister failed during delete");
    }
    if host.fs().exists(&app.dir) {
        if let Err(e) = host.fs().remove_dir_all(&app.dir) {
            tracing::warn!(dir = %app.dir.display(), error = %format!("{e:#}"), "cannot remove application directory");
        }
    }
    host.registry()
        .remove_by_name(&record.app_name)
        .await
        .map_err(|e| DeployError::Registry(format!("{e:#}")))?;
    tracing::info!(app = %record.app_name, "application removed");
    Ok(())
}

/// Delete a registered application.
///
/// # Errors
///
/// Returns [`DeployError::NotFound`] when `name` is not registered.
pub async fn delete(host: &impl DeviceHost, name: &str) -> Result<AppRecord, DeployError> {
    let record = find_record(host, name)
        .await
        .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
    teardown(host, &record).await?;
    Ok(record)
}

/// Delete every application of a group, returning the removed records.
///
/// # Errors
///
/// Returns [`DeployError::NotFound`] when the group has no members.
pub async fn delete_group(host: &impl DeviceHost, app_group_id: &str) -> Result<Vec<AppRecord>, DeployError> {
    let records = host
        .registry()
        .find_by_group(app_group_id)
        .await
        .map_err(|e| DeployError::Registry(format!("{e:#}")))?;
    if records.is_empty() {
        return Err(DeployError::NotFound(app_group_id.to_string()));
    }
    let mut first_err = None;
    for record in &records {
        if let Err(e) = teardown(host, record).await {
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(records),
    }
}

/// Start a registered application and report its pid.
///
/// # Errors
///
/// [`DeployError::NotFound`] for unknown names, [`DeployError::Service`] when
/// the backend refuses, [`DeployError::NotRunning`] when no process came up.
pub async fn start(host: &impl DeviceHost, name: &str) -> Result<(AppRecord, i64), DeployError> {
    let record = find_record(host, name)
        .await
        .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
    let app = target_for(host, &record);
    let backend = Backend::for_managed(host, record.managed);
    backend
        .start(&app)
        .await
        .map_err(|e| DeployError::Service(format!("{e:#}")))?;
    let pid = backend
        .resolve_pid(&app)
        .await
        .map_err(|e| DeployError::NotRunning(format!("{e:#}")))?;
    tracing::info!(app = %name, "application started");
    Ok((record, pid_value(pid)))
}

/// Stop a registered application.
///
/// # Errors
///
/// [`DeployError::NotFound`] for unknown names, [`DeployError::Service`] when
/// the backend refuses.
pub async fn stop(host: &impl DeviceHost, name: &str) -> Result<AppRecord, DeployError> {
    let record = find_record(host, name)
        .await
        .ok_or_else(|| DeployError::NotFound(name.to_string()))?;
    Backend::for_managed(host, record.managed)
        .stop(&target_for(host, &record))
        .await
        .map_err(|e| DeployError::Service(format!("{e:#}")))?;
    tracing::info!(app = %name, "application stopped");
    Ok(record)
}

/// Status for a failed deploy-family command.
#[must_use]
pub fn failure_status(err: &DeployError) -> Status {
    Status::failed(err.status_code(), err.to_string())
}
