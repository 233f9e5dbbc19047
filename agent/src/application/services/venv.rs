//! Application service — virtual environment lifecycle.
//!
//! Environments are plain directories under the venv root; their presence on
//! disk is the only index. All I/O is routed through the injected host ports.

use std::path::Path;

use crate::application::ports::{CommandRunner, DeviceHost, LocalFs, RegistryStore};
use crate::application::services::backend::combined_output;
use crate::domain::artifact::is_safe_component;
use crate::domain::config::BASE_VENV;
use crate::domain::requirements::{self, default_packages};
use crate::domain::{Platform, RegistryDocument, VenvError};

pub const CREATED: &str = "Created V-Env.";
pub const DELETED: &str = "Deleted V-Env.";
pub const UPDATED: &str = "Updated V-Env.";

/// Where the packages of a new environment come from.
#[derive(Debug, Clone, Copy)]
pub enum Requirements<'a> {
    /// Requirements text sent with the command.
    Text(&'a str),
    /// Requirements file shipped inside an application.
    File(&'a Path),
}

fn io(e: &anyhow::Error) -> VenvError {
    VenvError::Io(format!("{e:#}"))
}

/// Whether the environment `name` exists.
pub fn exists(host: &impl DeviceHost, name: &str) -> bool {
    host.fs().exists(&host.settings().paths.venv(name))
}

/// Run an environment tool, mapping a spawn failure or non-zero exit to `VenvError::Tool`.
async fn run_tool(
    host: &impl DeviceHost,
    step: &str,
    program: &Path,
    args: &[&str],
) -> Result<(), VenvError> {
    let program = program.to_string_lossy();
    tracing::debug!(step = %step, program = %program, ?args, "running environment tool");
    let output = host
        .runner()
        .run_with_timeout(&program, args, host.settings().install_timeout)
        .await
        .map_err(|e| VenvError::Tool {
            step: step.to_string(),
            output: format!("{e:#}"),
        })?;
    if !output.status.success() {
        return Err(VenvError::Tool {
            step: step.to_string(),
            output: combined_output(&output),
        });
    }
    Ok(())
}

/// Write normalized requirements into the environment and install them.
async fn install_requirements(
    host: &impl DeviceHost,
    name: &str,
    lines: &[String],
) -> Result<(), VenvError> {
    let paths = &host.settings().paths;
    let req_file = paths.venv(name).join("requirements.txt");
    host.fs()
        .write(&req_file, requirements::render(lines))
        .map_err(|e| io(&e))?;
    if lines.is_empty() {
        return Ok(());
    }
    let pip = paths.venv_pip(name, host.settings().platform);
    let req = req_file.to_string_lossy();
    run_tool(host, "pip install", &pip, &["install", "-r", &req]).await
}

/// Create environment `name` with the given interpreter version and packages.
///
/// Steps:
/// 1. Create the interpreter with conda
/// 2. Write the normalized requirements file
/// 3. Install it with the environment's pip
///
/// A failure after step 1 leaves the partial environment on disk; callers
/// that own the request delete it.
///
/// # Errors
///
/// Fails if the name is unsafe, the environment exists, or a tool fails.
pub async fn create(
    host: &impl DeviceHost,
    name: &str,
    runtime_version: &str,
    packages: Requirements<'_>,
) -> Result<String, VenvError> {
    if !is_safe_component(name) {
        return Err(VenvError::InvalidName);
    }
    if exists(host, name) {
        return Err(VenvError::AlreadyExists(name.to_string()));
    }
    let settings = host.settings();
    let paths = &settings.paths;
    host.fs()
        .create_dir_all(&paths.venv_dir)
        .map_err(|e| io(&e))?;

    // Step 1: Create the interpreter.
    tracing::info!(venv = %name, version = %runtime_version, "creating virtual environment");
    let env_path = paths.venv(name);
    let env_arg = env_path.to_string_lossy();
    let python = if runtime_version.is_empty() {
        "python".to_string()
    } else {
        format!("python={runtime_version}")
    };
    run_tool(
        host,
        "conda create",
        &paths.conda(settings.platform),
        &["create", "-p", &env_arg, &python, "-y"],
    )
    .await?;

    // Step 2-3: Requirements.
    let text = match packages {
        Requirements::Text(t) => t.to_string(),
        Requirements::File(p) => host.fs().read_to_string(p).map_err(|e| io(&e))?,
    };
    install_requirements(host, name, &requirements::normalize(&text)).await?;

    tracing::info!(venv = %name, "virtual environment created");
    Ok(CREATED.to_string())
}

/// Remove environment `name` from disk.
///
/// The caller must have checked that no application uses it; see [`delete_unused`].
///
/// # Errors
///
/// Fails for unsafe names, missing environments, and removal errors.
pub fn delete(host: &impl DeviceHost, name: &str) -> Result<String, VenvError> {
    if !is_safe_component(name) {
        return Err(VenvError::InvalidName);
    }
    if !exists(host, name) {
        return Err(VenvError::NotFound(name.to_string()));
    }
    host.fs()
        .remove_dir_all(&host.settings().paths.venv(name))
        .map_err(|e| io(&e))?;
    tracing::info!(venv = %name, "virtual environment deleted");
    Ok(DELETED.to_string())
}

/// Remove environment `name` unless a registered application runs in it.
///
/// # Errors
///
/// Returns [`VenvError::InUse`] without touching the disk when the environment
/// is referenced, or [`VenvError::Io`] when the registry cannot be read.
pub async fn delete_unused(host: &impl DeviceHost, name: &str) -> Result<String, VenvError> {
    if !is_safe_component(name) {
        return Err(VenvError::InvalidName);
    }
    let apps = host
        .registry()
        .load()
        .await
        .map_err(|e| VenvError::Io(format!("registry unavailable: {e:#}")))?;
    let users = RegistryDocument { apps }.users_of_venv(name);
    if !users.is_empty() {
        return Err(VenvError::InUse {
            venv: name.to_string(),
            apps: users.join(", "),
        });
    }
    delete(host, name)
}

/// Apply a diff-style package update to environment `name`.
///
/// `-pkg` lines are uninstalled; the remaining lines become the new
/// requirements file and are installed.
///
/// # Errors
///
/// Fails for missing environments and tool failures.
pub async fn update(host: &impl DeviceHost, name: &str, text: &str) -> Result<String, VenvError> {
    if !is_safe_component(name) {
        return Err(VenvError::InvalidName);
    }
    if !exists(host, name) {
        return Err(VenvError::NotFound(name.to_string()));
    }
    let plan = requirements::plan_update(text);
    let pip = host
        .settings()
        .paths
        .venv_pip(name, host.settings().platform);
    for pkg in &plan.uninstall {
        tracing::info!(venv = %name, package = %pkg, "uninstalling package");
        run_tool(host, "pip uninstall", &pip, &["uninstall", "-y", pkg]).await?;
    }
    install_requirements(host, name, &plan.install).await?;
    Ok(UPDATED.to_string())
}

/// Install the device-type default packages into environment `name`.
///
/// Skipped with a warning when no package index is configured.
///
/// # Errors
///
/// Fails when pip fails.
pub async fn install_default_packages(host: &impl DeviceHost, name: &str) -> Result<(), VenvError> {
    let settings = host.settings();
    let packages = default_packages(&settings.device.device_type, &settings.device.service_type);
    if packages.is_empty() {
        return Ok(());
    }
    let Some(index) = &settings.package_index else {
        tracing::warn!(venv = %name, "no package index configured, skipping default packages");
        return Ok(());
    };
    let url = index.url();
    let mut args = vec!["install", "--trusted-host", &index.host, "--index-url", &url];
    args.extend_from_slice(packages);
    let pip = settings.paths.venv_pip(name, settings.platform);
    run_tool(host, "default packages", &pip, &args).await
}

/// Create the shared base environment if it does not exist yet.
///
/// # Errors
///
/// Fails when the interpreter cannot create the environment.
pub async fn ensure_base(host: &impl DeviceHost) -> Result<(), VenvError> {
    if exists(host, BASE_VENV) {
        return Ok(());
    }
    let settings = host.settings();
    let paths = &settings.paths;
    host.fs()
        .create_dir_all(&paths.venv_dir)
        .map_err(|e| io(&e))?;
    let conda_python = paths.conda_bin().join("python3");
    let python = match settings.platform {
        Platform::Linux if host.fs().exists(&conda_python) => conda_python,
        Platform::Linux => Path::new("python3").to_path_buf(),
        Platform::Windows => Path::new("python").to_path_buf(),
    };
    let env_path = paths.venv(BASE_VENV);
    let env_arg = env_path.to_string_lossy();
    tracing::info!(python = %python.display(), "creating base environment");
    run_tool(host, "base venv", &python, &["-m", "venv", &env_arg]).await?;
    install_default_packages(host, BASE_VENV).await
}

/// Python interpreters shipped with conda (`python3.9`, ...).
pub fn python_versions(host: &impl DeviceHost) -> Vec<String> {
    let bin = host.settings().paths.conda_bin();
    match host.fs().list_dir(&bin) {
        Ok(names) => names
            .into_iter()
            .filter(|n| {
                n.strip_prefix("python")
                    .is_some_and(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit() || c == '.'))
            })
            .collect(),
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "no conda interpreters found");
            Vec::new()
        }
    }
}
