//! Application service — swap the model weights of an inference application.

use serde_json::{Map, Value};

use crate::application::ports::DeviceHost;
use crate::application::services::config_patch;
use crate::application::services::deployment::{self, fetch_weight};
use crate::domain::DeployError;
use crate::domain::command::ModelInfo;
use crate::domain::config::APP_CONFIG_FILE;

/// Stop the application, install new weights and parameters, and start it again.
///
/// Steps:
/// 1. Stop the application
/// 2. Download the weight file named by `modelFileKey`
/// 3. Patch `config.json` with `parameter`
/// 4. Read back the application's configuration
/// 5. Start the application
///
/// The application is restarted even when steps 2-4 fail.
///
/// # Errors
///
/// Returns the first failing step's error.
pub async fn update(host: &impl DeviceHost, info: &ModelInfo) -> Result<Map<String, Value>, DeployError> {
    // Step 1: Stop.
    let record = deployment::stop(host, &info.app_name).await?;
    let app_dir = host.settings().paths.app_dir(&record.app_name, &record.app_id);
    tracing::info!(app = %info.app_name, model = %info.model_name, version = info.model_version, "updating model");

    // Steps 2-4.
    let parameter = info.parameter.clone().unwrap_or_default();
    let swapped = async {
        fetch_weight(host, &app_dir, &info.model_url, &info.model_file_key, &parameter).await?;
        config_patch::patch_file(host.fs(), &app_dir.join(APP_CONFIG_FILE), &parameter)?;
        Ok::<_, DeployError>(config_patch::read_configs(host.fs(), &app_dir)?)
    }
    .await;
    if let Err(e) = &swapped {
        tracing::error!(app = %info.app_name, error = %e, "model update failed, restarting previous model");
    }

    // Step 5: Start.
    let started = deployment::start(host, &info.app_name).await;
    let configs = swapped?;
    started?;
    Ok(configs)
}
