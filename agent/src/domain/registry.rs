//! Application registry model: records and pure list operations.
//!
//! The on-disk shape is `{"AppInfoList": [ {"AppName": ..}, .. ]}`, shared
//! with other on-device tools, hence the PascalCase keys.

use serde::{Deserialize, Serialize};

use crate::domain::error::RegistryError;

/// Runtime backend that owns an application's process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Managed {
    /// OS service manager (systemd, Windows SCM).
    #[default]
    #[serde(rename = "service", alias = "systemd")]
    Service,
    /// Container engine.
    #[serde(rename = "container", alias = "dockerd")]
    Container,
}

/// Model deployed with an inference application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceInfo {
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub model_version: i64,
}

/// One installed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    #[serde(rename = "AppName")]
    pub app_name: String,
    #[serde(rename = "AppId", default)]
    pub app_id: String,
    #[serde(rename = "AppVenv", default)]
    pub app_venv: String,
    #[serde(rename = "Managed", default)]
    pub managed: Managed,
    #[serde(rename = "AppGroupId", default, skip_serializing_if = "String::is_empty")]
    pub app_group_id: String,
    #[serde(rename = "AppInference", default, skip_serializing_if = "Option::is_none")]
    pub inference: Option<InferenceInfo>,
}

impl AppRecord {
    #[must_use]
    pub fn service(app_name: &str, app_id: &str, app_venv: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            app_id: app_id.to_string(),
            app_venv: app_venv.to_string(),
            managed: Managed::Service,
            app_group_id: String::new(),
            inference: None,
        }
    }

    #[must_use]
    pub fn container(app_name: &str, app_id: &str) -> Self {
        Self {
            managed: Managed::Container,
            ..Self::service(app_name, app_id, "")
        }
    }
}

/// The whole registry file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(rename = "AppInfoList", default)]
    pub apps: Vec<AppRecord>,
}

impl RegistryDocument {
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&AppRecord> {
        self.apps.iter().find(|r| r.app_name == name)
    }

    /// Append `record`, keeping names unique.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyExists`] if a record with the same name exists.
    pub fn add(&mut self, record: AppRecord) -> Result<(), RegistryError> {
        if self.find(&record.app_name).is_some() {
            return Err(RegistryError::AlreadyExists(record.app_name));
        }
        self.apps.push(record);
        Ok(())
    }

    /// Remove the record named `name`, returning its id.
    pub fn remove_by_name(&mut self, name: &str) -> Option<String> {
        let idx = self.apps.iter().position(|r| r.app_name == name)?;
        Some(self.apps.remove(idx).app_id)
    }

    /// Records belonging to `group_id`, in registry order.
    #[must_use]
    pub fn find_by_group(&self, group_id: &str) -> Vec<AppRecord> {
        if group_id.is_empty() {
            return Vec::new();
        }
        self.apps
            .iter()
            .filter(|r| r.app_group_id == group_id)
            .cloned()
            .collect()
    }

    /// Names of applications running inside `venv`.
    #[must_use]
    pub fn users_of_venv(&self, venv: &str) -> Vec<String> {
        self.apps
            .iter()
            .filter(|r| r.app_venv == venv)
            .map(|r| r.app_name.clone())
            .collect()
    }
}
