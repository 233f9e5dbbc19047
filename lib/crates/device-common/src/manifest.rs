// lib/crates/device-common/src/manifest.rs

use serde::{Deserialize, Serialize};

/// Run file used when a manifest leaves `spec.runFile` empty.
pub const DEFAULT_RUN_FILE: &str = "main.py";

/// Per-application descriptor shipped inside an artifact (`framework.yaml`
/// or `framework.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameworkManifest {
    #[serde(default)]
    pub version: Option<serde_json::Value>,
    #[serde(default)]
    pub spec: FrameworkSpec,
    #[serde(default)]
    pub stackbase: Stackbase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference: Option<InferenceSource>,
}

/// Spec section of a framework manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkSpec {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_type: String,
    #[serde(default)]
    pub run_file: String,
    #[serde(default)]
    pub env: FrameworkEnv,
}

/// Runtime environment an application expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkEnv {
    #[serde(default)]
    pub bin: String,
    /// e.g. `python3.9`, `go`.
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub virtual_env: String,
    #[serde(default)]
    pub home_user: String,
    /// Requirements file name, relative to the application directory.
    #[serde(default)]
    pub package: String,
}

/// Source repository the artifact was built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stackbase {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub repo_name: String,
}

/// Model weight location for inference applications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceSource {
    #[serde(default)]
    pub weight_file: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

/// Interpreter family resolved from `spec.env.runtime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// Python with the requested version (`"3.9"`), possibly empty.
    Python(String),
    /// Self-contained binary.
    Go,
    Other(String),
}

impl Runtime {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.contains("python") {
            Runtime::Python(lowered.replace("python", "").trim().to_string())
        } else if lowered == "go" || lowered.starts_with("go") {
            Runtime::Go
        } else {
            Runtime::Other(raw.to_string())
        }
    }
}

impl FrameworkManifest {
    /// Run file to execute, falling back to [`DEFAULT_RUN_FILE`].
    #[must_use]
    pub fn run_file(&self) -> &str {
        if self.spec.run_file.trim().is_empty() {
            DEFAULT_RUN_FILE
        } else {
            self.spec.run_file.trim()
        }
    }

    #[must_use]
    pub fn runtime(&self) -> Runtime {
        Runtime::parse(&self.spec.env.runtime)
    }
}
