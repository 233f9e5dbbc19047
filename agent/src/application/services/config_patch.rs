//! Application service — apply and read application configuration files.
//!
//! The merge itself is pure (`domain::patch`); this module owns the read and
//! the commit-on-success write.

use std::path::Path;

use serde_json::{Map, Value};

use crate::application::ports::LocalFs;
use crate::domain::patch;
use crate::domain::{ConfigReadError, PatchError};

/// Merge `parameter` into the JSON object stored at `path`.
///
/// The file is rewritten atomically, and only when the whole merge succeeded.
/// Returns the patch fragment re-serialized as applied.
///
/// # Errors
///
/// Returns [`PatchError::TypeMismatch`] without touching the file when a
/// patch value does not fit the target's shape, and read/parse/write errors
/// otherwise.
pub fn patch_file(
    fs: &impl LocalFs,
    path: &Path,
    parameter: &Map<String, Value>,
) -> Result<String, PatchError> {
    let shown = path.display().to_string();
    let text = fs.read_to_string(path).map_err(|e| PatchError::Read {
        path: shown.clone(),
        reason: format!("{e:#}"),
    })?;
    let doc: Value = serde_json::from_str(&text).map_err(|e| PatchError::Parse {
        path: shown.clone(),
        reason: e.to_string(),
    })?;
    let Value::Object(target) = doc else {
        return Err(PatchError::NotAnObject { path: shown });
    };

    let merged = patch::merge(&target, parameter)?;
    let rendered = patch::render(&merged).map_err(|e| PatchError::Write {
        path: shown.clone(),
        reason: e.to_string(),
    })?;
    fs.write_atomic(path, &rendered)
        .map_err(|e| PatchError::Write {
            path: shown.clone(),
            reason: format!("{e:#}"),
        })?;
    tracing::info!(file = %shown, keys = parameter.len(), "configuration patched");

    serde_json::to_string(parameter).map_err(|e| PatchError::Write {
        path: shown,
        reason: e.to_string(),
    })
}

/// Parse every `*.json` file directly inside `dir`, keyed by file name.
///
/// Files that are not valid JSON are skipped with a warning.
///
/// # Errors
///
/// Returns [`ConfigReadError::NotFound`] if `dir` does not exist.
pub fn read_configs(fs: &impl LocalFs, dir: &Path) -> Result<Map<String, Value>, ConfigReadError> {
    if !fs.exists(dir) {
        return Err(ConfigReadError::NotFound(dir.display().to_string()));
    }
    let names = fs
        .list_dir(dir)
        .map_err(|e| ConfigReadError::Io(format!("{e:#}")))?;
    let mut configs = Map::new();
    for name in names.into_iter().filter(|n| n.ends_with(".json")) {
        let path = dir.join(&name);
        let text = match fs.read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %format!("{e:#}"), "cannot read config");
                continue;
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(doc) => {
                configs.insert(name, doc);
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping invalid config"),
        }
    }
    Ok(configs)
}
