//! Framework manifest parsing and the post-unpack name resync.

use device_common::FrameworkManifest;

/// Manifest file names, in lookup order.
pub const MANIFEST_FILES: &[&str] = &["framework.yaml", "framework.json"];

/// Serialization of a manifest file, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".json") {
            ManifestFormat::Json
        } else {
            ManifestFormat::Yaml
        }
    }
}

/// Parse manifest text.
///
/// # Errors
///
/// Returns the parser's message if the text is not a valid manifest.
pub fn parse(text: &str, format: ManifestFormat) -> Result<FrameworkManifest, String> {
    match format {
        ManifestFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        ManifestFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    }
}

/// Rewrite `spec.appName` to `app_name`, keeping every other field as written.
///
/// # Errors
///
/// Returns the parser's message if the text is not a mapping with a `spec` mapping.
pub fn resync_app_name(text: &str, format: ManifestFormat, app_name: &str) -> Result<String, String> {
    match format {
        ManifestFormat::Yaml => {
            let mut doc: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
            let spec = doc
                .get_mut("spec")
                .and_then(serde_yaml::Value::as_mapping_mut)
                .ok_or("manifest has no spec section")?;
            spec.insert("appName".into(), app_name.into());
            serde_yaml::to_string(&doc).map_err(|e| e.to_string())
        }
        ManifestFormat::Json => {
            let mut doc: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
            let spec = doc
                .get_mut("spec")
                .and_then(serde_json::Value::as_object_mut)
                .ok_or("manifest has no spec section")?;
            spec.insert("appName".into(), app_name.into());
            serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())
        }
    }
}
