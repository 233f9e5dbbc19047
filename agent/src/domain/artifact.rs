//! Artifact naming helpers — pure functions over the download URL.

use url::Url;

/// Archive file name: the last path segment of `file_url`.
#[must_use]
pub fn archive_name(file_url: &str) -> Option<String> {
    let url = Url::parse(file_url).ok()?;
    let name = url.path_segments()?.rfind(|s| !s.is_empty())?;
    Some(name.to_string())
}

/// Repository reference for an artifact:
/// `{scheme}://{host}/{seg1}/{seg2}:{archive name without .zip}`.
///
/// Returns an empty string for URLs with fewer than two path segments.
#[must_use]
pub fn repo_path(file_url: &str) -> String {
    let Ok(url) = Url::parse(file_url) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let (Some(first), Some(second), Some(last)) = (segments.first(), segments.get(1), segments.last())
    else {
        return String::new();
    };
    let tag = last.strip_suffix(".zip").unwrap_or(last);
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    format!("{}://{authority}/{first}/{second}:{tag}", url.scheme())
}

/// Directory name for an installed application.
#[must_use]
pub fn app_dir_name(app_name: &str, app_id: &str) -> String {
    format!("{app_name}_{app_id}")
}

/// Whether `name` is safe to use as a single path component.
#[must_use]
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "*"
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Whether `path` stays inside the directory it is joined to.
#[must_use]
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with(['/', '\\'])
        && !path.contains(':')
        && path.split(['/', '\\']).all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}
