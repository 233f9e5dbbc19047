//! Requirements text handling and per-device default packages.

/// Drop blank lines and `#` comments, trimming the rest.
#[must_use]
pub fn normalize(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Render normalized lines as a requirements file.
#[must_use]
pub fn render(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// A venv update: packages to remove and the requirements to (re)install.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub uninstall: Vec<String>,
    pub install: Vec<String>,
}

/// Split update text: `-pkg` lines are uninstalled, everything else installed.
///
/// Pip options such as `-r extra.txt` or `--index-url ...` stay in the install list.
#[must_use]
pub fn plan_update(text: &str) -> UpdatePlan {
    let mut plan = UpdatePlan::default();
    for line in normalize(text) {
        match removal(&line) {
            Some(pkg) => plan.uninstall.push(pkg.to_string()),
            None => plan.install.push(line),
        }
    }
    plan
}

fn removal(line: &str) -> Option<&str> {
    let pkg = line.strip_prefix('-')?;
    if pkg.is_empty() || pkg.starts_with('-') || pkg.contains(char::is_whitespace) {
        return None;
    }
    Some(pkg)
}

/// Default packages for a device, by device type and service type.
#[must_use]
pub fn default_packages(device_type: &str, service_type: &str) -> &'static [&'static str] {
    if service_type == "onprem" {
        return &["sdtcloudonprem"];
    }
    match device_type {
        "nodeq" => &["sdtcloudnodeqmqtt", "sdtcloud"],
        "ecn" | "aquarack" => &["sdtcloudpubsub", "sdtclouds3", "sdtcloud", "sdtcloudwin"],
        _ => &[],
    }
}
