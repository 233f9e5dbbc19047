//! Structural tests for the layer boundaries.
//!
//! These scan source files: `domain` stays pure, `application` reaches the
//! outside world only through its ports, and `infra` never prints.

use std::path::{Path, PathBuf};

fn src(sub: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(sub)
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and report whether a line sits inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// `(relative path, line number, line)` for every non-test, non-comment line
/// under `dir` containing one of `needles`.
fn find(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut hits = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.starts_with('*') {
                continue;
            }
            if needles.iter().any(|n| line.contains(n)) {
                hits.push(format!("{rel}:{}: {trimmed}", i + 1));
            }
        }
    }
    hits
}

#[test]
fn domain_does_no_io() {
    let violations = find(
        &src("domain"),
        &[
            "tokio::",
            "std::fs",
            "std::process",
            "std::net",
            "crate::infra",
            "crate::application",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_never_imports_infra() {
    let violations = find(&src("application"), &["crate::infra", "crate::app::"]);
    assert!(
        violations.is_empty(),
        "application/ must go through ports:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_do_not_spawn_processes_or_touch_the_network() {
    let violations = find(
        &src("application").join("services"),
        &["std::process::Command", "tokio::process", "reqwest::", "rumqttc::"],
    );
    assert!(
        violations.is_empty(),
        "services must use CommandRunner, ArtifactStore and Publisher:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_concrete_adapters_in_service_signatures() {
    let concrete = [
        "TokioCommandRunner",
        "JsonRegistryStore",
        "JsonDeviceStore",
        "HttpArtifactStore",
        "MqttPublisher",
    ];
    let violations: Vec<_> = find(&src("application"), &concrete)
        .into_iter()
        .filter(|l| l.contains("fn "))
        .collect();
    assert!(
        violations.is_empty(),
        "use trait bounds instead of concrete adapters:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = find(&src("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must log through tracing:\n{}",
        violations.join("\n")
    );
}
