//! Shared test helpers: process outputs, artifact archives, and envelopes.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::process::{ExitStatus, Output};

use device_common::CommandEnvelope;
use serde_json::Value;

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code (0 = success, non-zero = failure).
///
/// On Unix the raw wait-status encodes the exit code in bits 8–15, so we shift.
/// On Windows `ExitStatusExt::from_raw` takes the exit code directly.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

// ── Output constructors ──────────────────────────────────────────────────────

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────────

/// Manifest of a python application running in `venv`.
pub fn python_manifest(venv: &str) -> String {
    format!(
        "version: 1\nspec:\n  appName: placeholder\n  appType: REQUEST\n  runFile: main.py\n  env:\n    bin: python\n    runtime: python3.9\n    virtualEnv: {venv}\n    package: requirements.txt\n"
    )
}

/// Zip archive holding `files` under the top-level directory `root`.
pub fn app_zip(root: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    zip.add_directory(format!("{root}/"), options)
        .expect("add root dir");
    for (name, content) in files {
        zip.start_file(format!("{root}/{name}"), options)
            .expect("start file");
        zip.write_all(content.as_bytes()).expect("write file");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Archive of a deployable python application.
pub fn python_app_zip(root: &str, venv: &str) -> Vec<u8> {
    app_zip(
        root,
        &[
            ("framework.yaml", &python_manifest(venv)),
            ("main.py", "print('hello')\n"),
            ("requirements.txt", "requests==2.31.0\n"),
            ("config.json", "{\n\t\"threshold\": 0.5,\n\t\"label\": \"cam\"\n}"),
        ],
    )
}

// ── Envelopes ────────────────────────────────────────────────────────────────

pub fn envelope(cmd_type: &str, sub: &str, info: Value) -> CommandEnvelope {
    CommandEnvelope {
        cmd_type: cmd_type.to_string(),
        sub_cmd_type: sub.to_string(),
        asset_code: "A1".to_string(),
        request_id: "req-1".to_string(),
        cmd_info: info,
    }
}

pub fn payload(cmd_type: &str, sub: &str, info: Value) -> Vec<u8> {
    serde_json::to_vec(&envelope(cmd_type, sub, info)).expect("serialize envelope")
}
