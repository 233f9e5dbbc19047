//! OS service unit generation — pure functions, no I/O, no async.
//!
//! The caller is responsible for installing the returned text.

#![allow(clippy::format_push_string)]

use std::path::PathBuf;

/// What a service unit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    /// Unit name; also the application name.
    pub name: String,
    /// Working directory, the installed application directory.
    pub app_dir: PathBuf,
    /// Interpreter that runs `run_file`, or `None` for a self-contained binary.
    pub interpreter: Option<PathBuf>,
    /// Entry point relative to `app_dir`.
    pub run_file: String,
}

impl ServiceUnit {
    /// Command line for `ExecStart`.
    #[must_use]
    pub fn exec_start(&self) -> String {
        match &self.interpreter {
            Some(python) => format!("{} {}", python.display(), self.run_file),
            None => self.app_dir.join(&self.run_file).display().to_string(),
        }
    }

    /// Unit file name, e.g. `detector.service`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.service", self.name)
    }
}

/// Generate the systemd unit for `unit`.
///
/// Output goes to `app.log` / `app-error.log` inside the application directory,
/// which is where the deployment engine looks when a start fails.
#[must_use]
pub fn systemd_unit(unit: &ServiceUnit) -> String {
    let dir = unit.app_dir.display();
    let mut out = String::new();
    out.push_str("[Unit]\n");
    out.push_str(&format!("Description={}\n", unit.name));
    out.push('\n');
    out.push_str("[Service]\n");
    out.push_str(&format!("WorkingDirectory={dir}\n"));
    out.push_str(&format!("ExecStart={}\n", unit.exec_start()));
    out.push_str("Restart=always\n");
    out.push_str("RestartSec=10\n");
    out.push_str(&format!("StandardOutput=file:{dir}/app.log\n"));
    out.push_str(&format!("StandardError=file:{dir}/app-error.log\n"));
    out.push('\n');
    out.push_str("[Install]\n");
    out.push_str("WantedBy=multi-user.target\n");
    out
}

/// File the service writes its errors to.
pub const ERROR_LOG: &str = "app-error.log";
