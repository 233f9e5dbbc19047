//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`. Every error that reaches
//! the cloud maps to an HTTP-style status code via `status_code()`.

use thiserror::Error;

pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;
pub const INTERNAL: u16 = 500;

// ── Command errors ────────────────────────────────────────────────────────────

/// Errors raised before a command reaches its handler.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("This is not the correct form.")]
    Malformed,

    #[error("This command not found.")]
    NotFound,
}

impl CommandError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            CommandError::Malformed => BAD_REQUEST,
            CommandError::NotFound => NOT_FOUND,
        }
    }
}

// ── Patch errors ──────────────────────────────────────────────────────────────

/// Errors from the JSON configuration patch engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Check [{key}] parameter")]
    TypeMismatch { key: String },

    #[error("Cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("{path} is not valid JSON: {reason}")]
    Parse { path: String, reason: String },

    #[error("{path} is not a JSON object")]
    NotAnObject { path: String },

    #[error("Cannot write {path}: {reason}")]
    Write { path: String, reason: String },
}

impl PatchError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PatchError::Write { .. } => INTERNAL,
            _ => BAD_REQUEST,
        }
    }
}

// ── Config read errors ────────────────────────────────────────────────────────

/// Errors from reading an application's configuration files.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigReadError {
    #[error("No such application directory: {0}")]
    NotFound(String),

    #[error("Cannot read configuration: {0}")]
    Io(String),
}

impl ConfigReadError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ConfigReadError::NotFound(_) => NOT_FOUND,
            ConfigReadError::Io(_) => INTERNAL,
        }
    }
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Errors from the application registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{0} already exists.")]
    AlreadyExists(String),
}

// ── Venv errors ───────────────────────────────────────────────────────────────

/// Errors from the virtual environment manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VenvError {
    #[error("Not collect value.")]
    InvalidName,

    #[error("{0} already exists.")]
    AlreadyExists(String),

    #[error("{0} does not exist.")]
    NotFound(String),

    #[error("{venv} is used by {apps}.")]
    InUse { venv: String, apps: String },

    #[error("{step} failed: {output}")]
    Tool { step: String, output: String },

    #[error("{0}")]
    Io(String),
}

impl VenvError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            VenvError::InvalidName | VenvError::AlreadyExists(_) | VenvError::Tool { .. } => {
                BAD_REQUEST
            }
            VenvError::NotFound(_) => NOT_FOUND,
            VenvError::InUse { .. } => CONFLICT,
            VenvError::Io(_) => INTERNAL,
        }
    }
}

// ── Deploy errors ─────────────────────────────────────────────────────────────

/// Errors from the deployment engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployError {
    #[error("Not collect value.")]
    InvalidName,

    #[error("{0} already exists.")]
    AlreadyExists(String),

    #[error("{0} is not installed.")]
    NotFound(String),

    #[error("App's len is zero.")]
    EmptyGroup,

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Framework manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Venv(#[from] VenvError),

    #[error("Registry: {0}")]
    Registry(String),

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Service: {0}")]
    Service(String),

    #[error("{0}")]
    NotRunning(String),

    #[error("{0} is not a supported app type.")]
    AppType(String),

    #[error("{0}")]
    Weight(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Config(#[from] ConfigReadError),
}

impl DeployError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DeployError::NotFound(_) => NOT_FOUND,
            DeployError::Venv(e) => e.status_code(),
            DeployError::Patch(e) => e.status_code(),
            DeployError::Config(e) => e.status_code(),
            DeployError::Registry(_) | DeployError::RegistryUnavailable(_) => INTERNAL,
            _ => BAD_REQUEST,
        }
    }

    /// Whether the attempted install left state that the caller must delete.
    ///
    /// Guard failures happen before anything is written and must not touch an
    /// existing install of the same name.
    #[must_use]
    pub fn needs_rollback(&self) -> bool {
        !matches!(
            self,
            DeployError::InvalidName
                | DeployError::AlreadyExists(_)
                | DeployError::NotFound(_)
                | DeployError::EmptyGroup
                | DeployError::RegistryUnavailable(_)
        )
    }
}
