//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod artifact;
pub mod command;
pub mod config;
pub mod error;
pub mod manifest;
pub mod patch;
pub mod registry;
pub mod requirements;
pub mod service_unit;

pub use command::{Command, Decoded};
pub use config::{AgentPaths, AgentSettings, DeviceProfile, PackageIndex, Platform};
pub use error::{CommandError, ConfigReadError, DeployError, PatchError, RegistryError, VenvError};
pub use registry::{AppRecord, InferenceInfo, Managed, RegistryDocument};
pub use service_unit::ServiceUnit;
