//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, service
//! managers, the docker CLI, artifact download, JSON state files, and the
//! broker client.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::app` or `crate::cli` are forbidden.

pub mod artifact;
pub mod command_runner;
pub mod device_config;
pub mod docker;
pub mod fs;
pub mod mqtt;
pub mod registry;
pub mod services;
pub mod systemd;
pub mod windows_service;
