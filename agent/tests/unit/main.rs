//! Unit tests for the device control agent.
//!
//! These drive the application services through a fake host: recorded
//! commands and publishes, real registry and config files in a temp dir.

mod architecture;
mod config_service;
mod helpers;
mod startup_service;
mod venv_service;
mod worker_service;
