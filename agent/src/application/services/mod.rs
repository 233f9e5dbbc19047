//! Application services — use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`.

pub mod backend;
pub mod config_patch;
pub mod deployment;
pub mod dispatcher;
pub mod model_update;
pub mod outbound;
pub mod startup;
pub mod venv;
pub mod worker;
