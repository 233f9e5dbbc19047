//! Integration tests for device-control
//!
//! These exercise the real adapters (files, zip archives, child processes)
//! and spawn the actual binary.

mod cli_tests;
mod command_runner;
mod stores;
