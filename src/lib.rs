//! iot-device-client runs a set of long-running device features (jobs, secure
//! tunneling, device defender) on a shared connection. It resolves a layered
//! configuration, starts the enabled features in order and coordinates a
//! single clean shutdown when the features stop or the process is interrupted.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Constants shared across the crate.
pub mod constants;

/// Error handling.
pub mod error;

/// Feature contract and notification channel.
pub mod feature;

/// Built-in features.
pub mod features;

/// Logging setup.
pub mod logging;

/// Feature lifecycle orchestration.
pub mod orchestrator;

/// Shared connection management.
pub mod resources;

/// Signal handling.
pub mod signals;

#[cfg(test)]
mod test_utils;
