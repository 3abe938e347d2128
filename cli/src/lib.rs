//! Terminal host for the tasks client core.
//!
//! Supplies the real HTTP [`Transport`](tasks_core::Transport) (`ureq`),
//! resolves configuration, and renders each command as a page.

pub mod commands;
pub mod config;
pub mod transport;

pub use commands::{run, Cli, CliError, Command};
pub use config::{Config, ConfigError, SettingsArgs};
pub use transport::UreqTransport;
