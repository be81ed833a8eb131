//! Command-line front end: argument parsing, environment configuration and
//! the wiring of one polling run.
pub mod cli;
pub mod config;
pub mod run;

pub use cli::Cli;
pub use config::{AppConfig, ConfigError};
pub use run::{execute, Services};
