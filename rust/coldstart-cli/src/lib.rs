//! Coldstart CLI library.
//!
//! Shared pieces of the `coldstart` binary: argument parsing, config file
//! discovery, logging setup and report rendering.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;

pub use app::{run, Cli};
pub use config::ColdstartConfig;
pub use error::{format_error_chain, CliError};
