//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the mediastore binary.

mod commands;
mod handlers;

pub use commands::{Cli, Commands, LogFormat, OutputFormat};
pub use handlers::{clean, info, publish, read};
