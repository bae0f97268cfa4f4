//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mediastore - maintain an identity-addressed media store
#[derive(Parser, Debug)]
#[command(name = "mediastore")]
#[command(about = "Publish, inspect, read and clean identity-addressed media files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Load this configuration file instead of the layered defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, default_value = "human")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pending, deleted and obsolescence sweeps over every slot
    Clean {
        /// Override CleanPendingDaysToKeep
        #[arg(long)]
        pending_days: Option<i64>,

        /// Override CleanDeletedDaysToKeep
        #[arg(long)]
        deleted_days: Option<i64>,

        /// Override CleanObsoleteDaysToKeep
        #[arg(long)]
        obsolete_days: Option<i64>,
    },

    /// Publish a file as the newest version of an identity
    Publish {
        /// Slot descriptor group
        group: String,

        /// Slot name
        name: String,

        /// File to publish
        file: PathBuf,

        /// Data identifier
        id: String,
    },

    /// Describe the current version of an identity
    Info {
        /// Slot descriptor group
        group: String,

        /// Slot name
        name: String,

        /// Data identifier
        id: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Write the plaintext of the current version to a file
    Read {
        /// Slot descriptor group
        group: String,

        /// Slot name
        name: String,

        /// Data identifier
        id: String,

        /// Destination file
        out: PathBuf,
    },
}

/// Output format for command results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Human,
    /// JSON object
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Human,
    /// One JSON object per event
    Json,
}
