//! Mediastore CLI binary.
//!
//! This binary provides command-line access to a configured media store:
//! - Run the garbage collection sweeps
//! - Publish, inspect and read media files

use clap::Parser;
use mediastore::MediaStoreConfig;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, LogFormat, clean, info, publish, read};

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    match cli.log_format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    let config = match &cli.config {
        Some(path) => MediaStoreConfig::from_file(path)?,
        None => MediaStoreConfig::load()?,
    };
    tracing::debug!(
        root = %config.root().display(),
        application = %config.application(),
        role = %config.role(),
        "Loaded configuration"
    );

    // Execute the requested command
    match cli.command {
        Commands::Clean {
            pending_days,
            deleted_days,
            obsolete_days,
        } => {
            clean(&config, pending_days, deleted_days, obsolete_days)?;
        }

        Commands::Publish {
            group,
            name,
            file,
            id,
        } => {
            publish(&config, &group, &name, &file, &id).await?;
        }

        Commands::Info {
            group,
            name,
            id,
            format,
        } => {
            info(&config, &group, &name, &id, format)?;
        }

        Commands::Read {
            group,
            name,
            id,
            out,
        } => {
            read(&config, &group, &name, &id, &out).await?;
        }
    }

    Ok(())
}
