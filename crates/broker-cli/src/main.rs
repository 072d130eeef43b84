//! `service-broker`: drive the broker lifecycle from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "service-broker")]
#[command(about = "Multi-zone RabbitMQ service broker")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "broker.yaml")]
    config: PathBuf,

    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Validate configuration file
    Validate,

    /// Print the service catalog
    Catalog,

    /// Provision a service instance
    Provision {
        /// Instance identifier
        instance_id: String,

        /// Home zone (defaults to the first configured zone)
        #[arg(short, long)]
        zone: Option<String>,
    },

    /// Deprovision a service instance
    Deprovision {
        /// Instance identifier
        instance_id: String,

        /// Home zone (defaults to the first configured zone)
        #[arg(short, long)]
        zone: Option<String>,
    },

    /// Issue credentials for a service instance
    Bind {
        /// Instance identifier
        instance_id: String,

        /// Binding identifier
        binding_id: String,

        /// Zone to bind in (defaults to the first configured zone)
        #[arg(short, long)]
        zone: Option<String>,
    },

    /// Revoke credentials of a service instance
    Unbind {
        /// Instance identifier
        instance_id: String,

        /// Binding identifier
        binding_id: String,

        /// Zone to unbind in (defaults to the first configured zone)
        #[arg(short, long)]
        zone: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.command == Commands::Validate {
        commands::logging::init(cli.verbose, None);
        commands::validate::run(&cli.config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = broker_config::parser::parse_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    commands::logging::init(cli.verbose, config.settings.log_level.as_deref());

    let request = commands::lifecycle::request_for(cli.command);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(commands::lifecycle::run(&config, request))
}
