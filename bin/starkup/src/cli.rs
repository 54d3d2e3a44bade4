use std::path::PathBuf;

use clap::{Parser, Subcommand};
use starkup_deploy::StarkupConfig;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "starkup")]
#[command(
    author,
    version,
    about = "Run a local Starknet devnet, deploy a contract to it and interact with it"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "STARKUP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Starkup.toml configuration file (or the directory holding one).
    ///
    /// Defaults to ./Starkup.toml when it exists.
    #[arg(long, alias = "conf", env = "STARKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host of the devnet node.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port of the devnet node.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Root of the contract package.
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path of the deployment record.
    #[arg(long, global = true)]
    pub record: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the devnet if needed, then build, declare and deploy the contract.
    Deploy,
    /// Interact with the deployed contract.
    Interact,
    /// Build the contract, run its tests and check the devnet is reachable.
    Check,
    /// Show the current deployment record.
    Info,
    /// Manage the devnet node.
    Devnet {
        #[command(subcommand)]
        action: DevnetCommand,
    },
    /// Write the effective configuration to a file.
    Init {
        /// Where to write the configuration.
        #[arg(default_value = starkup_deploy::CONFIG_FILENAME)]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum DevnetCommand {
    /// Start the node in the background, or reuse a running one.
    Start,
    /// Report whether the node is answering.
    Status,
    /// Stop every node process bound to the configured port.
    Stop,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut StarkupConfig) {
        if let Some(host) = &self.host {
            config.devnet.host = host.clone();
        }
        if let Some(port) = self.port {
            config.devnet.port = port;
        }
        if let Some(project_dir) = &self.project_dir {
            config.scarb.project_dir = project_dir.clone();
        }
        if let Some(record) = &self.record {
            config.record_path = record.clone();
        }
    }
}
