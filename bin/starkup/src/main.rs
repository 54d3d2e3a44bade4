//! starkup is a CLI tool to deploy and exercise a Starknet contract on a local devnet.

mod cli;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DevnetCommand};
use starkup_deploy::{
    CONFIG_FILENAME, ContractClient, DeployError, DeploymentPipeline, DevnetNode, NodeStatus,
    Session, SessionEnd, SessionError, StarkupConfig, SystemRunner, session::record_table,
};

/// Exit status after an interrupt.
const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
    let mut config = StarkupConfig::load(Some(&config_path))?;
    cli.apply_overrides(&mut config);

    tracing::debug!(?config, "Configuration loaded");

    match cli.command {
        Command::Deploy => deploy(&config).await,
        Command::Interact => interact(&config).await,
        Command::Check => check(&config).await,
        Command::Info => info(&config),
        Command::Devnet { action } => devnet(&config, action).await,
        Command::Init { path } => init(&config, &path),
    }
}

async fn deploy(config: &StarkupConfig) -> Result<ExitCode> {
    let node = DevnetNode::new(config.devnet.clone())?;

    tokio::select! {
        result = run_deployment(config, &node) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping devnet...");
            let stopped = node.shutdown();
            tracing::info!(stopped, "Devnet stopped");
            Ok(ExitCode::from(INTERRUPTED))
        }
    }
}

async fn run_deployment(config: &StarkupConfig, node: &DevnetNode) -> Result<ExitCode> {
    let runner = SystemRunner;
    let pipeline = DeploymentPipeline::new(&runner, config);

    let run = match pipeline.deploy_to(node).await {
        Ok(run) => run,
        Err(DeployError::Pipeline(failure)) => {
            tracing::error!(stage = %failure.stage, "✗ Deployment failed: {}", failure.error);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            tracing::error!("✗ {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    for (stage, reason) in run.tolerated() {
        tracing::warn!(%stage, %reason, "Stage failed but was tolerated");
    }

    let Some(address) = run.record.contract_address.clone() else {
        return Ok(ExitCode::FAILURE);
    };

    tracing::info!("");
    tracing::info!("Devnet URL:        {}", run.record.node_url);
    tracing::info!("Contract address:  {}", address);
    tracing::info!("Record:            {}", pipeline.store().path().display());
    tracing::info!("");
    tracing::info!("=== Interact with the contract ===");
    let client = ContractClient::new(&runner, &config.sncast, &run.record.node_url, address);
    for example in client.usage_examples() {
        tracing::info!("  {}", example);
    }
    tracing::info!("");
    tracing::info!(
        "To stop the devnet, run: starkup devnet stop (or pkill -f {})",
        config.devnet.binary
    );

    Ok(ExitCode::SUCCESS)
}

async fn interact(config: &StarkupConfig) -> Result<ExitCode> {
    let node = DevnetNode::new(config.devnet.clone())?;
    let runner = SystemRunner;

    let session = match Session::open(&runner, config, &node).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("✗ {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match session.run_until(input, &mut output, interrupted).await? {
        SessionEnd::Finished => Ok(ExitCode::SUCCESS),
        SessionEnd::Interrupted => {
            tracing::warn!("Interrupted, stopping devnet...");
            let stopped = node.stop();
            tracing::info!(stopped, "Devnet stopped");
            let _ = output.flush();
            // A stdin read is still parked on the blocking pool and would hold
            // the runtime open, so leave without waiting for it.
            std::process::exit(INTERRUPTED.into());
        }
    }
}

async fn check(config: &StarkupConfig) -> Result<ExitCode> {
    let runner = SystemRunner;

    if let Err(failure) = DeploymentPipeline::new(&runner, config).check().await {
        tracing::error!(stage = %failure.stage, "✗ Check failed: {}", failure.error);
        return Ok(ExitCode::FAILURE);
    }

    let node = DevnetNode::new(config.devnet.clone())?;
    if !node.is_alive().await {
        tracing::error!(url = %node.url(), "✗ Devnet is not running");
        return Ok(ExitCode::FAILURE);
    }

    tracing::info!("✓ Contract builds, tests pass and the devnet is reachable");
    Ok(ExitCode::SUCCESS)
}

fn info(config: &StarkupConfig) -> Result<ExitCode> {
    let store = config.store();
    let Some(record) = store.load()? else {
        tracing::error!("✗ {}", SessionError::StoreAbsent(store.path().to_path_buf()));
        return Ok(ExitCode::FAILURE);
    };

    println!("{}", record_table(&record));
    Ok(ExitCode::SUCCESS)
}

async fn devnet(config: &StarkupConfig, action: DevnetCommand) -> Result<ExitCode> {
    let node = DevnetNode::new(config.devnet.clone())?;

    match action {
        DevnetCommand::Start => match node.ensure_running().await? {
            NodeStatus::Ready => {
                tracing::info!(url = %node.url(), "✓ Devnet is running");
                Ok(ExitCode::SUCCESS)
            }
            NodeStatus::TimedOut => Ok(ExitCode::FAILURE),
        },
        DevnetCommand::Status => {
            if node.is_alive().await {
                tracing::info!(url = %node.url(), "Devnet is running");
                Ok(ExitCode::SUCCESS)
            } else {
                tracing::info!(url = %node.url(), "Devnet is not running");
                Ok(ExitCode::FAILURE)
            }
        }
        DevnetCommand::Stop => {
            let stopped = node.stop();
            tracing::info!(stopped, "Devnet processes signalled");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init(config: &StarkupConfig, path: &Path) -> Result<ExitCode> {
    config
        .save_to_file(path)
        .context("Failed to write configuration")?;
    Ok(ExitCode::SUCCESS)
}
