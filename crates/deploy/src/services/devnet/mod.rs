//! Local devnet node lifecycle.

mod cmd;
mod registry;
pub mod rpc;

use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize};
use url::Url;

pub use cmd::DevnetCmdBuilder;
pub use registry::{ProcessRegistry, RegisteredProcess, terminate_matching};

use crate::{config::lenient_string, record::AccountDescriptor};

/// Default binary of the devnet node.
pub const DEFAULT_BINARY: &str = "starknet-devnet";
/// Default host for the devnet node.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port for the devnet node.
pub const DEFAULT_PORT: u16 = 5050;

/// Configuration for the devnet node.
///
/// Seed, account count and balance are fixed per configuration so that two
/// launches produce the same accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    /// Binary used to launch the node.
    pub binary: String,
    /// Host the node binds to and is reached at.
    pub host: String,
    /// Port the node binds to and is reached at.
    pub port: u16,
    /// Seed for the pre-funded accounts.
    pub seed: u64,
    /// Number of pre-funded accounts.
    pub accounts: u32,
    /// Initial balance of each pre-funded account.
    #[serde(deserialize_with = "lenient_string")]
    pub initial_balance: String,
    /// Timeout of the probe that checks for an already running node, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Timeout of each probe while waiting for a launched node, in milliseconds.
    pub poll_timeout_ms: u64,
    /// Delay between two probes while waiting for a launched node, in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of probes before giving up on a launched node.
    pub poll_attempts: usize,
    /// Extra arguments to pass to the node.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            seed: 42,
            accounts: 10,
            initial_balance: "1000000000000000000000".to_string(),
            probe_timeout_ms: 2_000,
            poll_timeout_ms: 1_000,
            poll_interval_ms: 1_000,
            poll_attempts: 30,
            extra_args: Vec::new(),
        }
    }
}

impl DevnetConfig {
    /// Base URL of the node, as recorded in deployment records and passed to the CLI.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// The launch command as an argv vector.
    pub fn launch_cmd(&self) -> Vec<String> {
        DevnetCmdBuilder::new(&self.binary)
            .host(&self.host)
            .port(self.port)
            .seed(self.seed)
            .accounts(self.accounts)
            .initial_balance(&self.initial_balance)
            .extra_args(self.extra_args.clone())
            .build()
    }
}

/// Outcome of [`DevnetNode::ensure_running`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum NodeStatus {
    /// The node answered its liveness probe.
    Ready,
    /// The node never answered within the poll window.
    TimedOut,
}

/// Manager for one devnet node.
#[derive(Debug)]
pub struct DevnetNode {
    config: DevnetConfig,
    base_url: Url,
    client: reqwest::Client,
    registry: ProcessRegistry,
}

impl DevnetNode {
    pub fn new(config: DevnetConfig) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(&config.url())
            .context(format!("Invalid devnet address {}", config.url()))?;

        Ok(Self {
            config,
            base_url,
            client: rpc::create_client()?,
            registry: ProcessRegistry::new(),
        })
    }

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    /// Base URL of the node.
    pub fn url(&self) -> String {
        self.config.url()
    }

    /// Probe the liveness endpoint once.
    pub async fn is_alive(&self) -> bool {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        match rpc::probe_alive(&self.client, &self.base_url, timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, url = %self.base_url, "Devnet is not answering");
                false
            }
        }
    }

    /// Make sure a node is answering at the configured address.
    ///
    /// An already running node is reused as-is. Otherwise a node is launched in
    /// the background and polled until it answers or the poll window runs out.
    /// The launched process is left running when this returns.
    pub async fn ensure_running(&self) -> Result<NodeStatus, anyhow::Error> {
        if self.is_alive().await {
            tracing::info!(url = %self.url(), "Devnet already running");
            return Ok(NodeStatus::Ready);
        }

        self.launch()?;

        tracing::info!(
            url = %self.url(),
            attempts = self.config.poll_attempts,
            "Waiting for devnet to start..."
        );

        Ok(self.wait_until_ready().await)
    }

    /// Launch the node detached from this process.
    fn launch(&self) -> Result<(), anyhow::Error> {
        let argv = self.config.launch_cmd();
        tracing::info!(command = %argv.join(" "), "Starting devnet");

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context(format!(
                "Failed to launch {}. Is it installed and on PATH?",
                self.config.binary
            ))?;

        tracing::debug!(pid = child.id(), "Devnet process spawned");

        // The handle is dropped without waiting: the node keeps running on its own.
        drop(child);

        self.registry.register(RegisteredProcess::new(
            &self.config.binary,
            Some(self.config.port),
        ));

        Ok(())
    }

    /// Poll the liveness endpoint at a fixed interval, up to the configured number of attempts.
    pub async fn wait_until_ready(&self) -> NodeStatus {
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);
        let backoff = ConstantBuilder::default()
            .with_delay(Duration::from_millis(self.config.poll_interval_ms))
            .with_max_times(self.config.poll_attempts.saturating_sub(1));

        let result = (|| rpc::probe_alive(&self.client, &self.base_url, timeout))
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|err, _| {
                tracing::trace!(error = %err, "Devnet not ready yet, retrying...");
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!(url = %self.url(), "Devnet started");
                NodeStatus::Ready
            }
            Err(e) => {
                tracing::error!(error = %e, url = %self.url(), "Devnet did not start in time");
                NodeStatus::TimedOut
            }
        }
    }

    /// Fetch the node's pre-funded accounts.
    pub async fn predeployed_accounts(&self) -> Result<Vec<AccountDescriptor>, anyhow::Error> {
        let accounts = rpc::predeployed_accounts(&self.client, &self.base_url).await?;
        tracing::info!(count = accounts.len(), "Fetched predeployed accounts");
        Ok(accounts)
    }

    /// Terminate nodes launched by this manager. Best effort.
    pub fn shutdown(&self) -> usize {
        if self.registry.is_empty() {
            return 0;
        }
        tracing::info!("Stopping devnet...");
        self.registry.terminate_all()
    }

    /// Terminate any node process matching the configured binary and port,
    /// whether or not this manager launched it. Best effort.
    pub fn stop(&self) -> usize {
        terminate_matching(&RegisteredProcess::new(
            &self.config.binary,
            Some(self.config.port),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Serve every request on a local port with a fixed status and body.
    pub(crate) async fn serve_fixed(status: &'static str, body: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        port
    }

    /// A port nothing listens on.
    pub(crate) async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    pub(crate) fn fast_config(port: u16) -> DevnetConfig {
        DevnetConfig {
            port,
            probe_timeout_ms: 200,
            poll_timeout_ms: 100,
            poll_interval_ms: 10,
            poll_attempts: 3,
            ..DevnetConfig::default()
        }
    }

    #[test]
    fn test_default_launch_cmd() {
        let cmd = DevnetConfig::default().launch_cmd();
        assert_eq!(
            cmd.join(" "),
            "starknet-devnet --host 127.0.0.1 --port 5050 --seed 42 --accounts 10 --initial-balance 1000000000000000000000"
        );
        assert_eq!(DevnetConfig::default().url(), "http://127.0.0.1:5050");
    }

    #[test]
    fn test_default_poll_window() {
        let config = DevnetConfig::default();
        assert_eq!(config.poll_attempts, 30);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.poll_timeout_ms, 1000);
        assert_eq!(config.probe_timeout_ms, 2000);
    }

    #[tokio::test]
    async fn test_running_node_is_reused_without_launch() {
        let port = serve_fixed("200 OK", "").await;
        let config = DevnetConfig {
            // Launching this would fail, so Ready proves nothing was launched.
            binary: "starkup-no-such-devnet-binary".to_string(),
            ..fast_config(port)
        };
        let node = DevnetNode::new(config).unwrap();

        assert_eq!(node.ensure_running().await.unwrap(), NodeStatus::Ready);
        assert!(node.registry.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_times_out_when_node_never_answers() {
        let port = closed_port().await;
        let config = DevnetConfig {
            // Exits immediately, so the probe never succeeds.
            binary: "true".to_string(),
            ..fast_config(port)
        };
        let node = DevnetNode::new(config).unwrap();

        assert_eq!(node.ensure_running().await.unwrap(), NodeStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_alive() {
        let port = serve_fixed("503 Service Unavailable", "").await;
        let node = DevnetNode::new(fast_config(port)).unwrap();

        assert!(!node.is_alive().await);
        assert_eq!(node.wait_until_ready().await, NodeStatus::TimedOut);
    }

    #[tokio::test]
    async fn test_launch_failure_is_an_error() {
        let port = closed_port().await;
        let config = DevnetConfig {
            binary: "starkup-no-such-devnet-binary".to_string(),
            ..fast_config(port)
        };
        let node = DevnetNode::new(config).unwrap();

        assert!(node.ensure_running().await.is_err());
    }

    #[tokio::test]
    async fn test_fetches_predeployed_accounts() {
        let port = serve_fixed(
            "200 OK",
            r#"[{"initial_balance":"1000","address":"0x1","public_key":"0x2","private_key":"0x3"}]"#,
        )
        .await;
        let node = DevnetNode::new(fast_config(port)).unwrap();

        let accounts = node.predeployed_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, "0x1");
        assert_eq!(accounts[0].private_key, "0x3");
        assert_eq!(accounts[0].public_key.as_deref(), Some("0x2"));
    }
}
