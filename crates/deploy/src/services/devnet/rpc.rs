//! HTTP endpoints exposed by the devnet node.

use std::time::Duration;

use anyhow::Context;
use url::Url;

use crate::record::AccountDescriptor;

/// Liveness endpoint, answers 200 once the node is ready.
pub const IS_ALIVE_PATH: &str = "is_alive";
/// Listing of the pre-funded accounts.
pub const PREDEPLOYED_ACCOUNTS_PATH: &str = "predeployed_accounts";

/// Default timeout for requests that are not liveness probes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Create an HTTP client for talking to the node.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Probe the liveness endpoint once.
///
/// Succeeds only on a 2xx answer within `timeout`.
pub async fn probe_alive(
    client: &reqwest::Client,
    base_url: &Url,
    timeout: Duration,
) -> Result<(), anyhow::Error> {
    let url = base_url
        .join(IS_ALIVE_PATH)
        .context("Failed to build liveness URL")?;

    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .context("Liveness probe failed")?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Liveness probe answered {}", status);
    }

    Ok(())
}

/// Fetch the node's pre-funded accounts.
pub async fn predeployed_accounts(
    client: &reqwest::Client,
    base_url: &Url,
) -> Result<Vec<AccountDescriptor>, anyhow::Error> {
    let url = base_url
        .join(PREDEPLOYED_ACCOUNTS_PATH)
        .context("Failed to build accounts URL")?;

    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to request predeployed accounts")?
        .error_for_status()
        .context("Node rejected the predeployed accounts request")?;

    response
        .json()
        .await
        .context("Failed to parse predeployed accounts")
}
