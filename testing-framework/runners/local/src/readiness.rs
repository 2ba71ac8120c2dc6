use std::time::Duration;

use devnode_rpc_client::RpcClient;
use devnode_testing_core::nodes::{LaunchError, NodeProcess};
use tokio::time::{sleep, timeout};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls `system_health` until the node answers. Fails early when the
/// process exits.
pub async fn wait_for_rpc(
    client: &RpcClient,
    mut process: Option<&mut NodeProcess>,
    timeout_duration: Duration,
) -> Result<(), LaunchError> {
    let probe = async {
        loop {
            if let Some(process) = process.as_deref_mut() {
                if !process.is_running() {
                    return Err(LaunchError::Exited);
                }
            }
            match client.system_health().await {
                Ok(health) => {
                    tracing::debug!(url = %client.url(), peers = health.peers, "node is answering");
                    return Ok(());
                }
                Err(e) => tracing::trace!(url = %client.url(), "node not reachable yet: {e}"),
            }
            sleep(POLL_INTERVAL).await;
        }
    };

    timeout(timeout_duration, probe)
        .await
        .map_err(|_| LaunchError::Timeout(timeout_duration))?
}
