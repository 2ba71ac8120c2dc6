use std::{fmt, process::Child, time::Duration};

use async_trait::async_trait;
use tempfile::TempDir;

use super::NodeEndpoint;
use crate::{config::HarnessConfig, scenario::DynError};

/// Chain spec the node is started with, passed through as `--chain`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeVariant(String);

impl RuntimeVariant {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RuntimeVariant {
    fn default() -> Self {
        Self::new("dev")
    }
}

impl fmt::Display for RuntimeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub runtime: RuntimeVariant,
    /// Execute the runtime from the genesis wasm rather than the native build.
    pub with_genesis_wasm: bool,
    /// Follow a live chain on the fixed forked ports.
    pub forked: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn node binary {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare node workspace: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("node exited before becoming reachable")]
    Exited,
    #[error("node was not reachable within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Other(DynError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to kill node process: {0}")]
    Kill(#[source] std::io::Error),
    #[error("node process still running {0:?} after kill")]
    ExitTimeout(Duration),
}

/// A spawned node. Killed on drop if still running.
pub struct NodeProcess {
    child: Child,
    // Removed after the child, keeping the base path alive for the process lifetime.
    _workspace: Option<TempDir>,
}

impl NodeProcess {
    #[must_use]
    pub const fn new(child: Child, workspace: Option<TempDir>) -> Self {
        Self {
            child,
            _workspace: workspace,
        }
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(_)) | Err(_) => false,
        }
    }

    /// Returns true if the process exited within the timeout.
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                if !self.is_running() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .is_ok()
    }

    pub async fn terminate(&mut self, timeout: Duration) -> Result<(), ProcessError> {
        if !self.is_running() {
            return Ok(());
        }
        self.child.kill().map_err(ProcessError::Kill)?;
        if self.wait_for_exit(timeout).await {
            Ok(())
        } else {
            Err(ProcessError::ExitTimeout(timeout))
        }
    }
}

impl Drop for NodeProcess {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.child.kill() {
                tracing::warn!(pid = self.child.id(), "failed to kill node process: {e}");
            }
        }
    }
}

impl fmt::Debug for NodeProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeProcess")
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct RunningNode {
    /// `None` when attached to a node the harness does not own.
    pub process: Option<NodeProcess>,
    pub endpoint: NodeEndpoint,
}

#[async_trait]
pub trait NodeLauncher: Send + Sync {
    async fn launch(
        &self,
        options: &LaunchOptions,
        config: &HarnessConfig,
    ) -> Result<RunningNode, LaunchError>;
}

/// Attaches to a node started by hand: on the forked ports in forked mode,
/// otherwise on the debug ports.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttachLauncher;

#[async_trait]
impl NodeLauncher for AttachLauncher {
    async fn launch(
        &self,
        options: &LaunchOptions,
        config: &HarnessConfig,
    ) -> Result<RunningNode, LaunchError> {
        let ports = if options.forked {
            config.forked_ports
        } else {
            config.debug_ports
        };
        tracing::info!(
            runtime = %options.runtime,
            forked = options.forked,
            rpc = ports.rpc,
            "attaching to running node"
        );
        Ok(RunningNode {
            process: None,
            endpoint: NodeEndpoint::local(ports.p2p, ports.rpc, ports.ws),
        })
    }
}
