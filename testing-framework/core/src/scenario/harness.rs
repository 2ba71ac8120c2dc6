use std::{sync::Arc, time::Duration};

use crate::{
    adjust_timeout,
    config::HarnessConfig,
    nodes::{
        process::ProcessError, ChainConnection as _, ConnectionError, Connector, LaunchError,
        LaunchOptions, NodeLauncher, NodeProcess,
    },
    pool::ConnectionPool,
    retry::{poll_until, PollTimeout},
    scenario::DevTestContext,
};

const NODE_EXIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarnessState {
    Uninitialized,
    Ready,
    TornDown,
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("harness already set up")]
    AlreadySetUp,
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("failed to connect to node: {0}")]
    Connect(#[source] ConnectionError),
    #[error("node not ready: {0}")]
    NotReady(#[source] PollTimeout<ConnectionError>),
    #[error("failed to derive signing identity: {0}")]
    Signer(#[source] ConnectionError),
}

/// Best-effort teardown failures. Never raised, only reported.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub disconnected: usize,
    pub disconnect_errors: Vec<ConnectionError>,
    pub process_error: Option<ProcessError>,
    /// Whether a node process owned by the harness was stopped.
    pub terminated: bool,
}

impl TeardownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.disconnect_errors.is_empty() && self.process_error.is_none()
    }
}

/// Lifecycle of one node plus its connections across a scenario group.
pub struct DevHarness<K: Connector> {
    state: HarnessState,
    context: Option<Arc<DevTestContext<K>>>,
    process: Option<NodeProcess>,
}

impl<K: Connector> Default for DevHarness<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Connector> DevHarness<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: HarnessState::Uninitialized,
            context: None,
            process: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> HarnessState {
        self.state
    }

    #[must_use]
    pub fn context(&self) -> Option<Arc<DevTestContext<K>>> {
        self.context.clone()
    }

    pub async fn setup<L>(
        &mut self,
        launcher: &L,
        connector: K,
        config: HarnessConfig,
        options: &LaunchOptions,
    ) -> Result<Arc<DevTestContext<K>>, SetupError>
    where
        L: NodeLauncher + ?Sized,
    {
        if self.state != HarnessState::Uninitialized {
            return Err(SetupError::AlreadySetUp);
        }

        let spawn_timeout = adjust_timeout(config.spawn_timeout);
        let node = tokio::time::timeout(spawn_timeout, launcher.launch(options, &config))
            .await
            .map_err(|_| LaunchError::Timeout(spawn_timeout))??;
        self.process = node.process;
        tracing::info!(
            runtime = %options.runtime,
            rpc_port = node.endpoint.rpc_port,
            ws_port = node.endpoint.ws_port,
            spawned = self.process.is_some(),
            "dev node launched"
        );

        match Self::connect(connector, &config, node.endpoint).await {
            Ok(context) => {
                let context = Arc::new(context);
                self.context = Some(Arc::clone(&context));
                self.state = HarnessState::Ready;
                Ok(context)
            }
            Err(e) => {
                if let Some(mut process) = self.process.take() {
                    if let Err(kill) = process.terminate(adjust_timeout(NODE_EXIT_TIMEOUT)).await {
                        tracing::warn!("failed to stop node after setup error: {kill}");
                    }
                }
                Err(e)
            }
        }
    }

    async fn connect(
        connector: K,
        config: &HarnessConfig,
        endpoint: crate::nodes::NodeEndpoint,
    ) -> Result<DevTestContext<K>, SetupError> {
        let pool = ConnectionPool::new();
        let connection = pool
            .register(connector.connect(&endpoint).await.map_err(SetupError::Connect)?)
            .await;

        let readiness = config.readiness;
        let probe = Arc::clone(&connection);
        if let Err(timeout) = poll_until(&readiness, || {
            let probe = Arc::clone(&probe);
            async move { probe.is_ready().await.map(|ready| ready.then_some(())) }
        })
        .await
        {
            pool.disconnect_all().await;
            return Err(SetupError::NotReady(timeout));
        }

        let signer = match connection.derive_signer(&config.signer_uri) {
            Ok(signer) => signer,
            Err(e) => {
                pool.disconnect_all().await;
                return Err(SetupError::Signer(e));
            }
        };

        Ok(DevTestContext::new(
            connection,
            signer,
            pool,
            connector,
            endpoint,
            config.clone(),
        ))
    }

    /// Closes every pooled connection, then stops the node if the harness
    /// spawned it. A second call does nothing.
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.state != HarnessState::Ready {
            return report;
        }
        self.state = HarnessState::TornDown;

        if let Some(context) = self.context.take() {
            report.disconnected = context.pool().len().await;
            report.disconnect_errors = context.pool().disconnect_all().await;
            for error in &report.disconnect_errors {
                tracing::warn!("failed to disconnect: {error}");
            }
        }

        if let Some(mut process) = self.process.take() {
            let pid = process.id();
            match process.terminate(adjust_timeout(NODE_EXIT_TIMEOUT)).await {
                Ok(()) => report.terminated = true,
                Err(e) => {
                    tracing::warn!(pid, "failed to stop node: {e}");
                    report.process_error = Some(e);
                }
            }
        }

        tracing::info!(
            disconnected = report.disconnected,
            terminated = report.terminated,
            "dev node torn down"
        );
        report
    }
}
