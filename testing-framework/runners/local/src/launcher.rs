use std::{
    env,
    net::TcpListener,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use async_trait::async_trait;
use devnode_rpc_client::RpcClient;
use devnode_testing_core::{
    adjust_timeout,
    config::HarnessConfig,
    nodes::{LaunchError, LaunchOptions, NodeEndpoint, NodeLauncher, NodeProcess, RunningNode},
};

use crate::readiness::wait_for_rpc;

pub const BIN_ENV: &str = "DEVNODE_BIN";
pub const DEFAULT_BIN_PATH: &str = "../target/release/madara";
const LOG_ENV: &str = "DEVNODE_LOG";
const DEFAULT_LOG: &str = "info";

/// Spawns the dev node binary on fresh ports with a throwaway base path.
#[derive(Clone, Debug)]
pub struct LocalLauncher {
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl LocalLauncher {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    /// Binary from `DEVNODE_BIN`, or the release build next to the workspace.
    #[must_use]
    pub fn from_env() -> Self {
        let binary = env::var(BIN_ENV).map_or_else(
            |_| {
                env::current_dir()
                    .map(|dir| dir.join(DEFAULT_BIN_PATH))
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_BIN_PATH))
            },
            PathBuf::from,
        );
        Self::new(binary)
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn args(&self, options: &LaunchOptions, endpoint: &NodeEndpoint, base_path: &Path) -> Vec<String> {
        let log = env::var(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG.to_owned());
        let mut args = vec![
            "--dev".to_owned(),
            "--sealing=manual".to_owned(),
            format!("--chain={}", options.runtime),
            format!("--base-path={}", base_path.display()),
            format!("--port={}", endpoint.p2p_port),
            format!("--rpc-port={}", endpoint.rpc_port),
            format!("--ws-port={}", endpoint.ws_port),
            "--no-telemetry".to_owned(),
            "--no-prometheus".to_owned(),
            "--no-grandpa".to_owned(),
            "--reserved-only".to_owned(),
            format!("-l{log}"),
        ];
        if options.with_genesis_wasm {
            args.push("--execution=Wasm".to_owned());
            args.push("--wasm-execution=interpreted-i-know-what-i-do".to_owned());
        } else {
            args.push("--execution=Native".to_owned());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl Default for LocalLauncher {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Three distinct free ports. Listeners are held until all are picked.
fn free_ports() -> Result<[u16; 3], LaunchError> {
    let listeners = (0..3)
        .map(|_| TcpListener::bind("127.0.0.1:0"))
        .collect::<Result<Vec<_>, _>>()
        .map_err(LaunchError::Workspace)?;
    let mut ports = [0; 3];
    for (port, listener) in ports.iter_mut().zip(&listeners) {
        *port = listener.local_addr().map_err(LaunchError::Workspace)?.port();
    }
    Ok(ports)
}

#[async_trait]
impl NodeLauncher for LocalLauncher {
    async fn launch(
        &self,
        options: &LaunchOptions,
        config: &HarnessConfig,
    ) -> Result<RunningNode, LaunchError> {
        let endpoint = if options.forked {
            let ports = config.forked_ports;
            NodeEndpoint::local(ports.p2p, ports.rpc, ports.ws)
        } else {
            let [p2p, rpc, ws] = free_ports()?;
            NodeEndpoint::local(p2p, rpc, ws)
        };
        let workspace = tempfile::Builder::new()
            .prefix("devnode")
            .tempdir()
            .map_err(LaunchError::Workspace)?;

        let args = self.args(options, &endpoint, workspace.path());
        tracing::info!(binary = %self.binary.display(), ?args, "spawning dev node");
        let child = Command::new(&self.binary)
            .args(&args)
            .current_dir(workspace.path())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;
        let mut process = NodeProcess::new(child, Some(workspace));

        let rpc_url = endpoint
            .rpc_url()
            .map_err(|e| LaunchError::Other(Box::new(e)))?;
        let client = RpcClient::new(rpc_url);
        wait_for_rpc(&client, Some(&mut process), adjust_timeout(config.spawn_timeout)).await?;

        Ok(RunningNode {
            process: Some(process),
            endpoint,
        })
    }
}
