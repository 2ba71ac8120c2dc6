pub mod process;
pub mod substrate;

use async_trait::async_trait;
use devnode_core::{
    AccountId, Block, BlockHash, EventRecord, ModuleErrorInfo, RawTransaction, RuntimeCall,
    SignedExtrinsic, TxHash,
};
use url::Url;

use crate::scenario::DynError;

pub use self::process::{
    AttachLauncher, LaunchError, LaunchOptions, NodeLauncher, NodeProcess, RunningNode,
    RuntimeVariant,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEndpoint {
    pub host: String,
    pub p2p_port: u16,
    pub rpc_port: u16,
    pub ws_port: u16,
}

impl NodeEndpoint {
    #[must_use]
    pub fn local(p2p_port: u16, rpc_port: u16, ws_port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            p2p_port,
            rpc_port,
            ws_port,
        }
    }

    pub fn rpc_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}:{}", self.host, self.rpc_port))
    }

    pub fn ws_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("ws://{}:{}", self.host, self.ws_port))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Rpc(#[from] devnode_rpc_client::Error),
    #[error(transparent)]
    Client(#[from] subxt::Error),
    #[error("block {0} not found")]
    BlockNotFound(BlockHash),
    #[error("invalid signer: {0}")]
    Signer(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("connection already closed")]
    Closed,
    #[error(transparent)]
    Backend(DynError),
}

pub trait SigningIdentity: Send + Sync + 'static {
    fn account_id(&self) -> AccountId;
}

/// Everything the harness needs from a live node.
#[async_trait]
pub trait ChainConnection: Send + Sync + 'static {
    type Signer: SigningIdentity;

    fn derive_signer(&self, uri: &str) -> Result<Self::Signer, ConnectionError>;

    async fn is_ready(&self) -> Result<bool, ConnectionError>;

    async fn submit_signed(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, ConnectionError>;

    async fn sign_and_submit(
        &self,
        call: &RuntimeCall,
        signer: &Self::Signer,
    ) -> Result<TxHash, ConnectionError>;

    async fn submit_raw(&self, raw: &RawTransaction) -> Result<TxHash, ConnectionError>;

    /// Seals exactly one block out of the pool and returns its hash.
    async fn seal_block(
        &self,
        parent: Option<BlockHash>,
        finalize: bool,
    ) -> Result<BlockHash, ConnectionError>;

    async fn events_at(&self, block: BlockHash) -> Result<Vec<EventRecord>, ConnectionError>;

    async fn block_by_hash(&self, block: BlockHash) -> Result<Block, ConnectionError>;

    /// Metadata lookup of a module error. `None` when the indices are unknown.
    async fn module_error(
        &self,
        module_index: u8,
        error_index: u8,
    ) -> Result<Option<ModuleErrorInfo>, ConnectionError>;

    async fn raw_receipt_visible(&self, hash: &TxHash) -> Result<bool, ConnectionError>;

    async fn disconnect(&self) -> Result<(), ConnectionError>;
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: ChainConnection;

    async fn connect(&self, endpoint: &NodeEndpoint) -> Result<Self::Connection, ConnectionError>;
}
