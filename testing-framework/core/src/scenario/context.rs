use std::sync::Arc;

use devnode_core::{BlockCreationResponse, Transactions};

use crate::{
    block::{BlockCreation, BlockProducer, CreateBlockError},
    config::HarnessConfig,
    nodes::{ChainConnection, ConnectionError, Connector, NodeEndpoint},
    pool::ConnectionPool,
};

type Signer<K> = <<K as Connector>::Connection as ChainConnection>::Signer;

/// Shared state of one scenario group: the node endpoint, the primary
/// connection and the identity unsigned calls are signed with.
pub struct DevTestContext<K: Connector> {
    connection: Arc<K::Connection>,
    signer: Signer<K>,
    pool: ConnectionPool<K::Connection>,
    connector: K,
    endpoint: NodeEndpoint,
    config: HarnessConfig,
}

impl<K: Connector> DevTestContext<K> {
    pub(crate) const fn new(
        connection: Arc<K::Connection>,
        signer: Signer<K>,
        pool: ConnectionPool<K::Connection>,
        connector: K,
        endpoint: NodeEndpoint,
        config: HarnessConfig,
    ) -> Self {
        Self {
            connection,
            signer,
            pool,
            connector,
            endpoint,
            config,
        }
    }

    #[must_use]
    pub fn connection(&self) -> &K::Connection {
        &self.connection
    }

    #[must_use]
    pub const fn signer(&self) -> &Signer<K> {
        &self.signer
    }

    #[must_use]
    pub const fn endpoint(&self) -> &NodeEndpoint {
        &self.endpoint
    }

    #[must_use]
    pub const fn rpc_port(&self) -> u16 {
        self.endpoint.rpc_port
    }

    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub(crate) const fn pool(&self) -> &ConnectionPool<K::Connection> {
        &self.pool
    }

    /// Opens an additional connection to the node. It is closed at teardown
    /// together with the primary one.
    pub async fn create_connection(&self) -> Result<Arc<K::Connection>, ConnectionError> {
        let connection = self.connector.connect(&self.endpoint).await?;
        Ok(self.pool.register(connection).await)
    }

    pub async fn create_block(
        &self,
        transactions: impl Into<Transactions> + Send,
    ) -> Result<BlockCreationResponse, CreateBlockError> {
        self.create_block_with_options(transactions, BlockCreation::default())
            .await
    }

    pub async fn create_block_with_options(
        &self,
        transactions: impl Into<Transactions> + Send,
        options: BlockCreation,
    ) -> Result<BlockCreationResponse, CreateBlockError> {
        BlockProducer::new(self.connection.as_ref(), &self.signer, &self.config)
            .create_block(transactions.into(), options)
            .await
    }

    pub async fn create_empty_block(&self) -> Result<BlockCreationResponse, CreateBlockError> {
        self.create_block(Transactions::None).await
    }
}
