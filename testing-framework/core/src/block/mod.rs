//! Forcing a block out of the manual-seal node and mapping every submitted
//! transaction to what happened to it on chain.

pub mod classify;
pub mod correlate;
pub mod seal;
pub mod settle;
pub mod submit;

use std::time::Duration;

use devnode_core::{
    BlockCreationResponse, BlockHash, CreationResult, PendingReceipt, Transactions, TxFamily,
    TxHash,
};

pub use self::{
    classify::{classify, Classified},
    correlate::correlate,
    seal::force_block,
    settle::settle_receipts,
    submit::submit_all,
};
use crate::{
    config::{EthereumConfig, HarnessConfig},
    nodes::{ChainConnection, ConnectionError},
    retry::RetryPolicy,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockCreation {
    /// Build on this block instead of the current best.
    pub parent_hash: Option<BlockHash>,
    pub finalize: bool,
}

impl Default for BlockCreation {
    fn default() -> Self {
        Self {
            parent_hash: None,
            finalize: true,
        }
    }
}

impl BlockCreation {
    #[must_use]
    pub const fn with_parent(mut self, parent: BlockHash) -> Self {
        self.parent_hash = Some(parent);
        self
    }

    #[must_use]
    pub const fn without_finalization(mut self) -> Self {
        self.finalize = false;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreateBlockError {
    #[error("failed to dispatch {family} transaction #{index}: {source}")]
    Dispatch {
        index: usize,
        family: TxFamily,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to seal block: {0}")]
    Seal(#[source] ConnectionError),
    #[error("failed to fetch sealed block {block}: {source}")]
    Fetch {
        block: BlockHash,
        #[source]
        source: ConnectionError,
    },
    #[error("receipt of {hash} not visible after {waited:?}")]
    ReceiptNotVisible { hash: TxHash, waited: Duration },
}

/// Drives one `create_block` call against a connection.
pub struct BlockProducer<'a, C: ChainConnection> {
    connection: &'a C,
    signer: &'a C::Signer,
    ethereum: &'a EthereumConfig,
    settling: &'a RetryPolicy,
}

impl<'a, C: ChainConnection> BlockProducer<'a, C> {
    #[must_use]
    pub const fn new(connection: &'a C, signer: &'a C::Signer, config: &'a HarnessConfig) -> Self {
        Self {
            connection,
            signer,
            ethereum: &config.ethereum,
            settling: &config.receipt_settling,
        }
    }

    /// Dispatches `transactions` in order, seals exactly one block and
    /// reports per-transaction outcomes in the shape they were passed in.
    pub async fn create_block(
        &self,
        transactions: Transactions,
        options: BlockCreation,
    ) -> Result<BlockCreationResponse, CreateBlockError> {
        let receipts = submit_all(self.connection, self.signer, transactions.as_slice()).await?;
        let block = force_block(self.connection, options.parent_hash, options.finalize).await?;

        if receipts.is_empty() {
            return Ok(BlockCreationResponse {
                block,
                result: None,
            });
        }

        let mut outcomes = correlate(self.connection, block.hash, &receipts, self.ethereum).await?;
        if ethereum_receipts(&receipts).next().is_some() {
            settle_receipts(self.connection, &receipts, self.settling).await?;
        }

        let result = if transactions.is_batch() {
            CreationResult::Batch(outcomes)
        } else {
            CreationResult::Single(outcomes.swap_remove(0))
        };
        let included = result
            .outcomes()
            .iter()
            .filter(|outcome| outcome.extrinsic.is_some())
            .count();
        tracing::debug!(
            block = %block.hash,
            submitted = receipts.len(),
            included,
            "outcomes correlated"
        );
        Ok(BlockCreationResponse {
            block,
            result: Some(result),
        })
    }
}

/// Receipts that belong to the Ethereum family, in input order.
pub(crate) fn ethereum_receipts(receipts: &[PendingReceipt]) -> impl Iterator<Item = &PendingReceipt> {
    receipts.iter().filter(|r| r.family() == TxFamily::Ethereum)
}
