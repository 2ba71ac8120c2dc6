use devnode_core::{BlockCreated, BlockHash};
use tokio::time::Instant;

use super::CreateBlockError;
use crate::nodes::ChainConnection;

pub async fn force_block<C: ChainConnection>(
    connection: &C,
    parent: Option<BlockHash>,
    finalize: bool,
) -> Result<BlockCreated, CreateBlockError> {
    let started = Instant::now();
    let hash = connection
        .seal_block(parent, finalize)
        .await
        .map_err(CreateBlockError::Seal)?;
    let duration = started.elapsed();
    tracing::debug!(%hash, ?duration, finalize, "sealed block");
    Ok(BlockCreated { hash, duration })
}
