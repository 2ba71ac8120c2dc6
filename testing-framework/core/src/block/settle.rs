use devnode_core::PendingReceipt;

use super::{ethereum_receipts, CreateBlockError};
use crate::{
    nodes::ChainConnection,
    retry::{poll_until, RetryPolicy},
};

/// Waits until every Ethereum receipt is queryable through the node's
/// Ethereum RPC. Sealing returns before the receipt index is updated.
pub async fn settle_receipts<C: ChainConnection>(
    connection: &C,
    receipts: &[PendingReceipt],
    policy: &RetryPolicy,
) -> Result<(), CreateBlockError> {
    for receipt in ethereum_receipts(receipts) {
        let hash = receipt.hash();
        poll_until(policy, || async move {
            connection
                .raw_receipt_visible(&hash)
                .await
                .map(|visible| visible.then_some(()))
        })
        .await
        .map_err(|timeout| {
            tracing::warn!(%hash, waited = ?timeout.waited, "ethereum receipt never became visible");
            CreateBlockError::ReceiptNotVisible {
                hash,
                waited: timeout.waited,
            }
        })?;
    }
    Ok(())
}
