use devnode_core::{PendingReceipt, PendingTransaction};

use super::{classify, Classified, CreateBlockError};
use crate::nodes::ChainConnection;

/// Dispatches every transaction in order, one acknowledgment at a time. The
/// first failure aborts the whole batch.
pub async fn submit_all<C: ChainConnection>(
    connection: &C,
    signer: &C::Signer,
    transactions: &[PendingTransaction],
) -> Result<Vec<PendingReceipt>, CreateBlockError> {
    let mut receipts = Vec::with_capacity(transactions.len());
    for (index, tx) in transactions.iter().enumerate() {
        let classified = classify(tx);
        let family = classified.family();
        tracing::debug!(%family, call = %classified.label(), index, "dispatching transaction");

        let dispatched = match classified {
            Classified::Ethereum(raw) => connection.submit_raw(raw).await,
            Classified::SubstrateSigned(extrinsic) => connection.submit_signed(extrinsic).await,
            Classified::SubstrateUnsigned(call) => connection.sign_and_submit(call, signer).await,
        };
        let hash = dispatched.map_err(|source| CreateBlockError::Dispatch {
            index,
            family,
            source,
        })?;
        receipts.push(PendingReceipt::new(family, hash));
    }
    Ok(receipts)
}

#[cfg(test)]
mod tests {
    use devnode_core::{RawTransaction, RuntimeCall, SignedExtrinsic, TxFamily};

    use super::*;
    use crate::mock::MockChain;

    #[tokio::test]
    async fn receipts_follow_input_order_and_family() {
        let chain = MockChain::new();
        let conn = chain.connection();
        let signer = chain.alice();
        let signed = SignedExtrinsic::from_bytes(vec![8, 1, 2]);
        let txs = vec![
            PendingTransaction::from(RawTransaction::new("0xf86c01")),
            PendingTransaction::from(signed.clone()),
            PendingTransaction::from(RuntimeCall::new("System", "remark", vec![])),
        ];

        let receipts = submit_all(&conn, &signer, &txs).await.unwrap();
        let families: Vec<_> = receipts.iter().map(PendingReceipt::family).collect();
        assert_eq!(
            families,
            vec![TxFamily::Ethereum, TxFamily::Substrate, TxFamily::Substrate]
        );
        assert_eq!(receipts[1].hash(), signed.hash());
        assert_eq!(chain.pending_count(), 3);
    }

    #[tokio::test]
    async fn later_failures_report_their_position() {
        let chain = MockChain::new();
        let conn = chain.connection();
        let signer = chain.alice();
        let txs = vec![
            PendingTransaction::from(RuntimeCall::new("System", "remark", vec![])),
            PendingTransaction::from(RuntimeCall::new("System", "remark", vec![])),
        ];
        chain.reject_submission_at(1);

        let err = submit_all(&conn, &signer, &txs).await.unwrap_err();
        assert!(matches!(err, CreateBlockError::Dispatch { index: 1, .. }));
    }
}
