use devnode_core::{hash::blake2_256, EventValue, ExtrinsicOutcome, RawTransaction, Transactions, TxHash};
use devnode_testing_core::{block::CreateBlockError, mock::MockChain, nodes::SigningIdentity as _};
use tests::{
    common::{
        calls::{remark, transfer},
        mock::ready_harness,
    },
    init_test_tracing,
};

const RAW_TRANSFER: &str = "0xf86b8085e8d4a510008227109413cb6ae34a13a0977f4d7101ebc24b87bb23f0d5880de0b6b3a76400008025a0";

fn raw(suffix: &str) -> RawTransaction {
    RawTransaction::new(format!("{RAW_TRANSFER}{suffix}"))
}

fn executed_hash(outcome: &ExtrinsicOutcome) -> Option<TxHash> {
    outcome
        .events
        .iter()
        .find(|event| event.is("Ethereum", "Executed"))
        .and_then(|event| event.field("transaction_hash", 2))
        .and_then(EventValue::as_bytes)
        .and_then(|bytes| TxHash::try_from(bytes.as_slice()).ok())
}

#[tokio::test]
async fn raw_transactions_are_located_through_executed_events() {
    init_test_tracing();
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_block(raw("01")).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();

    assert!(outcome.successful);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.extrinsic.as_ref().map(|e| e.index), Some(0));
    assert_eq!(executed_hash(outcome), Some(outcome.hash));
    assert!(chain.receipt_polls() >= 1);
}

#[tokio::test]
async fn settling_waits_for_lagging_receipts() {
    let chain = MockChain::new();
    chain.set_receipt_lag(3);
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_block(raw("02")).await.unwrap();
    assert!(response.result.unwrap().as_single().unwrap().successful);
    assert!(chain.receipt_polls() >= 4, "polled {}", chain.receipt_polls());
}

#[tokio::test]
async fn receipts_that_never_appear_fail_the_block() {
    let chain = MockChain::new();
    chain.set_receipt_lag(u32::MAX);
    let (_harness, ctx) = ready_harness(&chain).await;

    let err = ctx.create_block(raw("03")).await.unwrap_err();
    match err {
        CreateBlockError::ReceiptNotVisible { hash, .. } => {
            let submitted = TxHash::new(blake2_256(raw("03").as_str().as_bytes()));
            assert_eq!(hash, submitted);
        }
        other => panic!("expected a settling timeout, got {other}"),
    }
    // The block itself was still produced.
    assert_eq!(chain.block_count(), 1);
}

#[tokio::test]
async fn substrate_only_blocks_skip_settling() {
    let chain = MockChain::new();
    chain.set_receipt_lag(u32::MAX);
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_block(remark(b"no receipts")).await.unwrap();
    assert!(response.result.is_some());
    assert_eq!(chain.receipt_polls(), 0);
}

#[tokio::test]
async fn mixed_batches_keep_each_family_in_place() {
    let chain = MockChain::new().with_timestamp_inherent();
    let (_harness, ctx) = ready_harness(&chain).await;
    let bob = chain.bob().account_id();

    let response = ctx
        .create_block(Transactions::Batch(vec![
            transfer(&bob, 10).into(),
            raw("04").into(),
            remark(b"tail").into(),
        ]))
        .await
        .unwrap();

    let result = response.result.unwrap();
    let outcomes = result.as_batch().unwrap();
    assert_eq!(result.outcomes().len(), 3);
    let indices: Vec<_> = outcomes
        .iter()
        .map(|o| o.extrinsic.as_ref().map(|e| e.index))
        .collect();
    assert_eq!(indices, vec![Some(1), Some(2), Some(3)]);
    assert!(outcomes.iter().all(|o| o.successful));
    assert!(outcomes[0].events.iter().any(|e| e.is("Balances", "Transfer")));
    assert_eq!(executed_hash(&outcomes[1]), Some(outcomes[1].hash));
    assert!(executed_hash(&outcomes[2]).is_none());
}
