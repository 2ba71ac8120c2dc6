use devnode_core::{ErrorDescriptor, SignedExtrinsic, Transactions};
use devnode_testing_core::{
    block::{BlockCreation, CreateBlockError},
    mock::MockChain,
    nodes::SigningIdentity as _,
};
use tests::{
    common::{
        calls::{remark, transfer},
        mock::{bad_origin, ready_harness},
    },
    init_test_tracing,
};

#[tokio::test]
async fn single_transfer_yields_single_outcome() {
    init_test_tracing();
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;
    let bob = chain.bob().account_id();
    let before = chain.balance_of(&bob);

    let response = ctx.create_block(transfer(&bob, 1_000)).await.unwrap();

    let result = response.result.expect("a transaction was submitted");
    let outcome = result.as_single().expect("single input, single outcome");
    assert!(outcome.successful);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.extrinsic.as_ref().map(|e| e.index), Some(0));
    assert!(outcome.events.iter().any(|e| e.is("Balances", "Transfer")));
    assert!(outcome.events.iter().any(|e| e.is("System", "ExtrinsicSuccess")));
    assert_eq!(chain.balance_of(&bob), before + 1_000);
    assert_eq!(chain.head(), response.block.hash);
}

#[tokio::test]
async fn batch_outcomes_follow_input_order() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;
    let bob = chain.bob().account_id();

    let response = ctx
        .create_block(Transactions::Batch(vec![
            remark(b"first").into(),
            transfer(&bob, u128::MAX).into(),
            transfer(&bob, 5).into(),
        ]))
        .await
        .unwrap();

    let result = response.result.unwrap();
    let outcomes = result.as_batch().expect("batch input, batch outcome");
    assert_eq!(outcomes.len(), 3);
    let successes: Vec<_> = outcomes.iter().map(|o| o.successful).collect();
    assert_eq!(successes, vec![true, false, true]);
    for (position, outcome) in outcomes.iter().enumerate() {
        assert_eq!(
            outcome.extrinsic.as_ref().map(|e| e.index as usize),
            Some(position)
        );
        assert_eq!(outcome.extrinsic.as_ref().map(|e| e.hash), Some(outcome.hash));
    }
}

#[tokio::test]
async fn single_element_batch_is_still_a_batch() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx
        .create_block(Transactions::Batch(vec![remark(b"only").into()]))
        .await
        .unwrap();
    assert_eq!(response.result.unwrap().as_batch().map(<[_]>::len), Some(1));
}

#[tokio::test]
async fn empty_blocks_have_no_result_and_skip_fetching() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_empty_block().await.unwrap();
    assert!(response.result.is_none());
    assert_eq!(chain.block_count(), 1);
    assert_eq!(chain.event_fetches(), 0);
    assert_eq!(chain.block_fetches(), 0);
}

#[tokio::test]
async fn inherents_shift_user_extrinsics() {
    let chain = MockChain::new().with_timestamp_inherent();
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_block(remark(b"after inherent")).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();
    assert_eq!(outcome.extrinsic.as_ref().map(|e| e.index), Some(1));
    assert!(outcome.successful);
}

#[tokio::test]
async fn insufficient_balance_is_a_decoded_module_error() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;
    let bob = chain.bob().account_id();

    let response = ctx.create_block(transfer(&bob, u128::MAX)).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();

    assert!(!outcome.successful);
    assert!(outcome.extrinsic.is_some());
    let error = outcome.error.as_ref().expect("failure is reported");
    assert_eq!(error.name(), "InsufficientBalance");
    assert_eq!(error.pallet(), Some("Balances"));
    assert!(matches!(error, ErrorDescriptor::Module(info) if !info.docs.is_empty()));
    assert!(outcome.events.iter().any(|e| e.is("System", "ExtrinsicFailed")));
}

#[tokio::test]
async fn unresolvable_module_errors_fall_back_to_string_form() {
    let chain = MockChain::new();
    chain.disable_error_resolution();
    let (_harness, ctx) = ready_harness(&chain).await;
    let bob = chain.bob().account_id();

    let response = ctx.create_block(transfer(&bob, u128::MAX)).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();

    assert!(!outcome.successful);
    match outcome.error.as_ref() {
        Some(ErrorDescriptor::Other { name }) => assert!(name.starts_with("Module"), "{name}"),
        other => panic!("expected string fallback, got {other:?}"),
    }
}

#[tokio::test]
async fn non_module_failures_use_their_name() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let response = ctx.create_block(bad_origin()).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();
    assert!(!outcome.successful);
    assert_eq!(outcome.error.as_ref().map(ErrorDescriptor::name), Some("BadOrigin"));
}

#[tokio::test]
async fn presigned_extrinsics_are_correlated_by_hash() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;
    let extrinsic = SignedExtrinsic::from_bytes(vec![0x10, 0x04, 0x00, 0x01, 0x02]);

    let response = ctx.create_block(extrinsic.clone()).await.unwrap();
    let result = response.result.unwrap();
    let outcome = result.as_single().unwrap();
    assert!(outcome.successful);
    assert_eq!(outcome.hash, extrinsic.hash());
    assert_eq!(
        outcome.extrinsic.as_ref().map(|e| e.bytes.as_slice()),
        Some(extrinsic.bytes())
    );
}

#[tokio::test]
async fn sequential_blocks_link_to_each_other() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let first = ctx.create_empty_block().await.unwrap().block;
    let second = ctx.create_empty_block().await.unwrap().block;
    assert_ne!(first.hash, second.hash);
    assert_eq!(chain.parent_of(second.hash), Some(first.hash));
}

#[tokio::test]
async fn parent_override_builds_a_fork() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;

    let first = ctx.create_empty_block().await.unwrap().block;
    ctx.create_empty_block().await.unwrap();
    let fork = ctx
        .create_block_with_options(
            Transactions::None,
            BlockCreation::default()
                .with_parent(first.hash)
                .without_finalization(),
        )
        .await
        .unwrap()
        .block;
    assert_eq!(chain.parent_of(fork.hash), Some(first.hash));
}

#[tokio::test]
async fn rejected_submission_aborts_the_call() {
    let chain = MockChain::new();
    let (_harness, ctx) = ready_harness(&chain).await;
    chain.reject_submission_at(1);

    let err = ctx
        .create_block(Transactions::Batch(vec![
            remark(b"ok").into(),
            remark(b"rejected").into(),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, CreateBlockError::Dispatch { index: 1, .. }));
    assert_eq!(chain.block_count(), 0);
}
