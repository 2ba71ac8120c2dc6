//! Runs against a real dev node. Point `DEVNODE_BIN` at the binary, or set
//! `DEBUG_MODE=true` to attach to one already listening on the debug ports.

use std::sync::Arc;

use devnode_core::ErrorDescriptor;
use devnode_runner_local::launcher_from_env;
use devnode_testing_core::{
    config::HarnessConfig,
    nodes::{substrate::SubstrateConnector, SigningIdentity as _},
    scenario::{DescribeDev, DevTestContext, DynError},
};
use serial_test::serial;
use tests::{common::calls::transfer, init_test_tracing};

type NodeContext = Arc<DevTestContext<SubstrateConnector>>;

async fn self_transfer_of_zero_succeeds(ctx: NodeContext) -> Result<(), DynError> {
    let me = ctx.signer().account_id();
    let response = ctx.create_block(transfer(&me, 0)).await?;
    let result = response.result.ok_or("no result for a submitted transfer")?;
    let outcome = result.as_single().ok_or("expected a single outcome")?;
    if !outcome.successful {
        return Err(format!("transfer failed: {:?}", outcome.error).into());
    }
    if outcome.extrinsic.is_none() {
        return Err("transfer not found in block".into());
    }
    Ok(())
}

async fn overdraft_reports_insufficient_balance(ctx: NodeContext) -> Result<(), DynError> {
    let me = ctx.signer().account_id();
    let response = ctx.create_block(transfer(&me, u128::MAX)).await?;
    let result = response.result.ok_or("no result for a submitted transfer")?;
    let outcome = result.as_single().ok_or("expected a single outcome")?;
    if outcome.successful {
        return Err("overdraft unexpectedly succeeded".into());
    }
    match &outcome.error {
        Some(ErrorDescriptor::Module(info)) if info.name == "InsufficientBalance" => Ok(()),
        other => Err(format!("unexpected error {other:?}").into()),
    }
}

async fn empty_blocks_chain_up(ctx: NodeContext) -> Result<(), DynError> {
    let first = ctx.create_empty_block().await?;
    let second = ctx.create_empty_block().await?;
    if first.result.is_some() || second.result.is_some() {
        return Err("empty blocks carried a result".into());
    }
    if first.block.hash == second.block.hash {
        return Err("two blocks share a hash".into());
    }
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "needs a dev node binary"]
async fn balances_on_a_dev_node() {
    init_test_tracing();
    let config = HarnessConfig::from_env().unwrap();
    let connector = SubstrateConnector::new(config.ethereum.clone());

    let report = DescribeDev::new("balances")
        .with_config(config)
        .scenario("self transfer of zero succeeds", self_transfer_of_zero_succeeds)
        .scenario(
            "overdraft reports insufficient balance",
            overdraft_reports_insufficient_balance,
        )
        .scenario("empty blocks chain up", empty_blocks_chain_up)
        .run(launcher_from_env().as_ref(), connector)
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert!(report.teardown.is_clean(), "{:?}", report.teardown);
}
