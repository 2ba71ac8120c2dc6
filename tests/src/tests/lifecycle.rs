use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use devnode_testing_core::{
    mock::{MockChain, MockConnector, MockLauncher},
    nodes::{ChainConnection as _, ConnectionError, LaunchError, LaunchOptions},
    scenario::{
        DescribeDev, DevHarness, DynError, GroupError, HarnessState, Scenario, ScenarioFailure,
        SetupError,
    },
};
use tests::{
    common::mock::{fast_config, ready_harness, MockContext},
    init_test_tracing,
};

async fn opens_two_connections(ctx: MockContext) -> Result<(), DynError> {
    let first = ctx.create_connection().await?;
    let second = ctx.create_connection().await?;
    first.is_ready().await?;
    second.is_ready().await?;
    Ok(())
}

async fn fails(_: MockContext) -> Result<(), DynError> {
    Err("assertion did not hold".into())
}

async fn panics(_: MockContext) -> Result<(), DynError> {
    panic!("scenario blew up")
}

async fn hangs(_: MockContext) -> Result<(), DynError> {
    tokio::time::sleep(Duration::from_secs(60)).await;
    Ok(())
}

async fn seals_a_block(ctx: MockContext) -> Result<(), DynError> {
    ctx.create_empty_block().await?;
    Ok(())
}

struct ExpectsRpcPort(u16);

#[async_trait]
impl Scenario<MockConnector> for ExpectsRpcPort {
    fn name(&self) -> &str {
        "node answers on the configured rpc port"
    }

    async fn run(&self, ctx: MockContext) -> Result<(), DynError> {
        if ctx.rpc_port() == self.0 {
            Ok(())
        } else {
            Err(format!("rpc port {} != {}", ctx.rpc_port(), self.0).into())
        }
    }
}

#[tokio::test]
async fn teardown_closes_every_connection_after_failures() {
    init_test_tracing();
    let chain = MockChain::new();

    let report = DescribeDev::new("failures do not leak connections")
        .with_config(fast_config())
        .with_scenario_timeout(Duration::from_millis(200))
        .scenario("opens two connections", opens_two_connections)
        .scenario("fails", fails)
        .scenario("panics", panics)
        .scenario("hangs", hangs)
        .scenario("seals a block afterwards", seals_a_block)
        .run(&MockLauncher::new(), MockConnector::new(chain.clone()))
        .await
        .unwrap();

    let outcomes: Vec<_> = report
        .scenarios
        .iter()
        .map(|s| (s.name.as_str(), &s.outcome))
        .collect();
    assert!(matches!(outcomes[0], ("opens two connections", Ok(()))));
    assert!(matches!(outcomes[1], ("fails", Err(ScenarioFailure::Failed(_)))));
    assert!(
        matches!(outcomes[2], ("panics", Err(ScenarioFailure::Panicked(message))) if message == "scenario blew up")
    );
    assert!(matches!(outcomes[3], ("hangs", Err(ScenarioFailure::TimedOut(_)))));
    assert!(matches!(outcomes[4], ("seals a block afterwards", Ok(()))));
    assert_eq!(chain.block_count(), 1);

    assert_eq!(report.teardown.disconnected, 3);
    assert!(report.teardown.is_clean());
    assert_eq!(chain.disconnects(), 3);
    assert_eq!(report.failures().len(), 3);

    match report.into_result() {
        Err(GroupError::Scenarios { failed, .. }) => {
            let names: Vec<_> = failed.0.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["fails", "panics", "hangs"]);
        }
        other => panic!("expected failing scenarios, got {other:?}"),
    }
}

#[tokio::test]
async fn passing_groups_convert_to_ok() {
    let chain = MockChain::new();
    let config = fast_config();
    let expected_port = config.debug_ports.rpc;

    let report = DescribeDev::new("passing")
        .with_config(config)
        .with_scenario(ExpectsRpcPort(expected_port))
        .scenario("seals", seals_a_block)
        .run(&MockLauncher::new(), MockConnector::new(chain.clone()))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert_eq!(report.scenarios.len(), 2);
    assert!(report.failures().is_empty());
    assert_eq!(report.teardown.disconnected, 1);
    assert!(!report.teardown.terminated);
}

#[tokio::test]
async fn launch_failures_skip_connecting_and_scenarios() {
    let chain = MockChain::new();
    let connector = MockConnector::new(chain.clone());
    let launcher = MockLauncher::failing();

    let err = DescribeDev::new("never starts")
        .with_config(fast_config())
        .scenario("would seal", seals_a_block)
        .run(&launcher, connector.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GroupError::Setup {
            source: SetupError::Launch(LaunchError::Timeout(_)),
            ..
        }
    ));
    assert_eq!(launcher.launches(), 1);
    assert_eq!(connector.connects(), 0);
    assert_eq!(chain.block_count(), 0);
}

#[tokio::test]
async fn connect_failures_are_setup_errors() {
    let chain = MockChain::new();
    let err = DescribeDev::new("unreachable")
        .with_config(fast_config())
        .scenario("would seal", seals_a_block)
        .run(&MockLauncher::new(), MockConnector::failing(chain.clone()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GroupError::Setup {
            source: SetupError::Connect(ConnectionError::Backend(_)),
            ..
        }
    ));
    assert_eq!(chain.block_count(), 0);
}

#[tokio::test]
async fn nodes_that_never_become_ready_are_disconnected() {
    let chain = MockChain::new();
    chain.set_ready_after(usize::MAX);
    let mut harness = DevHarness::new();

    let Err(err) = harness
        .setup(
            &MockLauncher::new(),
            MockConnector::new(chain.clone()),
            fast_config(),
            &LaunchOptions::default(),
        )
        .await
    else {
        panic!("setup should fail");
    };

    assert!(matches!(err, SetupError::NotReady(ref timeout) if timeout.attempts > 1));
    assert_eq!(chain.disconnects(), 1);
    assert_eq!(harness.state(), HarnessState::Uninitialized);
    assert!(harness.teardown().await.is_clean());
}

#[tokio::test]
async fn teardown_is_idempotent() {
    let chain = MockChain::new();
    let (mut harness, ctx) = ready_harness(&chain).await;
    assert_eq!(harness.state(), HarnessState::Ready);

    let first = harness.teardown().await;
    let second = harness.teardown().await;

    assert_eq!(first.disconnected, 1);
    assert_eq!(second.disconnected, 0);
    assert!(second.is_clean());
    assert_eq!(harness.state(), HarnessState::TornDown);
    assert!(harness.context().is_none());
    assert_eq!(chain.disconnects(), 1);

    let err = ctx.create_empty_block().await.unwrap_err();
    assert!(err.to_string().contains("closed"), "{err}");
}

#[tokio::test]
async fn harnesses_cannot_be_set_up_twice() {
    let chain = MockChain::new();
    let (mut harness, _ctx) = ready_harness(&chain).await;

    let Err(err) = harness
        .setup(
            &MockLauncher::new(),
            MockConnector::new(chain.clone()),
            fast_config(),
            &LaunchOptions::default(),
        )
        .await
    else {
        panic!("setup should fail");
    };
    assert!(matches!(err, SetupError::AlreadySetUp));
    harness.teardown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn spawned_processes_are_stopped_at_teardown() {
    let chain = MockChain::new();
    let launcher = MockLauncher::new().with_process("sleep", &["30"]);

    let report = DescribeDev::new("owns a process")
        .with_config(fast_config())
        .scenario("seals", seals_a_block)
        .run(&launcher, MockConnector::new(chain.clone()))
        .await
        .unwrap()
        .into_result()
        .unwrap();

    assert!(report.teardown.terminated);
    assert!(report.teardown.is_clean());
}

#[tokio::test]
async fn extra_connections_close_with_the_primary() {
    let chain = MockChain::new();
    let (mut harness, ctx) = ready_harness(&chain).await;
    let extra = ctx.create_connection().await.unwrap();

    assert!(Arc::strong_count(&extra) >= 2);
    assert!(!extra.is_closed());
    harness.teardown().await;
    assert!(extra.is_closed());
    assert!(ctx.connection().is_closed());
}
