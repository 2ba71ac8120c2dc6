use std::{sync::Arc, time::Duration};

use devnode_core::RuntimeCall;
use devnode_testing_core::{
    config::HarnessConfig,
    mock::{MockChain, MockConnector, MockLauncher},
    nodes::LaunchOptions,
    retry::RetryPolicy,
    scenario::{DevHarness, DevTestContext},
};

pub type MockContext = Arc<DevTestContext<MockConnector>>;

#[must_use]
pub fn fast_config() -> HarnessConfig {
    let fast = RetryPolicy::new(
        Duration::from_millis(1),
        Duration::from_millis(10),
        Duration::from_millis(500),
    );
    HarnessConfig {
        scenario_timeout: Duration::from_secs(5),
        readiness: fast,
        receipt_settling: fast,
        ..HarnessConfig::default()
    }
}

/// A ready harness over `chain`, for tests that drive the context directly.
pub async fn ready_harness(chain: &MockChain) -> (DevHarness<MockConnector>, MockContext) {
    let mut harness = DevHarness::new();
    let ctx = harness
        .setup(
            &MockLauncher::new(),
            MockConnector::new(chain.clone()),
            fast_config(),
            &LaunchOptions::default(),
        )
        .await
        .expect("mock harness setup");
    (harness, ctx)
}

/// A call the mock runtime rejects with `BadOrigin`.
#[must_use]
pub fn bad_origin() -> RuntimeCall {
    RuntimeCall::new("Mock", "bad_origin", Vec::new())
}
