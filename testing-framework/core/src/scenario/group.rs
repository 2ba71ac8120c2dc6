use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::FutureExt as _;
use tokio::time::{timeout, Instant};

use super::{DevHarness, DevTestContext, DynError, SetupError, TeardownReport};
use crate::{
    adjust_timeout,
    config::HarnessConfig,
    nodes::{Connector, LaunchOptions, NodeLauncher, RuntimeVariant},
};

#[async_trait]
pub trait Scenario<K: Connector>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: Arc<DevTestContext<K>>) -> Result<(), DynError>;
}

struct FnScenario<F> {
    name: String,
    body: F,
}

#[async_trait]
impl<K, F, Fut> Scenario<K> for FnScenario<F>
where
    K: Connector,
    F: Fn(Arc<DevTestContext<K>>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DynError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: Arc<DevTestContext<K>>) -> Result<(), DynError> {
        (self.body)(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioFailure {
    #[error(transparent)]
    Failed(DynError),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    pub duration: Duration,
    pub outcome: Result<(), ScenarioFailure>,
}

impl ScenarioReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct GroupReport {
    pub title: String,
    pub scenarios: Vec<ScenarioReport>,
    pub teardown: TeardownReport,
}

impl GroupReport {
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed()).collect()
    }

    pub fn into_result(self) -> Result<Self, GroupError> {
        if self.scenarios.iter().all(ScenarioReport::passed) {
            return Ok(self);
        }
        let failed = self
            .scenarios
            .into_iter()
            .filter(|s| !s.passed())
            .collect();
        Err(GroupError::Scenarios {
            title: self.title,
            failed: FailedScenarios(failed),
        })
    }
}

#[derive(Debug)]
pub struct FailedScenarios(pub Vec<ScenarioReport>);

impl fmt::Display for FailedScenarios {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, report) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if let Err(failure) = &report.outcome {
                write!(f, "{}: {failure}", report.name)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("setup of `{title}` failed: {source}")]
    Setup {
        title: String,
        #[source]
        source: SetupError,
    },
    #[error("`{title}` had failing scenarios: {failed}")]
    Scenarios {
        title: String,
        failed: FailedScenarios,
    },
}

/// Named scenarios run one after another against a single dev node.
pub struct DescribeDev<K: Connector> {
    title: String,
    options: LaunchOptions,
    config: HarnessConfig,
    scenarios: Vec<Box<dyn Scenario<K>>>,
}

impl<K: Connector> DescribeDev<K> {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            options: LaunchOptions::default(),
            config: HarnessConfig::default(),
            scenarios: Vec::new(),
        }
    }

    #[must_use]
    pub fn runtime(mut self, runtime: RuntimeVariant) -> Self {
        self.options.runtime = runtime;
        self
    }

    #[must_use]
    pub const fn with_genesis_wasm(mut self) -> Self {
        self.options.with_genesis_wasm = true;
        self
    }

    #[must_use]
    pub const fn forked(mut self) -> Self {
        self.options.forked = true;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.config.scenario_timeout = timeout;
        self
    }

    #[must_use]
    pub fn scenario<F, Fut>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Arc<DevTestContext<K>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        self.scenarios.push(Box::new(FnScenario {
            name: name.into(),
            body,
        }));
        self
    }

    #[must_use]
    pub fn with_scenario<S>(mut self, scenario: S) -> Self
    where
        S: Scenario<K> + 'static,
    {
        self.scenarios.push(Box::new(scenario));
        self
    }

    /// Sets up the node, runs every scenario under the per-scenario timeout
    /// and always tears down once setup succeeded.
    pub async fn run<L>(self, launcher: &L, connector: K) -> Result<GroupReport, GroupError>
    where
        L: NodeLauncher + ?Sized,
    {
        let Self {
            title,
            options,
            config,
            scenarios,
        } = self;
        let scenario_timeout = adjust_timeout(config.scenario_timeout);

        let mut harness = DevHarness::new();
        let ctx = match harness.setup(launcher, connector, config, &options).await {
            Ok(ctx) => ctx,
            Err(source) => {
                tracing::error!(%title, "setup failed: {source}");
                return Err(GroupError::Setup { title, source });
            }
        };

        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in &scenarios {
            let name = scenario.name().to_owned();
            tracing::info!(group = %title, scenario = %name, "running scenario");
            let started = Instant::now();

            let run = AssertUnwindSafe(scenario.run(Arc::clone(&ctx))).catch_unwind();
            let outcome = match timeout(scenario_timeout, run).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(ScenarioFailure::Failed(e)),
                Ok(Err(panic)) => Err(ScenarioFailure::Panicked(panic_message(panic))),
                Err(_) => Err(ScenarioFailure::TimedOut(scenario_timeout)),
            };
            if let Err(failure) = &outcome {
                tracing::warn!(group = %title, scenario = %name, "scenario failed: {failure}");
            }
            reports.push(ScenarioReport {
                name,
                duration: started.elapsed(),
                outcome,
            });
        }

        drop(ctx);
        let teardown = harness.teardown().await;
        let report = GroupReport {
            title,
            scenarios: reports,
            teardown,
        };
        tracing::info!(
            group = %report.title,
            scenarios = report.scenarios.len(),
            failed = report.failures().len(),
            "scenario group finished"
        );
        Ok(report)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic.downcast::<String>().map_or_else(
        |panic| {
            panic.downcast::<&'static str>().map_or_else(
                |_| "unknown panic".to_owned(),
                |message| (*message).to_owned(),
            )
        },
        |message| *message,
    )
}
