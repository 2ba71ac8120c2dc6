//! Scenario groups sharing one dev node, and the context every scenario in a
//! group runs against.

mod context;
mod group;
mod harness;

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub use context::DevTestContext;
pub use group::{
    DescribeDev, GroupError, GroupReport, Scenario, ScenarioFailure, ScenarioReport,
};
pub use harness::{DevHarness, HarnessState, SetupError, TeardownReport};
