pub mod block;
pub mod config;
pub mod logging;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod nodes;
pub mod pool;
pub mod retry;
pub mod scenario;

use std::{env, ops::Mul as _, sync::LazyLock, time::Duration};

static IS_SLOW_TEST_ENV: LazyLock<bool> =
    LazyLock::new(|| env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true"));

/// Attach to an already running node on the debug ports instead of spawning
/// one.
pub static IS_DEBUG_MODE: LazyLock<bool> =
    LazyLock::new(|| env::var("DEBUG_MODE").is_ok_and(|s| s == "true"));

/// In slow test environments like Codecov, use 2x timeout.
#[must_use]
pub fn adjust_timeout(d: Duration) -> Duration {
    if *IS_SLOW_TEST_ENV { d.mul(2) } else { d }
}
