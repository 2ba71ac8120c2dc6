use std::{fmt, future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tokio::time::{sleep, timeout, Instant};

/// Bounded exponential backoff used wherever the node is only eventually
/// consistent with the call that changed it.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub initial_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub max_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(initial_delay: Duration, max_delay: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            timeout,
            multiplier: 2,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_delay)
    }
}

#[derive(Debug)]
pub struct PollTimeout<E> {
    pub waited: Duration,
    pub attempts: u32,
    pub last_error: Option<E>,
}

impl<E: fmt::Display> fmt::Display for PollTimeout<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts over {:?}",
            self.attempts, self.waited
        )?;
        if let Some(error) = &self.last_error {
            write!(f, " (last error: {error})")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for PollTimeout<E> {}

/// Runs `probe` until it yields `Some`, sleeping with backoff in between.
/// Probe errors are treated as "not yet" and kept for the timeout report.
pub async fn poll_until<T, E, F, Fut>(policy: &RetryPolicy, mut probe: F) -> Result<T, PollTimeout<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let mut attempts = 0;
    let mut last_error = None;

    let polling = async {
        let mut delay = policy.initial_delay;
        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => return value,
                Ok(None) => {}
                Err(error) => last_error = Some(error),
            }
            sleep(delay).await;
            delay = policy.next_delay(delay);
        }
    };

    let outcome = timeout(policy.timeout, polling).await;
    match outcome {
        Ok(value) => Ok(value),
        Err(_) => Err(PollTimeout {
            waited: started.elapsed(),
            attempts,
            last_error,
        }),
    }
}
