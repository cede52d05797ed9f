//! Retry execution engine
//!
//! Drives a fallible operation under a [`RetryPolicy`]: invoke, classify the
//! failure, wait out the backoff delay, repeat. Attempts are strictly
//! sequential; the backoff wait is the only suspension point per iteration.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time;

use crate::backoff::delay_for;
use crate::failure::Failure;
use crate::observer::{NoOpObserver, RetryObserver};
use crate::policy::RetryPolicy;

/// Run `op` under `policy` with default observation.
///
/// The operation receives the 1-based attempt number. The terminal failure,
/// when there is one, is the operation's own failure object: the first
/// non-retryable one, or the one from the final permitted attempt.
///
/// # Example
///
/// ```rust,no_run
/// use reattempt::{retry, Failure, RetryPolicy};
///
/// async fn example() -> Result<String, Failure> {
///     retry(&RetryPolicy::with_max_attempts(3), |attempt| async move {
///         if attempt < 3 {
///             Err(Failure::recoverable("timeout", "upstream is slow"))
///         } else {
///             Ok("response".to_string())
///         }
///     })
///     .await
/// }
/// ```
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, op: F) -> Result<T, Failure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    RetryExecutorBuilder::new()
        .with_policy(policy.clone())
        .build()
        .execute(op)
        .await
}

/// Builder for configuring a [`RetryExecutor`].
///
/// # Example
///
/// ```rust
/// use reattempt::{RetryExecutorBuilder, RetryPolicy, TracingObserver};
///
/// let executor = RetryExecutorBuilder::new()
///     .with_policy(RetryPolicy::with_max_attempts(3))
///     .with_observer(TracingObserver::new("download"))
///     .build();
/// ```
pub struct RetryExecutorBuilder<O = NoOpObserver> {
    policy: RetryPolicy,
    observer: O,
    interrupt: Option<watch::Receiver<()>>,
}

impl RetryExecutorBuilder<NoOpObserver> {
    /// Create a builder with the default policy and no observation.
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::default(),
            observer: NoOpObserver,
            interrupt: None,
        }
    }
}

impl Default for RetryExecutorBuilder<NoOpObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> RetryExecutorBuilder<O> {
    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the observer receiving lifecycle callbacks.
    pub fn with_observer<O2>(self, observer: O2) -> RetryExecutorBuilder<O2> {
        RetryExecutorBuilder {
            policy: self.policy,
            observer,
            interrupt: self.interrupt,
        }
    }

    /// Arm the executor with an interruption signal.
    ///
    /// A message on the channel during a backoff wait aborts the wait and
    /// surfaces [`Failure::interrupted`] out of [`RetryExecutor::execute`]
    /// immediately; it is never retried. Dropping every sender disarms the
    /// signal and the wait completes normally.
    pub fn with_interrupt(mut self, signal: watch::Receiver<()>) -> Self {
        self.interrupt = Some(signal);
        self
    }

    /// Build the executor.
    pub fn build(self) -> RetryExecutor<O> {
        RetryExecutor {
            policy: self.policy,
            observer: self.observer,
            interrupt: self.interrupt,
        }
    }
}

/// A retry executor with a configured policy, observer, and interruption
/// signal.
///
/// Use [`RetryExecutorBuilder`] to create one. The executor holds no mutable
/// state; concurrent `execute` calls are independent.
pub struct RetryExecutor<O> {
    policy: RetryPolicy,
    observer: O,
    interrupt: Option<watch::Receiver<()>>,
}

impl<O> RetryExecutor<O>
where
    O: RetryObserver,
{
    /// Execute an operation under this executor's policy.
    ///
    /// The operation is invoked at least once and at most `max_attempts`
    /// times, strictly sequentially. Success returns immediately with no
    /// further invocation and no delay; the final permitted attempt's
    /// failure propagates with no delay.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, Failure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let budget = self.policy.attempt_budget();
        let start = Instant::now();
        let mut interrupt = self.interrupt.clone();

        let mut attempt = 1u32;
        loop {
            self.observer.on_attempt_start(attempt, budget);

            match op(attempt).await {
                Ok(value) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(value);
                }
                Err(failure) => {
                    if !self.policy.should_retry(&failure) {
                        self.observer.on_not_retryable(attempt, &failure);
                        return Err(failure);
                    }

                    if attempt >= budget {
                        self.observer.on_exhausted(attempt, &failure);
                        return Err(failure);
                    }

                    let delay = delay_for(attempt);
                    self.observer.on_attempt_failed(attempt, &failure, delay);

                    if let Err(interruption) = wait_backoff(delay, interrupt.as_mut()).await {
                        self.observer.on_interrupted(attempt);
                        return Err(interruption);
                    }

                    attempt += 1;
                }
            }
        }
    }
}

/// Wait out one backoff delay, racing the interruption signal when armed.
async fn wait_backoff(
    delay: Duration,
    interrupt: Option<&mut watch::Receiver<()>>,
) -> Result<(), Failure> {
    let Some(signal) = interrupt else {
        time::sleep(delay).await;
        return Ok(());
    };

    let sleep = time::sleep(delay);
    tokio::pin!(sleep);

    tokio::select! {
        () = &mut sleep => return Ok(()),
        changed = signal.changed() => {
            if changed.is_ok() {
                return Err(Failure::interrupted());
            }
        }
    }

    // Every sender is gone, so no interruption can arrive; wait out the rest.
    sleep.await;
    Ok(())
}
