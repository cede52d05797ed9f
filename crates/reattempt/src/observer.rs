//! Retry observation and logging
//!
//! The executor itself is silent; everything worth reporting flows through
//! the [`RetryObserver`] trait. [`TracingObserver`] logs events with the
//! `tracing` crate, [`StatsObserver`] counts them, [`NoOpObserver`] discards
//! them. Observation never changes control flow.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::failure::Failure;

/// Observer trait for retry lifecycle events.
///
/// Implement this to hook logging, metrics, or test assertions into a
/// [`RetryExecutor`](crate::RetryExecutor).
pub trait RetryObserver: Send + Sync {
    /// Called before each attempt, with the 1-based attempt number and the
    /// effective attempt budget.
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    /// Called when an attempt fails and a retry will follow, with the delay
    /// about to be waited.
    fn on_attempt_failed(&self, attempt: u32, failure: &Failure, delay: Duration);

    /// Called when the operation succeeds, with the total elapsed time
    /// across all attempts.
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when the final permitted attempt fails.
    fn on_exhausted(&self, attempts: u32, failure: &Failure);

    /// Called when a failure is propagated without retrying: a fatal
    /// failure in recoverable-only mode, or an excluded category.
    fn on_not_retryable(&self, attempt: u32, failure: &Failure) {
        let _ = (attempt, failure);
    }

    /// Called when an interruption signal aborts a backoff wait.
    fn on_interrupted(&self, attempt: u32) {
        let _ = attempt;
    }
}

/// An observer that does nothing. The executor default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _failure: &Failure, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _failure: &Failure) {}
}

/// An observer that logs retry events using the `tracing` crate.
///
/// Levels: attempt start at DEBUG, failed attempts and non-retryable
/// failures at WARN, success at INFO when it took more than one attempt
/// (DEBUG otherwise), exhaustion at ERROR.
///
/// # Example
///
/// ```rust
/// use reattempt::TracingObserver;
///
/// let observer = TracingObserver::new("fetch-manifest");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried, for log context.
    operation: String,
}

impl TracingObserver {
    /// Create a tracing observer named after the operation being retried.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt,
            max_attempts,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, failure: &Failure, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt,
            category = %failure.category(),
            error = %failure,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, failure: &Failure) {
        tracing::error!(
            operation = %self.operation,
            attempts,
            category = %failure.category(),
            error = %failure,
            "attempt budget exhausted"
        );
    }

    fn on_not_retryable(&self, attempt: u32, failure: &Failure) {
        tracing::warn!(
            operation = %self.operation,
            attempt,
            category = %failure.category(),
            error = %failure,
            "failure is not retryable"
        );
    }

    fn on_interrupted(&self, attempt: u32) {
        tracing::warn!(
            operation = %self.operation,
            attempt,
            "backoff wait interrupted"
        );
    }
}

/// An observer that counts retry events.
///
/// The test suite uses it to pin invocation and wait counts; it also works
/// as a cheap metrics source.
#[derive(Debug, Default)]
pub struct StatsObserver {
    attempt_starts: AtomicU32,
    failures: AtomicU32,
    successes: AtomicU32,
    exhaustions: AtomicU32,
    not_retryable: AtomicU32,
    interruptions: AtomicU32,
}

impl StatsObserver {
    /// Create a stats observer with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempts started. Equals the number of operation
    /// invocations.
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts.load(Ordering::SeqCst)
    }

    /// Number of failed attempts that led to a retry. Equals the number of
    /// backoff waits begun.
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Number of successes (zero or one per execution).
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Number of exhaustion events.
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(Ordering::SeqCst)
    }

    /// Number of failures propagated without any retry.
    pub fn not_retryable(&self) -> u32 {
        self.not_retryable.load(Ordering::SeqCst)
    }

    /// Number of interrupted backoff waits.
    pub fn interruptions(&self) -> u32 {
        self.interruptions.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {
        self.attempt_starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _failure: &Failure, _delay: Duration) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _failure: &Failure) {
        self.exhaustions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_not_retryable(&self, _attempt: u32, _failure: &Failure) {
        self.not_retryable.fetch_add(1, Ordering::SeqCst);
    }

    fn on_interrupted(&self, _attempt: u32) {
        self.interruptions.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, failure: &Failure, delay: Duration) {
        (**self).on_attempt_failed(attempt, failure, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, failure: &Failure) {
        (**self).on_exhausted(attempts, failure)
    }

    fn on_not_retryable(&self, attempt: u32, failure: &Failure) {
        (**self).on_not_retryable(attempt, failure)
    }

    fn on_interrupted(&self, attempt: u32) {
        (**self).on_interrupted(attempt)
    }
}

impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, failure: &Failure, delay: Duration) {
        (**self).on_attempt_failed(attempt, failure, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, failure: &Failure) {
        (**self).on_exhausted(attempts, failure)
    }

    fn on_not_retryable(&self, attempt: u32, failure: &Failure) {
        (**self).on_not_retryable(attempt, failure)
    }

    fn on_interrupted(&self, attempt: u32) {
        (**self).on_interrupted(attempt)
    }
}
