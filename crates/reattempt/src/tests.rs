//! Integration tests for the retry executor
//!
//! These pin the externally observable contract: invocation counts, wait
//! counts, the delay schedule, and terminal failure identity.

use std::error::Error;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::backoff::delay_for;
use crate::executor::{retry, RetryExecutorBuilder};
use crate::failure::{Category, Failure};
use crate::observer::{RetryObserver, StatsObserver};
use crate::policy::{RetryMode, RetryPolicy};

/// Observer that records the event sequence as readable tags.
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RetryObserver for RecordingObserver {
    fn on_attempt_start(&self, attempt: u32, _max_attempts: u32) {
        self.push(format!("start:{attempt}"));
    }

    fn on_attempt_failed(&self, attempt: u32, _failure: &Failure, _delay: Duration) {
        self.push(format!("failed:{attempt}"));
    }

    fn on_success(&self, attempt: u32, _total_duration: Duration) {
        self.push(format!("success:{attempt}"));
    }

    fn on_exhausted(&self, attempts: u32, _failure: &Failure) {
        self.push(format!("exhausted:{attempts}"));
    }

    fn on_not_retryable(&self, attempt: u32, _failure: &Failure) {
        self.push(format!("not-retryable:{attempt}"));
    }

    fn on_interrupted(&self, attempt: u32) {
        self.push(format!("interrupted:{attempt}"));
    }
}

// ============================================================================
// Success paths
// ============================================================================

#[tokio::test]
async fn success_on_first_attempt_short_circuits() {
    let observer = Arc::new(StatsObserver::new());

    let result = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(5))
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Ok::<_, Failure>("done") })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.failures(), 0);
    assert_eq!(observer.successes(), 1);
}

#[tokio::test]
async fn success_after_recoverable_failures() {
    let observer = Arc::new(StatsObserver::new());

    let result = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .build()
        .execute(|attempt| async move {
            if attempt <= 2 {
                Err(Failure::recoverable("timeout", "not yet"))
            } else {
                Ok(attempt)
            }
        })
        .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.failures(), 2);
    assert_eq!(observer.successes(), 1);
}

// ============================================================================
// Exhaustion
// ============================================================================

#[tokio::test]
async fn exhaustion_propagates_final_attempt_failure() {
    let observer = Arc::new(StatsObserver::new());

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .build()
        .execute(|attempt| async move {
            Err(Failure::recoverable(
                "timeout",
                format!("attempt {attempt} timed out"),
            ))
        })
        .await;

    let failure = result.unwrap_err();
    assert_eq!(failure.category(), &Category::from_static("timeout"));
    // The terminal failure is the final attempt's own object, not a wrapper.
    assert_eq!(failure.message(), "attempt 3 timed out");
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.failures(), 2);
    assert_eq!(observer.exhaustions(), 1);
}

#[tokio::test]
async fn never_exceeds_attempt_budget() {
    let invocations = Arc::new(AtomicU32::new(0));
    let counter = invocations.clone();

    let result: Result<(), Failure> = retry(&RetryPolicy::with_max_attempts(2), |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Failure::recoverable("timeout", "always fails"))
        }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(invocations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_max_attempts_runs_once() {
    let observer = Arc::new(StatsObserver::new());

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(0))
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::recoverable("timeout", "single shot")) })
        .await;

    assert!(result.is_err());
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.failures(), 0);
    assert_eq!(observer.exhaustions(), 1);
}

// ============================================================================
// Failure classification
// ============================================================================

#[tokio::test]
async fn fatal_short_circuits_in_recoverable_only_mode() {
    let observer = Arc::new(StatsObserver::new());

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::fatal("assertion", "invariant violated")) })
        .await;

    let failure = result.unwrap_err();
    assert!(failure.is_fatal());
    assert_eq!(failure.message(), "invariant violated");
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.failures(), 0);
    assert_eq!(observer.not_retryable(), 1);
}

#[tokio::test]
async fn fatal_is_retried_in_any_failure_mode() {
    let observer = Arc::new(StatsObserver::new());
    let policy = RetryPolicy::with_max_attempts(3).with_mode(RetryMode::AnyFailure);

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::fatal("assertion", "flaky assertion")) })
        .await;

    assert!(result.is_err());
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.exhaustions(), 1);
}

#[tokio::test]
async fn excluded_category_short_circuits() {
    let observer = Arc::new(StatsObserver::new());
    let policy = RetryPolicy::with_max_attempts(3).exclude("index-out-of-range");

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::recoverable("index-out-of-range", "oob")) })
        .await;

    let failure = result.unwrap_err();
    assert_eq!(failure.category(), &Category::from_static("index-out-of-range"));
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.not_retryable(), 1);
}

#[tokio::test]
async fn exclusion_requires_exact_category_match() {
    let observer = Arc::new(StatsObserver::new());
    // Excluding the general tag must not cover the more specific one.
    let policy = RetryPolicy::with_max_attempts(3).exclude("runtime-failure");

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::recoverable("index-out-of-range", "oob")) })
        .await;

    let failure = result.unwrap_err();
    assert_eq!(failure.category(), &Category::from_static("index-out-of-range"));
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.exhaustions(), 1);
}

#[tokio::test]
async fn exclusions_also_apply_in_any_failure_mode() {
    let observer = Arc::new(StatsObserver::new());
    let policy = RetryPolicy::with_max_attempts(3)
        .with_mode(RetryMode::AnyFailure)
        .exclude("assertion");

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_observer(observer.clone())
        .build()
        .execute(|_| async { Err(Failure::fatal("assertion", "boom")) })
        .await;

    assert!(result.is_err());
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.not_retryable(), 1);
}

#[tokio::test]
async fn terminal_failure_preserves_source_chain() {
    let result: Result<(), Failure> = retry(&RetryPolicy::with_max_attempts(2), |_| async {
        Err(Failure::recoverable("io", "read failed")
            .with_source(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")))
    })
    .await;

    let failure = result.unwrap_err();
    let source = failure.source().expect("cause survives retries");
    assert!(source.to_string().contains("reset by peer"));
}

// ============================================================================
// Interruption
// ============================================================================

#[tokio::test]
async fn interrupt_aborts_backoff_wait() {
    let observer = Arc::new(StatsObserver::new());
    let (interrupt_tx, interrupt_rx) = watch::channel(());
    interrupt_tx.send(()).unwrap();

    let result: Result<(), Failure> = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .with_interrupt(interrupt_rx)
        .build()
        .execute(|_| async { Err(Failure::recoverable("timeout", "slow")) })
        .await;

    let failure = result.unwrap_err();
    assert!(failure.is_interruption());
    assert_eq!(failure.category(), &Category::INTERRUPTED);
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.failures(), 1);
    assert_eq!(observer.interruptions(), 1);
}

#[tokio::test]
async fn dropped_interrupt_sender_disarms_the_signal() {
    let observer = Arc::new(StatsObserver::new());
    let (interrupt_tx, interrupt_rx) = watch::channel(());
    drop(interrupt_tx);

    let result = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .with_interrupt(interrupt_rx)
        .build()
        .execute(|attempt| async move {
            if attempt < 3 {
                Err(Failure::recoverable("timeout", "not yet"))
            } else {
                Ok("made it")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "made it");
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.interruptions(), 0);
}

// ============================================================================
// Backoff schedule
// ============================================================================

#[test]
fn backoff_schedule_matches_contract() {
    assert_eq!(delay_for(1), Duration::from_millis(200));
    assert_eq!(delay_for(2), Duration::from_millis(400));
    assert_eq!(delay_for(3), Duration::from_millis(800));
    assert_eq!(delay_for(4), Duration::from_millis(1_600));
    assert_eq!(delay_for(5), Duration::from_millis(3_200));
    assert_eq!(delay_for(6), Duration::from_millis(6_400));
    assert_eq!(delay_for(7), Duration::from_millis(12_800));
}

// ============================================================================
// Observer sequence
// ============================================================================

#[tokio::test]
async fn observer_sees_events_in_order() {
    let observer = Arc::new(RecordingObserver::default());

    let result = RetryExecutorBuilder::new()
        .with_policy(RetryPolicy::with_max_attempts(3))
        .with_observer(observer.clone())
        .build()
        .execute(|attempt| async move {
            if attempt < 3 {
                Err(Failure::recoverable("timeout", "not yet"))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        observer.events(),
        vec![
            "start:1", "failed:1", "start:2", "failed:2", "start:3", "success:3",
        ]
    );
}

// ============================================================================
// Policy configuration
// ============================================================================

#[test]
fn policy_deserializes_with_defaults() {
    let policy: RetryPolicy = serde_yaml_ng::from_str("{}").unwrap();

    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.mode, RetryMode::RecoverableOnly);
    assert!(policy.exclusions.is_empty());
}

#[test]
fn policy_deserializes_from_config_fragment() {
    let yaml = r#"
max-attempts: 2
mode: any-failure
exclusions:
  - index-out-of-range
"#;
    let policy: RetryPolicy = serde_yaml_ng::from_str(yaml).unwrap();

    assert_eq!(policy.max_attempts, 2);
    assert_eq!(policy.mode, RetryMode::AnyFailure);
    assert!(policy
        .exclusions
        .contains(&Category::from_static("index-out-of-range")));
}
