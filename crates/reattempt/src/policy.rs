//! Retry policy configuration
//!
//! Policies are plain data. They deserialize from kebab-case config files
//! with every field defaulted, so a service can ship its retry settings
//! alongside the rest of its configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::failure::{Category, Failure, Severity};

/// How the executor treats failure severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryMode {
    /// Retry only recoverable failures; a fatal failure propagates on first
    /// occurrence regardless of the attempt budget (default).
    #[default]
    RecoverableOnly,

    /// Retry any failure, recoverable or fatal, subject to the exclusion
    /// set. Intended for test harnesses where assertion failures should be
    /// ridden out like ordinary flakiness.
    AnyFailure,
}

/// Retry policy for an operation.
///
/// # Example
///
/// ```rust
/// use reattempt::{RetryMode, RetryPolicy};
///
/// let policy = RetryPolicy::with_max_attempts(3)
///     .with_mode(RetryMode::AnyFailure)
///     .exclude("index-out-of-range");
///
/// assert_eq!(policy.max_attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts, counting the first one. Zero is treated
    /// as one: the operation always runs at least once, with no retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Severity handling mode.
    #[serde(default)]
    pub mode: RetryMode,

    /// Categories that are never retried, even when otherwise recoverable.
    /// Matching is exact; a general tag does not cover more specific tags.
    #[serde(default)]
    pub exclusions: BTreeSet<Category>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            mode: RetryMode::default(),
            exclusions: BTreeSet::new(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

impl RetryPolicy {
    /// Policy with the given attempt budget, default mode, no exclusions.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Switch the severity handling mode.
    pub fn with_mode(mut self, mode: RetryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a category to the exclusion set.
    pub fn exclude(mut self, category: impl Into<Category>) -> Self {
        self.exclusions.insert(category.into());
        self
    }

    /// Decide whether `failure` may be retried under this policy.
    ///
    /// Interruption failures are never retried, in either mode.
    pub fn should_retry(&self, failure: &Failure) -> bool {
        if failure.is_interruption() {
            return false;
        }
        if self.mode == RetryMode::RecoverableOnly && failure.severity() == Severity::Fatal {
            return false;
        }
        !self.exclusions.contains(failure.category())
    }

    /// Effective attempt budget; a configured zero still runs the operation
    /// once.
    pub(crate) fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
