//! Failure taxonomy for retryable operations
//!
//! A [`Failure`] carries a stable [`Category`] tag and a [`Severity`]. The
//! severity decides default retryability (recoverable failures retry, fatal
//! ones short-circuit in the default mode); categories feed the exclusion set
//! of a [`RetryPolicy`](crate::RetryPolicy).

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier for a failure category.
///
/// Categories are compared by exact identity. The tag `"runtime-failure"`
/// does not match `"index-out-of-range"`, even if one is conceptually a
/// sub-case of the other; there is no hierarchy between tags.
///
/// # Example
///
/// ```rust
/// use reattempt::Category;
///
/// const TIMEOUT: Category = Category::from_static("timeout");
///
/// assert_eq!(TIMEOUT, Category::new("timeout"));
/// assert_ne!(TIMEOUT, Category::new("connect-timeout"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(Cow<'static, str>);

impl Category {
    /// Category reserved by the executor for interruption of a backoff wait.
    pub const INTERRUPTED: Category = Category::from_static("interrupted");

    /// Create a category from a static tag.
    pub const fn from_static(tag: &'static str) -> Self {
        Category(Cow::Borrowed(tag))
    }

    /// Create a category from a runtime string.
    pub fn new(tag: impl Into<String>) -> Self {
        Category(Cow::Owned(tag.into()))
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Category {
    fn from(tag: &'static str) -> Self {
        Category::from_static(tag)
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Category::new(tag)
    }
}

/// How serious a failure is, and therefore whether it is retried by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected, transient. Retried in both executor modes.
    Recoverable,
    /// Programming or assertion failure. Retried only in any-failure mode.
    Fatal,
}

/// A classified failure produced by a retried operation.
///
/// The executor never rewraps a failure: whatever the operation returned is
/// what the caller of [`retry`](crate::retry) receives, with category,
/// severity, message, and cause intact.
#[derive(Debug, Error)]
#[error("{category}: {message}")]
pub struct Failure {
    category: Category,
    severity: Severity,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Failure {
    /// An expected, transient failure. Retried by default.
    pub fn recoverable(category: impl Into<Category>, message: impl Into<String>) -> Self {
        Failure {
            category: category.into(),
            severity: Severity::Recoverable,
            message: message.into(),
            source: None,
        }
    }

    /// A programming or assertion failure. Not retried in the default mode.
    pub fn fatal(category: impl Into<Category>, message: impl Into<String>) -> Self {
        Failure {
            category: category.into(),
            severity: Severity::Fatal,
            message: message.into(),
            source: None,
        }
    }

    /// The failure surfaced when an interruption signal aborts a backoff
    /// wait. Never retried, in either mode.
    pub fn interrupted() -> Self {
        Failure {
            category: Category::INTERRUPTED,
            severity: Severity::Fatal,
            message: "backoff wait interrupted".to_string(),
            source: None,
        }
    }

    /// Attach an underlying cause, available through
    /// [`std::error::Error::source`].
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The failure's category tag.
    pub fn category(&self) -> &Category {
        &self.category
    }

    /// The failure's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this failure is eligible for retry by default.
    pub fn is_recoverable(&self) -> bool {
        self.severity == Severity::Recoverable
    }

    /// Whether this failure short-circuits retries in the default mode.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }

    /// Whether this failure came from an aborted backoff wait.
    pub fn is_interruption(&self) -> bool {
        self.category == Category::INTERRUPTED
    }
}
