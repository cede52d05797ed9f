//! # reattempt
//!
//! A small retry executor: it drives a fallible operation until it succeeds,
//! a non-retryable failure occurs, or the attempt budget runs out, with
//! exponential backoff between attempts.
//!
//! - Doubling backoff schedule: 200ms, 400ms, 800ms, ... (no cap, no jitter)
//! - Failures carry a [`Severity`] (recoverable vs fatal) and a stable
//!   [`Category`] tag; fatal failures short-circuit in the default mode
//! - A category exclusion set for failures that must never be retried,
//!   matched by exact tag identity
//! - Observable lifecycle via [`RetryObserver`], with a built-in
//!   [`TracingObserver`] for structured logging
//! - An optional interruption signal that aborts a backoff wait
//!
//! The terminal failure is always the operation's own failure object,
//! unwrapped: same category, severity, message, and cause.
//!
//! # Example
//!
//! ```rust,no_run
//! use reattempt::{retry, Failure, RetryPolicy};
//!
//! async fn example() -> Result<(), Failure> {
//!     retry(&RetryPolicy::default(), |attempt| async move {
//!         if attempt < 3 {
//!             Err(Failure::recoverable("flaky-io", "connection reset"))
//!         } else {
//!             Ok(())
//!         }
//!     })
//!     .await
//! }
//! ```

pub mod backoff;
pub mod executor;
pub mod failure;
pub mod observer;
pub mod policy;

pub use backoff::delay_for;
pub use executor::{retry, RetryExecutor, RetryExecutorBuilder};
pub use failure::{Category, Failure, Severity};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use policy::{RetryMode, RetryPolicy};

#[cfg(test)]
mod tests;
