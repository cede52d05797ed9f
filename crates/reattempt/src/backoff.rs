//! Backoff delay computation
//!
//! The schedule is fixed: `2^attempt * 100` milliseconds, where `attempt` is
//! the number of attempts already made. No cap and no jitter; callers that
//! need a bounded total wait pick their attempt budget accordingly (six
//! attempts already reach a 6.4 second tail, seven reach 12.8 seconds).

use std::time::Duration;

const BASE_DELAY_MS: u64 = 100;

/// Delay to wait after `attempt` failed attempts, before the next one.
///
/// The first wait (`attempt = 1`) is 200ms, then 400ms, 800ms, 1.6s, 3.2s,
/// 6.4s, 12.8s for attempts up to seven. The computation saturates instead
/// of overflowing for absurd attempt counts.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use reattempt::delay_for;
///
/// assert_eq!(delay_for(1), Duration::from_millis(200));
/// assert_eq!(delay_for(3), Duration::from_millis(800));
/// ```
pub fn delay_for(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(factor.saturating_mul(BASE_DELAY_MS))
}
