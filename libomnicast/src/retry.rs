//! Retry backoff policy for failed publish attempts
//!
//! Pure functions; the executor decides when to apply them.

use chrono::Duration;

/// Delay before the given retry attempt, `base × multiplier^(attempt-1)`.
///
/// `attempt` starts at 1 for the first retry. Strictly increasing in
/// `attempt` whenever `multiplier > 1`.
pub fn next_delay(attempt: u32, base_delay_minutes: u64, multiplier: f64) -> Duration {
    let minutes = base_delay_minutes as f64 * multiplier.powi(attempt.saturating_sub(1) as i32);
    Duration::seconds((minutes * 60.0) as i64)
}

/// Whether another retry is allowed after `attempt` failures
pub fn should_retry(attempt: u32, max_retries: u32) -> bool {
    attempt <= max_retries
}
