use std::time::Duration;

use rand::Rng;

const BASE_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 5_000;

/// Delay before retry attempt `attempt` (0-based): exponential growth with
/// random jitter, capped so exhausted retries still fail promptly.
pub fn backoff_delay(attempt: usize) -> Duration {
    let exp = BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(5));
    let jitter = rand::rng().random_range(0..BASE_DELAY_MS);
    Duration::from_millis(exp.saturating_add(jitter).min(MAX_DELAY_MS))
}
