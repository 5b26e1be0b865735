use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter, capped at `max`.
///
/// `attempt` counts failed attempts so far, starting at 0.
pub fn calculate_backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    // Cap the exponent so the multiplication cannot overflow
    let capped_attempt = attempt.min(16);

    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(2_u64.saturating_pow(capped_attempt));

    // Add jitter: ±30% randomness
    let jitter_factor = rand::thread_rng().gen_range(0.7..1.3);
    let delay_with_jitter = (delay_ms as f64 * jitter_factor).round() as u64;

    Duration::from_millis(delay_with_jitter).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(500);
    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn test_backoff_progression() {
        let delay0 = calculate_backoff_delay(0, BASE, MAX).as_millis();
        let delay1 = calculate_backoff_delay(1, BASE, MAX).as_millis();
        let delay2 = calculate_backoff_delay(2, BASE, MAX).as_millis();

        assert!((350..=650).contains(&delay0)); // 500ms ±30%
        assert!((700..=1300).contains(&delay1)); // 1s ±30%
        assert!((1400..=2600).contains(&delay2)); // 2s ±30%
    }

    #[test]
    fn test_backoff_cap() {
        assert_eq!(calculate_backoff_delay(20, BASE, MAX), MAX);
        assert_eq!(calculate_backoff_delay(u32::MAX, BASE, MAX), MAX);
    }

    #[test]
    fn test_zero_base() {
        assert_eq!(calculate_backoff_delay(3, Duration::ZERO, MAX), Duration::ZERO);
    }
}
