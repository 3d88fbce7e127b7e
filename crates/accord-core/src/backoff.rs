//! Backoff math for reconnects and the request queue.
//!
//! Portable, sync-only building blocks; the async sleeping happens in the
//! crates that own the tasks:
//!
//! - [`exponential_delay`]: reconnect backoff with doubling and a ceiling
//! - [`exponential_delay_with_random`]: the same with explicit jitter input
//! - [`LinearBackoff`]: the request queue's fixed-increment hold timer

/// Default base delay for reconnect backoff, in milliseconds.
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 1000;
/// Default ceiling for reconnect backoff, in milliseconds.
pub const DEFAULT_RECONNECT_CAP_MS: u64 = 60_000;

/// Exponential backoff delay: `min(cap, base * 2^attempt)`.
///
/// `attempt` is zero-based: attempt 0 waits `base`.
#[must_use]
pub fn exponential_delay(attempt: u32, base_ms: u64, cap_ms: u64) -> u64 {
    base_ms.saturating_mul(1u64 << attempt.min(31)).min(cap_ms)
}

/// Exponential backoff with jitter from an explicit random input.
///
/// `random` must be in `[0.0, 1.0)`; the result is scaled by
/// `1 + (random * 2 - 1) * jitter_factor`, mapping the random value to a
/// symmetric `±jitter_factor` band around the capped exponential delay.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn exponential_delay_with_random(
    attempt: u32,
    base_ms: u64,
    cap_ms: u64,
    jitter_factor: f64,
    random: f64,
) -> u64 {
    let capped = exponential_delay(attempt, base_ms, cap_ms);
    let jitter = 1.0 + (random * 2.0 - 1.0) * jitter_factor;
    ((capped as f64) * jitter).round().max(0.0) as u64
}

/// Fixed-increment backoff for the serialized request queue.
///
/// Starts at `start_ms`, grows by `increment_ms` per consecutive failure up
/// to `cap_ms`, and resets to `start_ms` after any successful send.
#[derive(Clone, Debug)]
pub struct LinearBackoff {
    start_ms: u64,
    increment_ms: u64,
    cap_ms: u64,
    current_ms: u64,
}

impl LinearBackoff {
    /// Create a backoff that has not failed yet.
    #[must_use]
    pub fn new(start_ms: u64, increment_ms: u64, cap_ms: u64) -> Self {
        Self {
            start_ms,
            increment_ms,
            cap_ms,
            current_ms: start_ms,
        }
    }

    /// The delay to wait now; subsequent calls grow until [`reset`].
    ///
    /// [`reset`]: LinearBackoff::reset
    pub fn next_delay_ms(&mut self) -> u64 {
        let delay = self.current_ms;
        self.current_ms = self
            .current_ms
            .saturating_add(self.increment_ms)
            .min(self.cap_ms);
        delay
    }

    /// Return to the starting delay after a successful send.
    pub fn reset(&mut self) {
        self.current_ms = self.start_ms;
    }

    /// The delay the next failure would wait, without advancing.
    #[must_use]
    pub fn peek_ms(&self) -> u64 {
        self.current_ms
    }
}

impl Default for LinearBackoff {
    /// Queue defaults: 500 ms start, +500 ms per failure, 10 s cap.
    fn default() -> Self {
        Self::new(500, 500, 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_doubles() {
        assert_eq!(exponential_delay(0, 1000, 60_000), 1000);
        assert_eq!(exponential_delay(1, 1000, 60_000), 2000);
        assert_eq!(exponential_delay(2, 1000, 60_000), 4000);
        assert_eq!(exponential_delay(5, 1000, 60_000), 32_000);
    }

    #[test]
    fn exponential_hits_ceiling() {
        assert_eq!(exponential_delay(6, 1000, 60_000), 60_000);
        assert_eq!(exponential_delay(30, 1000, 60_000), 60_000);
    }

    #[test]
    fn exponential_high_attempt_does_not_overflow() {
        let delay = exponential_delay(500, u64::MAX / 2, u64::MAX);
        assert!(delay > 0);
    }

    #[test]
    fn jitter_band_is_symmetric() {
        // random = 0.0 → low edge, 0.5 → exact, 1.0 → high edge
        assert_eq!(exponential_delay_with_random(0, 1000, 60_000, 0.2, 0.0), 800);
        assert_eq!(exponential_delay_with_random(0, 1000, 60_000, 0.2, 0.5), 1000);
        assert_eq!(exponential_delay_with_random(0, 1000, 60_000, 0.2, 1.0), 1200);
    }

    #[test]
    fn jitter_respects_cap_base() {
        let delay = exponential_delay_with_random(20, 1000, 60_000, 0.0, 0.5);
        assert_eq!(delay, 60_000);
    }

    #[test]
    fn linear_grows_by_increment() {
        let mut backoff = LinearBackoff::new(500, 500, 10_000);
        assert_eq!(backoff.next_delay_ms(), 500);
        assert_eq!(backoff.next_delay_ms(), 1000);
        assert_eq!(backoff.next_delay_ms(), 1500);
    }

    #[test]
    fn linear_caps() {
        let mut backoff = LinearBackoff::new(500, 4000, 5000);
        assert_eq!(backoff.next_delay_ms(), 500);
        assert_eq!(backoff.next_delay_ms(), 4500);
        assert_eq!(backoff.next_delay_ms(), 5000);
        assert_eq!(backoff.next_delay_ms(), 5000);
    }

    #[test]
    fn linear_reset_returns_to_start() {
        let mut backoff = LinearBackoff::new(500, 500, 10_000);
        let _ = backoff.next_delay_ms();
        let _ = backoff.next_delay_ms();
        backoff.reset();
        assert_eq!(backoff.peek_ms(), 500);
        assert_eq!(backoff.next_delay_ms(), 500);
    }

    #[test]
    fn linear_default_values() {
        let backoff = LinearBackoff::default();
        assert_eq!(backoff.peek_ms(), 500);
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        proptest! {
            #[test]
            fn exponential_never_exceeds_cap(
                attempt in 0u32..128,
                base in 1u64..100_000,
                cap in 1u64..600_000,
            ) {
                prop_assert!(exponential_delay(attempt, base, cap) <= cap);
            }

            #[test]
            fn exponential_is_monotone_in_attempt(
                attempt in 0u32..63,
                base in 1u64..100_000,
                cap in 1u64..600_000,
            ) {
                let now = exponential_delay(attempt, base, cap);
                let next = exponential_delay(attempt + 1, base, cap);
                prop_assert!(next >= now);
            }

            #[test]
            fn jitter_stays_in_band(
                attempt in 0u32..32,
                base in 1u64..100_000,
                factor in 0.0f64..1.0,
                random in 0.0f64..1.0,
            ) {
                let cap = 600_000;
                let capped = exponential_delay(attempt, base, cap) as f64;
                let delay = exponential_delay_with_random(attempt, base, cap, factor, random) as f64;
                // one-ms slack for rounding at the band edges
                prop_assert!(delay >= (capped * (1.0 - factor)) - 1.0);
                prop_assert!(delay <= (capped * (1.0 + factor)) + 1.0);
            }

            #[test]
            fn linear_never_exceeds_cap(
                start in 0u64..10_000,
                increment in 0u64..10_000,
                steps in 1usize..64,
            ) {
                let cap = start.max(5000);
                let mut backoff = LinearBackoff::new(start, increment, cap);
                for _ in 0..steps {
                    prop_assert!(backoff.next_delay_ms() <= cap);
                }
            }
        }
    }
}
