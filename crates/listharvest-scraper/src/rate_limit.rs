//! Request pacing for the harvester.
//!
//! Two independent policies:
//! - [`Throttle`] spaces out requests on the happy path so the endpoint does
//!   not see a burst from one client.
//! - [`BackoffPolicy`] decides how long to wait before retrying a page after a
//!   failure.
//!
//! The harvest loop applies exactly one of them before each request after the
//! first.

use std::time::Duration;

use listharvest_core::{AppConfig, BackoffStrategy};
use tokio::time::Instant;

use crate::error::ScraperError;

/// Returns `true` if `err` is a failure the harvest loop should retry.
///
/// Every transport, status, body, and disk failure is retriable: none of them
/// say anything about whether more pages exist. Only configuration mistakes
/// and an already-exhausted retry budget are final.
pub(crate) fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(_)
        | ScraperError::Deserialize { .. }
        | ScraperError::MalformedResults { .. }
        | ScraperError::RateLimited { .. }
        | ScraperError::UnexpectedStatus { .. }
        | ScraperError::Persist { .. } => true,
        ScraperError::InvalidEndpoint { .. } | ScraperError::RetriesExhausted { .. } => false,
    }
}

/// Draws a duration uniformly from `[min, max]` at millisecond resolution.
fn random_between(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let lo_ms = u64::try_from(lo.as_millis()).unwrap_or(u64::MAX);
    let hi_ms = u64::try_from(hi.as_millis()).unwrap_or(u64::MAX);
    if lo_ms == hi_ms {
        return Duration::from_millis(lo_ms);
    }
    Duration::from_millis(rand::random_range(lo_ms..=hi_ms))
}

/// Inter-request rate limiter with a randomized interval.
///
/// Each call to [`Throttle::next_delay`] draws a target gap from the
/// configured range and returns the part of it that has not already elapsed
/// since the last request was marked.
#[derive(Debug, Clone)]
pub struct Throttle {
    min: Duration,
    max: Duration,
    last_request: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min,
            max,
            last_request: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_secs(config.throttle_min_secs),
            Duration::from_secs(config.throttle_max_secs),
        )
    }

    /// A throttle that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// How long to wait before the next request. Zero before the first one.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let Some(last) = self.last_request else {
            return Duration::ZERO;
        };
        random_between(self.min, self.max).saturating_sub(last.elapsed())
    }

    /// Records that a request is being sent now.
    pub fn mark(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

/// Delay schedule for retrying a failed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Uniformly random delay in `[min, max]`, independent of the attempt.
    Uniform { min: Duration, max: Duration },
    /// `base * 2^(attempt-1)` with ±25 % jitter, never more than `cap`.
    Exponential { base: Duration, cap: Duration },
}

impl BackoffPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        match config.backoff_strategy {
            BackoffStrategy::Uniform => Self::Uniform {
                min: Duration::from_secs(config.backoff_min_secs),
                max: Duration::from_secs(config.backoff_max_secs),
            },
            BackoffStrategy::Exponential => Self::Exponential {
                base: Duration::from_secs(config.backoff_base_secs),
                cap: Duration::from_secs(config.backoff_cap_secs),
            },
        }
    }

    /// A policy that retries immediately.
    #[must_use]
    pub fn none() -> Self {
        Self::Uniform {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1 for the first retry).
    ///
    /// Back-off schedule for `Exponential` with `base = 5s`:
    ///
    /// | Attempt | Sleep before retry   |
    /// |---------|----------------------|
    /// | 1       | 5 s × 2⁰ ± 25 %      |
    /// | 2       | 5 s × 2¹ ± 25 %      |
    /// | 3       | 5 s × 2² ± 25 %      |
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Uniform { min, max } => random_between(min, max),
            Self::Exponential { base, cap } => {
                let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
                let cap_ms = u64::try_from(cap.as_millis()).unwrap_or(u64::MAX);
                let exponent = attempt.saturating_sub(1).min(20);
                let computed = base_ms.saturating_mul(1u64 << exponent).min(cap_ms);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                Duration::from_millis(jittered.min(cap_ms))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deserialize_err() -> ScraperError {
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        ScraperError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }
    }

    #[test]
    fn body_and_status_failures_are_retriable() {
        assert!(is_retriable(&deserialize_err()));
        assert!(is_retriable(&ScraperError::UnexpectedStatus {
            status: 503,
            url: "https://example.com".to_owned(),
        }));
        assert!(is_retriable(&ScraperError::RateLimited {
            domain: "example.com".to_owned(),
            retry_after_secs: None,
        }));
        assert!(is_retriable(&ScraperError::MalformedResults {
            context: "page 1".to_owned(),
            path: "data.finalResult".to_owned(),
        }));
    }

    #[test]
    fn persist_failure_is_retriable() {
        assert!(is_retriable(&ScraperError::Persist {
            path: "outputs/x.json".to_owned(),
            source: std::io::Error::other("disk full"),
        }));
    }

    #[test]
    fn invalid_endpoint_is_not_retriable() {
        assert!(!is_retriable(&ScraperError::InvalidEndpoint {
            url: "nope".to_owned(),
            reason: "relative URL without a base".to_owned(),
        }));
    }

    #[test]
    fn uniform_backoff_stays_in_range() {
        let policy = BackoffPolicy::Uniform {
            min: Duration::from_secs(60),
            max: Duration::from_secs(120),
        };
        for attempt in 1..50 {
            let d = policy.delay_for(attempt);
            assert!(d >= Duration::from_secs(60) && d <= Duration::from_secs(120), "{d:?}");
        }
    }

    #[test]
    fn exponential_backoff_grows_within_jitter_band() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_secs(4),
            cap: Duration::from_secs(600),
        };
        let third = policy.delay_for(3);
        // 4s * 2^2 = 16s, ±25 %
        assert!(third >= Duration::from_secs(12) && third <= Duration::from_secs(20), "{third:?}");
    }

    #[test]
    fn exponential_backoff_respects_cap() {
        let policy = BackoffPolicy::Exponential {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(30),
        };
        for attempt in [10, 40, u32::MAX] {
            assert!(policy.delay_for(attempt) <= Duration::from_secs(30));
        }
    }

    #[test]
    fn no_backoff_is_zero() {
        assert_eq!(BackoffPolicy::none().delay_for(1), Duration::ZERO);
    }

    #[test]
    fn throttle_does_not_delay_first_request() {
        let throttle = Throttle::new(Duration::from_secs(60), Duration::from_secs(120));
        assert_eq!(throttle.next_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_subtracts_elapsed_time() {
        let mut throttle = Throttle::new(Duration::from_secs(10), Duration::from_secs(10));
        throttle.mark();
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(throttle.next_delay(), Duration::from_secs(6));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(throttle.next_delay(), Duration::ZERO);
    }

    #[test]
    fn throttle_normalises_inverted_range() {
        let mut throttle = Throttle::new(Duration::from_secs(2), Duration::from_secs(1));
        throttle.mark();
        assert!(throttle.next_delay() <= Duration::from_secs(2));
    }
}
