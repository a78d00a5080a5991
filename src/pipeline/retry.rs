//! Bounded-attempts helper shared by every round of the protocol.
//!
//! A round is "call, inspect, maybe call again": [`retry_until`] issues up to
//! `max_attempts` calls, hands each outcome to a predicate, and stops at the
//! first outcome the predicate accepts. Between attempts it sleeps with
//! exponential backoff (`backoff_ms * 2^(n-1)` before retry `n`), so with a
//! 500 ms base the waits are 500 ms → 1 s → 2 s → 4 s.

use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Attempt budget and backoff base for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Sleep before 1-indexed `attempt`. Zero for the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 2);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Run `attempt` up to `policy.max_attempts` times until `accept` returns
/// true for an outcome.
///
/// Both closures receive the 1-indexed attempt number. `accept` sees every
/// outcome, accepted or not, so callers can account for failed attempts too.
///
/// # Returns
/// The accepted outcome, or `None` when the budget ran out (or was zero).
pub async fn retry_until<T, F, Fut, P>(policy: &RetryPolicy, mut attempt: F, mut accept: P) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    P: FnMut(u32, &T) -> bool,
{
    for n in 1..=policy.max_attempts {
        let delay = policy.delay_before(n);
        if !delay.is_zero() {
            debug!("Attempt {}/{} after {}ms", n, policy.max_attempts, delay.as_millis());
            sleep(delay).await;
        }
        let outcome = attempt(n).await;
        if accept(n, &outcome) {
            return Some(outcome);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let p = RetryPolicy::new(5, 500);
        assert_eq!(p.delay_before(1), Duration::ZERO);
        assert_eq!(p.delay_before(2), Duration::from_millis(500));
        assert_eq!(p.delay_before(3), Duration::from_millis(1000));
        assert_eq!(p.delay_before(4), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_saturates() {
        let p = RetryPolicy::new(200, u64::MAX / 2);
        assert_eq!(p.delay_before(100), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn stops_at_first_accepted_outcome() {
        let mut calls = 0;
        let result = retry_until(
            &RetryPolicy::new(5, 0),
            |n| {
                calls += 1;
                async move { n * 10 }
            },
            |_, v| *v >= 30,
        )
        .await;
        assert_eq!(result, Some(30));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn exhausts_budget_and_sees_every_outcome() {
        let mut seen = Vec::new();
        let result = retry_until(
            &RetryPolicy::new(3, 0),
            |n| async move { n },
            |n, v| {
                seen.push((n, *v));
                false
            },
        )
        .await;
        assert_eq!(result, None);
        assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[tokio::test]
    async fn zero_budget_makes_no_calls() {
        let mut calls = 0;
        let result = retry_until(
            &RetryPolicy::new(0, 0),
            |_| {
                calls += 1;
                async {}
            },
            |_, _| true,
        )
        .await;
        assert_eq!(result, None);
        assert_eq!(calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_slept_between_attempts() {
        let start = tokio::time::Instant::now();
        retry_until(&RetryPolicy::new(3, 100), |_| async {}, |_, _| false).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "slept {elapsed:?}");
        assert!(elapsed < Duration::from_millis(400), "slept {elapsed:?}");
    }
}
