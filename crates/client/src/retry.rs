//! Bounded retry with a linear backoff between a minimum and maximum delay.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Classifies an error as worth retrying.
pub trait TransientErrorDetection<E>: Send + Sync {
    fn is_transient(&self, error: &E) -> bool;
}

impl<E, F> TransientErrorDetection<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_transient(&self, error: &E) -> bool {
        self(error)
    }
}

/// Emitted before the engine sleeps ahead of another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    pub policy: String,
    /// The attempt that just failed, starting at 1.
    pub attempt: u32,
    /// Delay before the next attempt.
    pub delay: Duration,
    pub error: String,
}

pub type RetryObserver = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Per-call bookkeeping, discarded once the operation settles.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub name: String,
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl RetryContext {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            name: policy.name.clone(),
            max_attempts: policy.max_attempts(),
            min_delay: policy.min_delay,
            max_delay: policy.max_delay,
            attempts: 0,
            last_error: None,
        }
    }

    fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    pub name: String,
    max_attempts: u32,
    min_delay: Duration,
    max_delay: Duration,
    on_retry: Option<RetryObserver>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            "BillingRetryStrategy",
            5,
            Duration::from_millis(100),
            Duration::from_millis(200),
        )
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; zero is treated as one.
    /// A `max_delay` below `min_delay` is raised to it.
    pub fn new(name: impl Into<String>, max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            name: name.into(),
            max_attempts: max_attempts.max(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
            on_retry: None,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Delay after the `attempt`-th failure: `min_delay` after the first,
    /// growing linearly to reach `max_delay` at `max_attempts`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.max_attempts <= 1 {
            return self.min_delay;
        }
        let step = attempt.clamp(1, self.max_attempts) - 1;
        let span = self.max_delay.saturating_sub(self.min_delay);
        self.min_delay + span * step / (self.max_attempts - 1)
    }

    /// Runs `operation` until it succeeds, fails with an error `detector`
    /// deems permanent, or the attempt budget is spent. The last error is
    /// returned unchanged.
    pub async fn execute<T, E, D, F, Fut>(&self, detector: &D, mut operation: F) -> Result<T, E>
    where
        D: TransientErrorDetection<E> + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut context = RetryContext::new(self);
        loop {
            context.attempts += 1;
            let err = match operation().await {
                Ok(value) => {
                    if context.attempts > 1 {
                        debug!(
                            policy = %context.name,
                            attempts = context.attempts,
                            "operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !detector.is_transient(&err) {
                debug!(policy = %context.name, attempt = context.attempts, error = %err, "permanent failure");
                return Err(err);
            }
            if context.exhausted() {
                error!(
                    policy = %context.name,
                    attempts = context.attempts,
                    last_error = context.last_error.as_deref().unwrap_or_default(),
                    error = %err,
                    "retries exhausted"
                );
                return Err(err);
            }

            let event = RetryEvent {
                policy: context.name.clone(),
                attempt: context.attempts,
                delay: self.delay_for(context.attempts),
                error: err.to_string(),
            };
            warn!(
                policy = %event.policy,
                attempt = event.attempt,
                max_attempts = context.max_attempts,
                delay_ms = event.delay.as_millis() as u64,
                error = %event.error,
                "transient failure, retrying"
            );
            if let Some(observer) = &self.on_retry {
                observer(&event);
            }
            context.last_error = Some(event.error);
            sleep(event.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    struct Flaky(u32);

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky failure #{}", self.0)
        }
    }

    fn recording(policy: RetryPolicy) -> (RetryPolicy, Arc<Mutex<Vec<RetryEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let policy = policy.on_retry(move |event| sink.lock().unwrap().push(event.clone()));
        (policy, events)
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.name, "BillingRetryStrategy");
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.min_delay(), Duration::from_millis(100));
        assert_eq!(policy.max_delay(), Duration::from_millis(200));
    }

    #[test]
    fn delays_grow_from_min_to_max() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 125, 150, 175, 200]);
        assert_eq!(policy.delay_for(50), Duration::from_millis(200));
    }

    #[test]
    fn degenerate_policies() {
        let single = RetryPolicy::new("once", 0, Duration::from_millis(10), Duration::from_millis(20));
        assert_eq!(single.max_attempts(), 1);
        assert_eq!(single.delay_for(1), Duration::from_millis(10));

        let inverted = RetryPolicy::new("inv", 3, Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(inverted.max_delay(), Duration::from_millis(50));
        assert_eq!(inverted.delay_for(3), Duration::from_millis(50));
    }

    #[test]
    fn delay_bounds_survive_observer_and_clone() {
        let policy = RetryPolicy::new("bounded", 4, Duration::from_millis(80), Duration::from_millis(20))
            .on_retry(|_| {});
        let copy = policy.clone();
        for p in [&policy, &copy] {
            assert!(p.min_delay() <= p.max_delay());
            assert_eq!(p.max_delay(), Duration::from_millis(80));
            assert!((1..=4).all(|n| p.delay_for(n) == Duration::from_millis(80)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_attempted_once() {
        let (policy, events) = recording(RetryPolicy::default());
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), Flaky> = policy
            .execute(&|_: &Flaky| false, || async move {
                Err(Flaky(calls.fetch_add(1, Ordering::SeqCst) + 1))
            })
            .await;
        assert_eq!(result, Err(Flaky(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_uses_whole_budget() {
        let (policy, events) = recording(RetryPolicy::default());
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = tokio::time::Instant::now();
        let result: Result<(), Flaky> = policy
            .execute(&|_: &Flaky| true, || async move {
                Err(Flaky(calls.fetch_add(1, Ordering::SeqCst) + 1))
            })
            .await;

        assert_eq!(result, Err(Flaky(5)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        let delays: Vec<Duration> = events.iter().map(|e| e.delay).collect();
        for delay in &delays {
            assert!(*delay >= Duration::from_millis(100) && *delay <= Duration::from_millis(200));
        }
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(events[0].attempt, 1);
        assert_eq!(events[3].attempt, 4);
        assert_eq!(events[2].error, "flaky failure #3");

        let slept: Duration = delays.iter().sum();
        assert!(started.elapsed() >= slept);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_two_transient_failures() {
        let (policy, events) = recording(RetryPolicy::default());
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = policy
            .execute(&|_: &Flaky| true, || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(Flaky(n))
                } else {
                    Ok("settled")
                }
            })
            .await;
        assert_eq!(result, Ok("settled"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn classifier_sees_each_error() {
        let policy = RetryPolicy::new("odd", 5, Duration::from_millis(1), Duration::from_millis(2));
        let counter = AtomicU32::new(0);
        let calls = &counter;
        // only odd-numbered failures are transient, so the second one stops the loop
        let result: Result<(), Flaky> = policy
            .execute(&|e: &Flaky| e.0 % 2 == 1, || async move {
                Err(Flaky(calls.fetch_add(1, Ordering::SeqCst) + 1))
            })
            .await;
        assert_eq!(result, Err(Flaky(2)));
    }
}
