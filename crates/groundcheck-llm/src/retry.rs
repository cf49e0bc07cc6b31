//! Timeouts, retries with exponential backoff, and request pacing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use groundcheck_config::EvaluatorConfig;
use groundcheck_core::EvalError;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::provider::{LlmProvider, LlmResponse};

/// How many times to try a call, how long each try may take, and how long
/// to back off between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&EvaluatorConfig> for RetryPolicy {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            timeout: config.api_timeout(),
            ..Default::default()
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given zero-based attempt: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T, EvalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EvalError>>,
    {
        self.run_paced(label, None, op).await
    }

    /// Like [`run`](Self::run), but waits on `limiter` before every attempt.
    ///
    /// The wait is not part of the attempt, so `timeout` only bounds the call.
    pub async fn run_paced<T, F, Fut>(
        &self,
        label: &str,
        limiter: Option<&RateLimiter>,
        mut op: F,
    ) -> Result<T, EvalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EvalError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if let Some(limiter) = limiter {
                limiter.acquire().await;
            }
            let outcome = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(EvalError::Timeout(self.timeout.as_secs())),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= attempts {
                return Err(EvalError::MaxRetriesExceeded { attempts, last: err.to_string() });
            }

            let delay = self.delay_for(attempt - 1);
            warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}",
                label, attempt, attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Spaces request starts evenly to stay under a requests-per-minute quota.
///
/// Shared by every provider built from one config, so the quota holds
/// across agents and concurrent conversations.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let interval = match requests {
            0 => Duration::ZERO,
            n => Duration::from_secs(60) / n,
        };
        Self { interval, next_slot: Mutex::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the caller may start a request.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let wait = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot - now
        };

        if !wait.is_zero() {
            debug!("Rate limiter: waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Wraps a provider with pacing, per-call timeout and retries.
pub struct GuardedProvider {
    inner: Box<dyn LlmProvider>,
    policy: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl GuardedProvider {
    pub fn new(inner: impl LlmProvider + 'static, policy: RetryPolicy, limiter: Arc<RateLimiter>) -> Self {
        Self { inner: Box::new(inner), policy, limiter }
    }
}

#[async_trait]
impl LlmProvider for GuardedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        let inner = self.inner.as_ref();
        let label = format!("{}/{}", inner.name(), inner.model());

        self.policy
            .run_paced(&label, Some(self.limiter.as_ref()), move || inner.generate(prompt))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::provider::LlmMetrics;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn retries_rate_limits_then_succeeds() {
        let calls = &AtomicU32::new(0);
        let result = fast_policy(3)
            .run("test", move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(EvalError::RateLimited("quota".into())),
                    _ => Ok(7),
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EvalError::EmptyResponse(None))
            })
            .await;

        assert!(matches!(result, Err(EvalError::MaxRetriesExceeded { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EvalError::Http { provider: "gemini".into(), status: 400, body: "bad".into() })
            })
            .await;

        assert!(matches!(result, Err(EvalError::Http { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn times_out_slow_calls() {
        let result: Result<(), _> = fast_policy(1)
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(EvalError::MaxRetriesExceeded { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn limiter_spaces_requests() {
        let limiter = RateLimiter::per_minute(3000);
        assert_eq!(limiter.interval(), Duration::from_millis(20));

        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    struct Flaky {
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, _prompt: &str) -> Result<LlmResponse, EvalError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(EvalError::LlmError("connection reset".into())),
                _ => Ok(LlmResponse { content: "{\"ok\": true}".into(), metrics: LlmMetrics::default() }),
            }
        }
    }

    struct Immediate;

    #[async_trait]
    impl LlmProvider for Immediate {
        fn name(&self) -> &str {
            "instant"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, _prompt: &str) -> Result<LlmResponse, EvalError> {
            Ok(LlmResponse { content: "{}".into(), metrics: LlmMetrics::default() })
        }
    }

    #[tokio::test]
    async fn pacing_wait_does_not_count_against_timeout() {
        // 300ms spacing, 200ms per-call timeout
        let provider = GuardedProvider::new(Immediate, fast_policy(1), Arc::new(RateLimiter::per_minute(200)));

        let (a, b, c) = tokio::join!(
            provider.generate("one"),
            provider.generate("two"),
            provider.generate("three"),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(c.is_ok());
    }

    #[tokio::test]
    async fn guarded_provider_retries_inner_calls() {
        let provider = GuardedProvider::new(
            Flaky { calls: AtomicU32::new(0) },
            fast_policy(3),
            Arc::new(RateLimiter::per_minute(0)),
        );

        let (value, _) = provider.generate_json("prompt").await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(provider.name(), "flaky");
    }
}
