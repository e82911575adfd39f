//! Timeout and exponential backoff at the provider boundary.
//!
//! [`RetryingProvider`] wraps any [`LlmProvider`] so that every stage gets
//! the same retry policy without knowing about it. A retried call is still
//! one logical call for the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::config::AgentConfig;
use super::message::{ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Capped exponential backoff without jitter.
///
/// Delay for attempt `n` (0-based) is `base * 2^n`, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl ExponentialBackoff {
    /// Creates a backoff sequence yielding at most `max_attempts` delays.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// Returns the next delay, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let multiplier = 1u32.checked_shl(self.attempt.min(31)).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    /// Delays generated so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Decorator adding a per-call timeout and retries with backoff.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_attempts: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl RetryingProvider {
    /// Wraps `inner` with the policy from `config`.
    #[must_use]
    pub fn new(inner: Arc<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            inner,
            timeout: config.timeout,
            max_attempts: config.max_retries.max(1),
            min_wait: config.retry_min_wait,
            max_wait: config.retry_max_wait,
        }
    }

    /// Wraps `inner` with an explicit policy.
    #[must_use]
    pub fn with_policy(
        inner: Arc<dyn LlmProvider>,
        timeout: Duration,
        max_attempts: u32,
        min_wait: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            inner,
            timeout,
            max_attempts: max_attempts.max(1),
            min_wait,
            max_wait,
        }
    }

    async fn attempt(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        match tokio::time::timeout(self.timeout, self.inner.chat(request)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

impl std::fmt::Debug for RetryingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingProvider")
            .field("inner", &self.inner.name())
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let mut backoff =
            ExponentialBackoff::new(self.min_wait, self.max_wait, self.max_attempts - 1);
        loop {
            match self.attempt(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    let Some(delay) = backoff.next_delay() else {
                        return Err(e);
                    };
                    warn!(
                        provider = self.inner.name(),
                        attempt = backoff.attempt(),
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{TokenUsage, user_message};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` calls with the given error, then succeeds.
    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
        status: Option<u16>,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(AgentError::ApiRequest {
                    message: "unavailable".to_string(),
                    status: self.status,
                });
            }
            Ok(ChatResponse {
                content: "ok".to_string(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(AgentError::EmptyDraft)
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".to_string(),
            messages: vec![user_message("hi")],
            temperature: None,
            max_tokens: None,
            json_mode: false,
            response_schema: None,
        }
    }

    fn wrap(inner: Arc<dyn LlmProvider>, attempts: u32) -> RetryingProvider {
        RetryingProvider::with_policy(
            inner,
            Duration::from_millis(50),
            attempts,
            Duration::from_millis(1),
            Duration::from_millis(4),
        )
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(3), 4);
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(3)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(3)));
        assert_eq!(backoff.next_delay(), None);
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let inner = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 2,
            status: Some(503),
        });
        let provider = wrap(inner.clone(), 3);
        let response = provider.chat(&request()).await;
        assert!(response.is_ok());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_bounded() {
        let inner = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 10,
            status: None,
        });
        let provider = wrap(inner.clone(), 3);
        let result = provider.chat(&request()).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let inner = Arc::new(FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 10,
            status: Some(401),
        });
        let provider = wrap(inner.clone(), 5);
        assert!(provider.chat(&request()).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_after_retries() {
        let provider = wrap(Arc::new(SlowProvider), 2);
        let result = provider.chat(&request()).await;
        assert!(matches!(result, Err(AgentError::Timeout { .. })));
    }
}
