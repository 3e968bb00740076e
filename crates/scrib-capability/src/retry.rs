//! Retry with exponential backoff
//!
//! Timeout and refusal are transient: retried up to a bound with growing
//! delays. Unreachable is surfaced immediately.

use crate::error::GenerationError;
use crate::generator::{GenerationOptions, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded-retry policy for capability calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_backoff_ms: u64,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create policy with default bounds
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With retry bound
    #[inline]
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// With initial backoff
    #[inline]
    #[must_use]
    pub fn with_initial_backoff_ms(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Backoff before retry `attempt` (1-based)
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).round() as u64;
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
        }
    }
}

/// Call the generator, retrying transient failures per `policy`
///
/// # Errors
/// The last failure once retries are exhausted, or the first
/// non-retryable failure.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    prompt: &str,
    options: &GenerationOptions,
    policy: &RetryPolicy,
) -> Result<String, GenerationError> {
    let mut attempt = 0u32;

    loop {
        match generator.generate(prompt, options).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff_for(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "generation failed, retrying: {err}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                tracing::error!(attempt, "generation failed: {err}");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountdownGenerator {
        remaining_failures: AtomicU32,
        error: GenerationError,
    }

    #[async_trait::async_trait]
    impl TextGenerator for CountdownGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerationError> {
            let prev = self.remaining_failures.load(Ordering::SeqCst);
            if prev > 0 {
                self.remaining_failures.store(prev - 1, Ordering::SeqCst);
                Err(self.error.clone())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures() {
        let gen = CountdownGenerator {
            remaining_failures: AtomicU32::new(2),
            error: GenerationError::Timeout { elapsed_secs: 1 },
        };
        let policy = RetryPolicy::new().with_initial_backoff_ms(10);

        let out = generate_with_retry(&gen, "p", &GenerationOptions::new(), &policy).await;
        assert_eq!(out.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retry_bound() {
        let gen = CountdownGenerator {
            remaining_failures: AtomicU32::new(10),
            error: GenerationError::Refused {
                reason: "busy".to_string(),
            },
        };
        let policy = RetryPolicy::new()
            .with_max_retries(2)
            .with_initial_backoff_ms(10);

        let out = generate_with_retry(&gen, "p", &GenerationOptions::new(), &policy).await;
        assert!(matches!(out, Err(GenerationError::Refused { .. })));
        // First attempt + two retries
        assert_eq!(gen.remaining_failures.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn unreachable_not_retried() {
        let gen = CountdownGenerator {
            remaining_failures: AtomicU32::new(5),
            error: GenerationError::Unreachable("down".to_string()),
        };
        let policy = RetryPolicy::new().with_max_retries(5);

        let out = generate_with_retry(&gen, "p", &GenerationOptions::new(), &policy).await;
        assert!(matches!(out, Err(GenerationError::Unreachable(_))));
        assert_eq!(gen.remaining_failures.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn backoff_grows() {
        let policy = RetryPolicy::new().with_initial_backoff_ms(100);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }
}
