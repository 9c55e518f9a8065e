use std::time::Duration;
use std::future::Future;

use super::classification::ErrorClassification;
use super::types::TaxopsError;
use tracing::{warn, info};

const MAX_DELAY: Duration = Duration::from_secs(30);

impl ErrorClassification {
    /// Calculate the retry delay for this error classification based on the
    /// current attempt number (0-indexed) and the configured base delay.
    ///
    /// - RateLimitError: 10x the base delay per attempt
    /// - Default: exponential backoff base * 2^attempt + random jitter (0..base)
    ///
    /// Both are capped at 30s.
    pub fn retry_delay(&self, attempt: u32, base: Duration) -> Duration {
        let delay = match self.error_type {
            "RateLimitError" => base * 10 * (attempt + 1),
            _ => {
                let factor = 2_u32.saturating_pow(attempt.min(16));
                let jitter = base.mul_f64(rand::random::<f64>());
                base.saturating_mul(factor) + jitter
            }
        };
        delay.min(MAX_DELAY)
    }
}

/// Retry configuration for idempotent reads.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// No retries at all; every failure surfaces immediately.
    pub fn none() -> Self {
        Self { max_retries: 0, base_delay: Duration::ZERO }
    }
}

/// Execute an async operation with retry logic.
///
/// Retries only if the error is classified as retryable and we haven't
/// exceeded max_retries. Only use this for calls that are safe to repeat.
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut factory: F,
) -> Result<T, TaxopsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TaxopsError>>,
{
    let max_attempts = config.max_retries + 1;
    let mut last_error = None;

    for attempt in 0..max_attempts {
        match factory().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt = attempt + 1, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                let classification = e.classify();

                if !classification.retryable || attempt + 1 >= max_attempts {
                    if classification.retryable && max_attempts > 1 {
                        warn!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            max = max_attempts,
                            "Max retries exhausted"
                        );
                    }
                    return Err(e);
                }

                let delay = classification.retry_delay(attempt, config.base_delay);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = max_attempts,
                    error_type = classification.error_type,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after error"
                );

                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| TaxopsError::Internal("Retry loop exited unexpectedly".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig { max_retries: 3, base_delay: Duration::from_millis(1) }
    }

    #[test]
    fn test_retry_delay_rate_limit() {
        let class = ErrorClassification { error_type: "RateLimitError", retryable: true };
        let base = Duration::from_millis(100);
        assert_eq!(class.retry_delay(0, base), Duration::from_secs(1));
        assert_eq!(class.retry_delay(1, base), Duration::from_secs(2));
        assert_eq!(class.retry_delay(100, base), MAX_DELAY); // capped
    }

    #[test]
    fn test_retry_delay_default_exponential() {
        let class = ErrorClassification { error_type: "NetworkError", retryable: true };
        let base = Duration::from_millis(100);
        let d0 = class.retry_delay(0, base);
        let d2 = class.retry_delay(2, base);
        // Attempt 0: 100ms + jitter(0..100ms)
        assert!(d0 >= Duration::from_millis(100) && d0 < Duration::from_millis(200));
        // Attempt 2: 400ms + jitter(0..100ms)
        assert!(d2 >= Duration::from_millis(400) && d2 < Duration::from_millis(500));
        assert_eq!(class.retry_delay(40, base), MAX_DELAY);
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_first_try() {
        let result = with_retry("test", &fast(), || async {
            Ok::<_, TaxopsError>(42)
        }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_network_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry("test", &fast(), || {
            let attempts = attempts_clone.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TaxopsError::Network("reset".into()))
                } else {
                    Ok("loaded")
                }
            }
        }).await;

        assert_eq!(result.unwrap(), "loaded");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_non_retryable_fails_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry("test", &fast(), || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaxopsError::Api { status: 404, message: "missing".into() })
            }
        }).await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1); // Only 1 attempt
    }

    #[tokio::test]
    async fn test_with_retry_none_config_single_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry("test", &RetryConfig::none(), || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaxopsError::Network("timeout".into()))
            }
        }).await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
