//! Retry with exponential backoff for transient provider failures.
//!
//! Wraps any provider. Errors for which [`ProviderError::is_retryable`] is
//! true are retried after a growing delay; anything else (bad key, 4xx,
//! empty response) is surfaced immediately. When retries run out the last
//! error is returned unchanged.

use async_trait::async_trait;
use ctxkeep_config::RetryConfig;
use ctxkeep_core::error::ProviderError;
use ctxkeep_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay schedule for one logical request.
pub struct RetryPolicy {
    config: RetryConfig,
    current_attempt: usize,
    current_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            current_delay_ms: config.initial_delay_ms,
            current_attempt: 0,
            config,
        }
    }

    /// The delay before the next attempt, or `None` once retries are spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.config.max_retries {
            return None;
        }

        let delay = Duration::from_millis(self.current_delay_ms);
        self.current_attempt += 1;

        self.current_delay_ms = ((self.current_delay_ms as f64) * self.config.multiplier)
            .min(self.config.max_delay_ms as f64) as u64;

        Some(delay)
    }

    pub fn attempt(&self) -> usize {
        self.current_attempt
    }
}

/// A provider that retries its inner provider on transient failures.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut policy = RetryPolicy::new(self.config.clone());

        loop {
            let err = match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            let Some(mut delay) = policy.next_delay() else {
                debug!(
                    provider = %self.inner.name(),
                    attempts = policy.attempt() + 1,
                    error = %err,
                    "Provider failed after all retries"
                );
                return Err(err);
            };

            if let ProviderError::RateLimited { retry_after_secs } = &err {
                delay = delay.max(Duration::from_secs(*retry_after_secs));
            }

            warn!(
                provider = %self.inner.name(),
                attempt = policy.attempt(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.inner.health_check().await
    }
}
