//! Timeout and retry wrapper for caller-side tool execution.
//!
//! The governance engine never retries; this wrapper belongs around the tool
//! handle itself, after a request has been allowed.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Ceiling for any single delay.
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each attempt.
    pub exponential_base: f64,

    /// Randomize each delay uniformly in [0.5x, 1.5x].
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

/// Errors surfaced by the wrapper.
#[derive(Error, Debug)]
pub enum ReliabilityError {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// Wraps an async operation with a per-attempt timeout and retries with
/// exponential backoff.
#[derive(Debug, Clone)]
pub struct Reliable {
    timeout: Duration,
    retry: RetryConfig,
}

impl Reliable {
    /// Create a wrapper with a 30 second per-attempt timeout and default
    /// retry behavior.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry behavior.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Run the operation, retrying on error or timeout.
    ///
    /// `op` is called once per attempt. A timed-out attempt counts as a
    /// failure and is retried like any other; once attempts are exhausted
    /// the last cause is wrapped in [`ReliabilityError::MaxRetriesExceeded`].
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ReliabilityError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut delay = self.retry.initial_delay;
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 1..=self.retry.max_attempts.max(1) {
            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    tracing::debug!(attempt, error = %e, "attempt failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::debug!(attempt, timeout = ?self.timeout, "attempt timed out");
                    last_error = Some(ReliabilityError::Timeout(self.timeout).into());
                }
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.backoff(delay)).await;
                delay = delay.mul_f64(self.retry.exponential_base).min(self.retry.max_delay);
            }
        }

        Err(ReliabilityError::MaxRetriesExceeded {
            attempts: self.retry.max_attempts.max(1),
            source: last_error.unwrap_or_else(|| anyhow::anyhow!("no attempts were made")),
        })
    }

    /// Run the operation once, surfacing a timeout directly.
    pub async fn call_once<T, Fut>(&self, fut: Fut) -> Result<T, ReliabilityError>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ReliabilityError::MaxRetriesExceeded {
                attempts: 1,
                source: e,
            }),
            Err(_) => Err(ReliabilityError::Timeout(self.timeout)),
        }
    }

    fn backoff(&self, delay: Duration) -> Duration {
        let delay = if self.retry.jitter {
            let factor = rand::thread_rng().gen_range(0.5..1.5);
            delay.mul_f64(factor)
        } else {
            delay
        };
        delay.min(self.retry.max_delay)
    }
}

impl Default for Reliable {
    fn default() -> Self {
        Self::new()
    }
}
