#![deny(unused)]
//! Safety primitives for Enact.
//!
//! This crate provides:
//! - Per-(agent, tool) token-bucket rate limiting
//! - Per-agent rolling-window action quotas
//! - Per-tool circuit breaking
//! - A timeout + retry wrapper for caller-side tool execution
//!
//! All state is in-memory and process-local; entries are created lazily on
//! first reference and live for the process.

pub mod circuit_breaker;
pub mod quota;
pub mod rate_limiter;
pub mod reliability;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use quota::{QuotaConfig, QuotaManager};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use reliability::{Reliable, ReliabilityError, RetryConfig};
