//! Token-bucket rate limiter keyed by (agent, tool).

use dashmap::DashMap;
use std::time::Instant;

/// Rate limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Average sustained rate.
    pub max_per_minute: u32,

    /// Bucket capacity: how many calls may land back-to-back.
    pub burst_size: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_per_minute: 60,
            burst_size: 60,
        }
    }
}

/// One token bucket. Tokens and the refill clock mutate together under the
/// owning map entry's lock.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: u32) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, capacity: u32, per_second: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * per_second).min(f64::from(capacity));
        self.last_refill = now;
    }
}

/// Rate limiter for controlling tool access frequency.
///
/// Uses a token bucket per (agent, tool) pair: bursts up to `burst_size`
/// are admitted immediately, then calls drain at `max_per_minute`. Buckets
/// are created full on first reference.
pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Create a limiter with the given settings.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    fn key(agent_id: &str, tool_name: &str) -> String {
        format!("{agent_id}:{tool_name}")
    }

    fn per_second(&self) -> f64 {
        f64::from(self.config.max_per_minute) / 60.0
    }

    /// Refill the pair's bucket, then consume one token if available.
    ///
    /// Returns false without consuming when the bucket is empty.
    pub fn check_limit(&self, agent_id: &str, tool_name: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(Self::key(agent_id, tool_name))
            .or_insert_with(|| Bucket::full(self.config.burst_size));

        bucket.refill(self.config.burst_size, self.per_second());

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            tracing::debug!(agent_id, tool_name, "rate limit exhausted");
            false
        }
    }

    /// Whole tokens currently available for the pair.
    pub fn get_remaining(&self, agent_id: &str, tool_name: &str) -> u32 {
        let mut bucket = self
            .buckets
            .entry(Self::key(agent_id, tool_name))
            .or_insert_with(|| Bucket::full(self.config.burst_size));
        bucket.refill(self.config.burst_size, self.per_second());
        bucket.tokens as u32
    }

    /// Drop the pair's bucket; the next check starts from a full bucket.
    pub fn reset(&self, agent_id: &str, tool_name: &str) {
        self.buckets.remove(&Self::key(agent_id, tool_name));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_then_deny() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_minute: 60,
            burst_size: 3,
        });

        assert!(limiter.check_limit("a", "t"));
        assert!(limiter.check_limit("a", "t"));
        assert!(limiter.check_limit("a", "t"));
        assert!(!limiter.check_limit("a", "t"));
    }

    #[test]
    fn buckets_are_per_pair() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_minute: 60,
            burst_size: 1,
        });

        assert!(limiter.check_limit("a", "t"));
        assert!(!limiter.check_limit("a", "t"));
        // A different agent and a different tool each get a fresh bucket.
        assert!(limiter.check_limit("b", "t"));
        assert!(limiter.check_limit("a", "u"));
    }

    #[test]
    fn tokens_refill_over_time() {
        // 1200/min = 20 tokens per second, so 100ms buys back two tokens.
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_minute: 1200,
            burst_size: 1,
        });

        assert!(limiter.check_limit("a", "t"));
        assert!(!limiter.check_limit("a", "t"));

        std::thread::sleep(Duration::from_millis(100));
        assert!(limiter.check_limit("a", "t"));
    }

    #[test]
    fn reset_restores_the_burst() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_minute: 60,
            burst_size: 2,
        });

        assert!(limiter.check_limit("a", "t"));
        assert!(limiter.check_limit("a", "t"));
        assert_eq!(limiter.get_remaining("a", "t"), 0);

        limiter.reset("a", "t");
        assert_eq!(limiter.get_remaining("a", "t"), 2);
    }
}
