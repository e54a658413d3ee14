//! Per-tool circuit breaker.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; failures are counted.
    Closed,
    /// Requests are blocked until the cooldown elapses.
    Open,
    /// Probing whether the tool recovered.
    HalfOpen,
}

/// Circuit breaker settings.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Successes in half-open that close it again.
    pub success_threshold: u32,

    /// Cooldown before an open circuit admits a probe.
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    failures: u32,
    successes: u32,
    opened_at: Option<Instant>,
}

impl Circuit {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            successes: 0,
            opened_at: None,
        }
    }
}

/// Prevents cascading failures by blocking requests to failing tools.
///
/// One state machine per tool, transitioning Closed -> Open -> HalfOpen ->
/// Closed. All transitions happen under the per-tool map entry's lock.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: DashMap<String, Circuit>,
}

impl CircuitBreaker {
    /// Create a breaker with the given settings.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: DashMap::new(),
        }
    }

    /// Whether requests to the tool are currently blocked.
    ///
    /// An open circuit whose cooldown has elapsed transitions to half-open
    /// here and admits the calling probe.
    pub fn is_open(&self, tool_name: &str) -> bool {
        let mut circuit = self
            .circuits
            .entry(tool_name.to_string())
            .or_insert_with(Circuit::closed);

        if circuit.state == CircuitState::Open {
            let cooled_down = circuit
                .opened_at
                .map_or(true, |at| at.elapsed() >= self.config.timeout);
            if cooled_down {
                tracing::info!(tool = tool_name, "circuit half-open, admitting probe");
                circuit.state = CircuitState::HalfOpen;
                circuit.successes = 0;
            }
        }

        circuit.state == CircuitState::Open
    }

    /// Record a successful tool execution.
    pub fn record_success(&self, tool_name: &str) {
        let mut circuit = self
            .circuits
            .entry(tool_name.to_string())
            .or_insert_with(Circuit::closed);

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.successes += 1;
                if circuit.successes >= self.config.success_threshold {
                    tracing::info!(tool = tool_name, "circuit closed after recovery");
                    *circuit = Circuit::closed();
                }
            }
            CircuitState::Closed => circuit.failures = 0,
            CircuitState::Open => {}
        }
    }

    /// Record a failed tool execution.
    pub fn record_failure(&self, tool_name: &str) {
        let mut circuit = self
            .circuits
            .entry(tool_name.to_string())
            .or_insert_with(Circuit::closed);

        match circuit.state {
            CircuitState::HalfOpen => {
                tracing::warn!(tool = tool_name, "probe failed, circuit re-opened");
                circuit.state = CircuitState::Open;
                circuit.successes = 0;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                circuit.failures += 1;
                if circuit.failures >= self.config.failure_threshold {
                    tracing::warn!(
                        tool = tool_name,
                        failures = circuit.failures,
                        "failure threshold reached, circuit opened"
                    );
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {
                circuit.opened_at = Some(Instant::now());
            }
        }
    }

    /// Current state for the tool.
    pub fn state(&self, tool_name: &str) -> CircuitState {
        self.circuits
            .get(tool_name)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Manually restore the tool to a closed circuit.
    pub fn reset(&self, tool_name: &str) {
        self.circuits.remove(tool_name);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
