//! Remote policy: delegate decisions to an external decision service.

use std::collections::HashMap;
use std::time::Duration;

use enact_core::{GovernanceDecision, GovernanceRequest};

/// A policy that POSTs the request to a remote decision service.
///
/// The service receives `{"input": {...request...}}` and answers either
/// `{"result": bool}` or `{"allow": bool, "reason": "..."}`. Transport
/// errors, non-2xx statuses, and unparseable bodies all collapse to
/// `default_allow`, so a `false` default fails closed.
#[derive(Debug)]
pub struct RemotePolicy {
    endpoint: String,
    path: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    default_allow: bool,
    client: reqwest::Client,
}

impl RemotePolicy {
    /// Create a policy for `endpoint` + `path` with a 5 second timeout and a
    /// fail-closed default.
    pub fn new(endpoint: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            path: path.into(),
            headers: HashMap::new(),
            timeout: Duration::from_secs(5),
            default_allow: false,
            client: reqwest::Client::new(),
        }
    }

    /// Add a header sent with every decision request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the decision used when the service is unreachable.
    pub fn with_default_allow(mut self, default_allow: bool) -> Self {
        self.default_allow = default_allow;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    fn unavailable(&self) -> GovernanceDecision {
        if self.default_allow {
            GovernanceDecision::allow("decision service unavailable")
        } else {
            GovernanceDecision::deny("decision service unavailable")
        }
    }

    /// Post the request to the decision service and map its answer.
    pub async fn decide(&self, request: &GovernanceRequest) -> GovernanceDecision {
        let body = serde_json::json!({
            "input": {
                "agent_id": request.agent_id,
                "tool_name": request.tool_name,
                "function_name": request.function_name,
                "arguments": request.arguments,
                "context": request.context,
                "correlation_id": request.correlation_id,
                "timestamp": request.timestamp.to_rfc3339(),
            }
        });

        let mut builder = self
            .client
            .post(self.url())
            .timeout(self.timeout)
            .json(&body);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        let response = match builder.send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, url = %self.url(), "decision service request failed");
                return self.unavailable();
            }
        };

        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "decision service returned a malformed body");
                return self.unavailable();
            }
        };

        self.parse(&payload)
    }

    fn parse(&self, payload: &serde_json::Value) -> GovernanceDecision {
        match payload.get("result") {
            Some(serde_json::Value::Bool(true)) => {
                return GovernanceDecision::allow("allowed by decision service");
            }
            Some(serde_json::Value::Bool(false)) => {
                return GovernanceDecision::deny("denied by decision service");
            }
            // Some services nest the decision object under "result".
            Some(serde_json::Value::Object(_)) => {
                return self.parse_decision(&payload["result"]);
            }
            _ => {}
        }

        if payload.get("allow").is_some() {
            return self.parse_decision(payload);
        }

        tracing::warn!(%payload, "unexpected decision service response shape");
        self.unavailable()
    }

    fn parse_decision(&self, value: &serde_json::Value) -> GovernanceDecision {
        let allow = value
            .get("allow")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let reason = value
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or(if allow {
                "allowed by decision service"
            } else {
                "denied by decision service"
            });
        if allow {
            GovernanceDecision::allow(reason)
        } else {
            GovernanceDecision::deny(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_result_booleans() {
        let policy = RemotePolicy::new("http://localhost:8181", "v1/data/enact/allow");
        assert!(policy.parse(&serde_json::json!({"result": true})).allow);
        assert!(!policy.parse(&serde_json::json!({"result": false})).allow);
    }

    #[test]
    fn parses_decision_objects() {
        let policy = RemotePolicy::new("http://localhost:8181", "decide");
        let decision = policy.parse(&serde_json::json!({"allow": false, "reason": "off-hours"}));
        assert!(!decision.allow);
        assert_eq!(decision.reason, "off-hours");

        let nested =
            policy.parse(&serde_json::json!({"result": {"allow": true, "reason": "trusted"}}));
        assert!(nested.allow);
        assert_eq!(nested.reason, "trusted");
    }

    #[test]
    fn unexpected_shapes_fall_back_to_default() {
        let closed = RemotePolicy::new("http://localhost:8181", "decide");
        let decision = closed.parse(&serde_json::json!({"verdict": "yes"}));
        assert!(!decision.allow);
        assert_eq!(decision.reason, "decision service unavailable");

        let open = RemotePolicy::new("http://localhost:8181", "decide").with_default_allow(true);
        assert!(open.parse(&serde_json::json!({"verdict": "yes"})).allow);
    }

    #[tokio::test]
    async fn unreachable_service_fails_closed() {
        // Nothing listens on this port; the request errors immediately.
        let policy = RemotePolicy::new("http://127.0.0.1:1", "decide")
            .with_timeout(Duration::from_millis(200));
        let req = GovernanceRequest::new("a1", "db", "select_users");

        let decision = policy.decide(&req).await;
        assert!(!decision.allow);
        assert_eq!(decision.reason, "decision service unavailable");
    }
}
