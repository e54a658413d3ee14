//! The governance decision pipeline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use enact_core::{
    AuditRecord, Auditor, DecisionSource, GovernanceDecision, GovernanceRequest, ToolIntent,
};
use enact_oversight::{ApprovalWorkflow, ConfidenceEscalation, EscalationLevel, KillSwitch, RiskLevel};
use enact_policies::Policy;
use enact_safety::{CircuitBreaker, QuotaManager, RateLimiter};

use crate::validation::ValidationPipeline;

/// The governance engine: evaluates requests through a strict stage order
/// and audits every decision.
///
/// Stages, each able to short-circuit with a terminal denial:
/// kill-switch, intent validation, rate limit, quota, circuit-breaker
/// precheck, policy evaluation, approval gate, confidence escalation.
/// The audit fan-out runs last and happens before the decision is returned.
///
/// `evaluate` never fails: validator and policy errors become internal
/// denials, sink failures are logged and swallowed.
pub struct GovernanceEngine {
    kill_switch: Arc<KillSwitch>,
    validators: ValidationPipeline,
    rate_limiter: Option<RateLimiter>,
    quota: Option<QuotaManager>,
    breaker: CircuitBreaker,
    approvals: Option<Arc<ApprovalWorkflow>>,
    escalation: Option<ConfidenceEscalation>,
    auditors: Vec<Arc<dyn Auditor>>,
    redacted_arguments: HashSet<String>,
}

impl GovernanceEngine {
    /// Start building an engine.
    pub fn builder() -> GovernanceEngineBuilder {
        GovernanceEngineBuilder::default()
    }

    /// Evaluate a request against a resolved policy.
    ///
    /// Callers resolve the policy per request (typically via the registry)
    /// and report the eventual tool outcome through
    /// [`GovernanceEngine::record_outcome`].
    pub async fn evaluate(
        &self,
        request: &GovernanceRequest,
        policy: &Policy,
    ) -> GovernanceDecision {
        let started = Instant::now();
        let (decision, source) = self.decide(request, policy).await;
        self.audit(request, &decision, source, started.elapsed().as_secs_f64() * 1000.0)
            .await;
        decision
    }

    /// Produce and audit a denial on behalf of an adapter, for conditions
    /// the pipeline never sees (an expired or unknown registry entry).
    pub async fn reject(
        &self,
        request: &GovernanceRequest,
        reason: impl Into<String>,
        source: DecisionSource,
    ) -> GovernanceDecision {
        let decision = GovernanceDecision::deny(reason);
        self.audit(request, &decision, source, 0.0).await;
        decision
    }

    /// Report the outcome of an allowed tool call to the circuit breaker.
    pub fn record_outcome(&self, tool_name: &str, ok: bool) {
        if ok {
            self.breaker.record_success(tool_name);
        } else {
            self.breaker.record_failure(tool_name);
        }
    }

    /// The kill-switch gating this engine.
    pub fn kill_switch(&self) -> &KillSwitch {
        &self.kill_switch
    }

    /// The circuit breaker fed by [`GovernanceEngine::record_outcome`].
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The rate limiter, when one is configured.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// The quota manager, when one is configured.
    pub fn quota(&self) -> Option<&QuotaManager> {
        self.quota.as_ref()
    }

    /// The approval workflow, when one is configured.
    pub fn approvals(&self) -> Option<&Arc<ApprovalWorkflow>> {
        self.approvals.as_ref()
    }

    async fn decide(
        &self,
        request: &GovernanceRequest,
        policy: &Policy,
    ) -> (GovernanceDecision, DecisionSource) {
        // 1. Kill-switch gate: dominates everything, still audited.
        if self.kill_switch.is_active() {
            let reason = self
                .kill_switch
                .status()
                .reason
                .unwrap_or_else(|| "no reason recorded".to_string());
            return (
                GovernanceDecision::deny(format!("kill-switch active: {reason}")),
                DecisionSource::KillSwitch,
            );
        }

        // 2. Intent validation.
        let intent = ToolIntent::from_request(request);
        match self.validators.validate(&intent).await {
            Ok(result) if !result.valid => {
                let reason = result.reason.unwrap_or_else(|| "intent rejected".to_string());
                return (
                    GovernanceDecision::deny(format!("validation: {reason}")),
                    DecisionSource::Validation,
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, correlation_id = %request.correlation_id, "validator failed");
                return (
                    GovernanceDecision::deny("internal: validator error"),
                    DecisionSource::Validation,
                );
            }
        }

        // 3. Rate limit on (agent, tool).
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.check_limit(&request.agent_id, &request.tool_name) {
                return (
                    GovernanceDecision::deny("rate limit exceeded"),
                    DecisionSource::RateLimit,
                );
            }
        }

        // 4. Quota on the agent. Consumed regardless of the policy outcome:
        // the quota protects the decision cost itself.
        if let Some(quota) = &self.quota {
            if !quota.consume(&request.agent_id) {
                return (
                    GovernanceDecision::deny("quota exceeded"),
                    DecisionSource::Quota,
                );
            }
        }

        // 5. Circuit-breaker precheck. An open circuit whose cooldown has
        // elapsed admits this request as the half-open probe.
        if self.breaker.is_open(&request.tool_name) {
            return (
                GovernanceDecision::deny("circuit open"),
                DecisionSource::CircuitBreaker,
            );
        }

        // 6. Policy evaluation.
        let mut decision = match policy.evaluate(request).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, correlation_id = %request.correlation_id, "policy failed");
                return (
                    GovernanceDecision::deny("internal: policy error"),
                    DecisionSource::Policy,
                );
            }
        };

        // 7. Approval gate for high-risk operations the policy allowed.
        if decision.allow {
            if let Some(workflow) = &self.approvals {
                if workflow.requires_approval(&request.tool_name, &request.function_name) {
                    match self.gate_on_human(request, RiskLevel::High) {
                        HumanGate::Approved => {
                            decision = decision
                                .with_metadata("approval", serde_json::json!("granted"));
                        }
                        HumanGate::Pending(pending) => {
                            return (pending, DecisionSource::Approval);
                        }
                    }
                }
            }
        }

        // 8. Confidence escalation on allow decisions.
        if decision.allow {
            if let Some(escalation) = &self.escalation {
                let confidence = request.confidence().unwrap_or(1.0);
                match escalation.evaluate(confidence) {
                    Ok(esc) => match esc.level {
                        EscalationLevel::None => {}
                        EscalationLevel::Approval => {
                            match self.gate_on_human(request, RiskLevel::Critical) {
                                HumanGate::Approved => {
                                    decision = decision
                                        .with_metadata("approval", serde_json::json!("granted"));
                                }
                                HumanGate::Pending(pending) => {
                                    let pending = pending.with_metadata(
                                        "escalation",
                                        serde_json::json!("approval"),
                                    );
                                    return (pending, DecisionSource::Escalation);
                                }
                            }
                        }
                        level => {
                            decision = decision.with_metadata(
                                "escalation",
                                serde_json::to_value(level).unwrap_or_default(),
                            );
                            if esc.requires_human {
                                decision = decision
                                    .with_metadata("requires_human", serde_json::json!(true));
                            }
                        }
                    },
                    Err(e) => {
                        tracing::error!(error = %e, correlation_id = %request.correlation_id, "escalation failed");
                        return (
                            GovernanceDecision::deny("internal: escalation error"),
                            DecisionSource::Escalation,
                        );
                    }
                }
            }
        }

        (decision, DecisionSource::Policy)
    }

    fn gate_on_human(&self, request: &GovernanceRequest, risk: RiskLevel) -> HumanGate {
        let Some(workflow) = &self.approvals else {
            // No workflow to enqueue a ticket with; hold the request anyway.
            return HumanGate::Pending(GovernanceDecision::deny("awaiting approval"));
        };

        if workflow.is_approved(
            &request.agent_id,
            &request.tool_name,
            &request.function_name,
            &request.arguments,
        ) {
            return HumanGate::Approved;
        }

        let ticket = workflow.request_approval(
            request.agent_id.clone(),
            request.tool_name.clone(),
            request.function_name.clone(),
            request.arguments.clone(),
            request.justification().map(str::to_string),
            risk,
        );
        HumanGate::Pending(
            GovernanceDecision::deny("awaiting approval")
                .with_metadata("approval_id", serde_json::json!(ticket.id)),
        )
    }

    async fn audit(
        &self,
        request: &GovernanceRequest,
        decision: &GovernanceDecision,
        source: DecisionSource,
        duration_ms: f64,
    ) {
        let mut record = AuditRecord::new(request, decision, source, duration_ms);
        for name in &self.redacted_arguments {
            if let Some(value) = record.arguments.get_mut(name) {
                *value = serde_json::json!("[REDACTED]");
            }
        }

        for auditor in &self.auditors {
            if let Err(e) = auditor.log(&record).await {
                tracing::warn!(
                    error = %e,
                    correlation_id = %record.correlation_id,
                    "audit sink failed"
                );
            }
        }
    }
}

enum HumanGate {
    Approved,
    Pending(GovernanceDecision),
}

/// Builder for [`GovernanceEngine`].
#[derive(Default)]
pub struct GovernanceEngineBuilder {
    kill_switch: Option<Arc<KillSwitch>>,
    validators: ValidationPipeline,
    rate_limiter: Option<RateLimiter>,
    quota: Option<QuotaManager>,
    breaker: Option<CircuitBreaker>,
    approvals: Option<Arc<ApprovalWorkflow>>,
    escalation: Option<ConfidenceEscalation>,
    auditors: Vec<Arc<dyn Auditor>>,
    redacted_arguments: HashSet<String>,
}

impl GovernanceEngineBuilder {
    /// Share a kill-switch with the rest of the process.
    pub fn with_kill_switch(mut self, kill_switch: Arc<KillSwitch>) -> Self {
        self.kill_switch = Some(kill_switch);
        self
    }

    /// Use the given validator pipeline.
    pub fn with_validators(mut self, validators: ValidationPipeline) -> Self {
        self.validators = validators;
        self
    }

    /// Enable rate limiting.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Enable quota accounting.
    pub fn with_quota(mut self, quota: QuotaManager) -> Self {
        self.quota = Some(quota);
        self
    }

    /// Use the given circuit breaker instead of the default configuration.
    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Enable the approval workflow gate.
    pub fn with_approvals(mut self, approvals: Arc<ApprovalWorkflow>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    /// Enable confidence escalation.
    pub fn with_escalation(mut self, escalation: ConfidenceEscalation) -> Self {
        self.escalation = Some(escalation);
        self
    }

    /// Add an audit sink. Sinks receive every decision in the order they
    /// were added.
    pub fn with_auditor(mut self, auditor: Arc<dyn Auditor>) -> Self {
        self.auditors.push(auditor);
        self
    }

    /// Replace the named argument's value with `"[REDACTED]"` in audit
    /// records. The decision itself still sees the real value.
    pub fn redact_argument(mut self, name: impl Into<String>) -> Self {
        self.redacted_arguments.insert(name.into());
        self
    }

    /// Build the engine.
    pub fn build(self) -> GovernanceEngine {
        GovernanceEngine {
            kill_switch: self.kill_switch.unwrap_or_default(),
            validators: self.validators,
            rate_limiter: self.rate_limiter,
            quota: self.quota,
            breaker: self.breaker.unwrap_or_default(),
            approvals: self.approvals,
            escalation: self.escalation,
            auditors: self.auditors,
            redacted_arguments: self.redacted_arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use enact_core::Result;
    use std::sync::Mutex;

    struct MemoryAuditor {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl MemoryAuditor {
        fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Auditor for MemoryAuditor {
        async fn log(&self, record: &AuditRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn arguments_are_redacted_in_audit_records_only() {
        let auditor = Arc::new(MemoryAuditor::new());
        let engine = GovernanceEngine::builder()
            .with_auditor(auditor.clone())
            .redact_argument("password")
            .build();

        let request = GovernanceRequest::new("a1", "vault", "login")
            .with_argument("user", serde_json::json!("svc"))
            .with_argument("password", serde_json::json!("hunter2"));

        engine.evaluate(&request, &Policy::AllowAll).await;

        let records = auditor.records.lock().unwrap();
        assert_eq!(records[0].arguments["password"], "[REDACTED]");
        assert_eq!(records[0].arguments["user"], "svc");
        // The request itself is untouched.
        assert_eq!(request.arguments["password"], "hunter2");
    }

    #[tokio::test]
    async fn record_outcome_feeds_the_breaker() {
        use enact_safety::{CircuitBreakerConfig, CircuitState};

        let engine = GovernanceEngine::builder()
            .with_circuit_breaker(CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: 2,
                success_threshold: 1,
                timeout: std::time::Duration::from_secs(60),
            }))
            .build();

        engine.record_outcome("flaky", false);
        engine.record_outcome("flaky", false);
        assert_eq!(engine.breaker().state("flaky"), CircuitState::Open);
    }
}
