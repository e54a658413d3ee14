//! End-to-end pipeline tests for the governance engine.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enact_core::{
    AuditRecord, Auditor, DecisionSource, Error, GovernanceDecision, GovernanceRequest,
    PolicyEval, Result, Rule, RuleAction,
};
use enact_governance::{GovernanceEngine, JustificationValidator, ValidationPipeline};
use enact_oversight::{ApprovalWorkflow, ConfidenceEscalation, KillSwitch};
use enact_policies::{Policy, RuleBasedPolicy};
use enact_registry::{ToolAccess, ToolRegistration, ToolRegistry};
use enact_safety::{
    CircuitBreaker, CircuitBreakerConfig, QuotaConfig, QuotaManager, RateLimiter,
    RateLimiterConfig,
};

// =============================================================================
// Mocks
// =============================================================================

struct MemoryAuditor {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditor {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Auditor for MemoryAuditor {
    async fn log(&self, record: &AuditRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FailingAuditor {
    attempts: AtomicU32,
}

impl FailingAuditor {
    fn new() -> Self {
        Self {
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Auditor for FailingAuditor {
    async fn log(&self, _record: &AuditRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::audit("sink outage"))
    }
}

struct BrokenPolicy;

#[async_trait]
impl PolicyEval for BrokenPolicy {
    async fn evaluate(&self, _request: &GovernanceRequest) -> Result<GovernanceDecision> {
        Err(Error::internal("policy backend down"))
    }
}

fn read_only_policy() -> Policy {
    Policy::rule_based(
        RuleBasedPolicy::new(
            vec![Rule::new("database", "select_.*", RuleAction::Allow, "Read-only")],
            false,
        )
        .unwrap(),
    )
}

// =============================================================================
// Policy scenarios
// =============================================================================

#[tokio::test]
async fn default_deny_policy_allows_only_matching_calls() {
    let engine = GovernanceEngine::builder().build();
    let policy = read_only_policy();

    let select = GovernanceRequest::new("a1", "database", "select_users");
    let decision = engine.evaluate(&select, &policy).await;
    assert!(decision.allow);
    assert_eq!(decision.reason, "Read-only");

    let drop = GovernanceRequest::new("a1", "database", "drop_table");
    let decision = engine.evaluate(&drop, &policy).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "no rule matched");
}

#[tokio::test]
async fn agent_specific_rules_discriminate_by_caller() {
    let engine = GovernanceEngine::builder().build();
    let policy = Policy::rule_based(
        RuleBasedPolicy::new(
            vec![
                Rule::new("db", "delete_.*", RuleAction::Allow, "admin cleanup")
                    .for_agent("admin_bob"),
                Rule::new(".*", ".*", RuleAction::Deny, "locked down"),
            ],
            false,
        )
        .unwrap(),
    );

    let bob = GovernanceRequest::new("admin_bob", "db", "delete_table");
    assert!(engine.evaluate(&bob, &policy).await.allow);

    let alice = GovernanceRequest::new("alice", "db", "delete_table");
    assert!(!engine.evaluate(&alice, &policy).await.allow);
}

#[tokio::test]
async fn repeated_evaluation_is_deterministic() {
    let engine = GovernanceEngine::builder().build();
    let policy = read_only_policy();
    let request = GovernanceRequest::new("a1", "database", "select_users");

    let first = engine.evaluate(&request, &policy).await;
    let second = engine.evaluate(&request, &policy).await;
    assert_eq!(first.allow, second.allow);
    assert_eq!(first.reason, second.reason);
}

// =============================================================================
// Safety stages
// =============================================================================

#[tokio::test]
async fn rate_limit_denies_after_the_burst() {
    let engine = GovernanceEngine::builder()
        .with_rate_limiter(RateLimiter::new(RateLimiterConfig {
            max_per_minute: 60,
            burst_size: 3,
        }))
        .build();

    let request = GovernanceRequest::new("a", "t", "f");
    for _ in 0..3 {
        assert!(engine.evaluate(&request, &Policy::AllowAll).await.allow);
    }

    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "rate limit exceeded");
}

#[tokio::test]
async fn quota_is_consumed_even_when_policy_denies() {
    let engine = GovernanceEngine::builder()
        .with_quota(QuotaManager::new(QuotaConfig {
            max_actions: 2,
            window: Duration::from_secs(3600),
        }))
        .build();

    let request = GovernanceRequest::new("a1", "db", "drop_table");

    // Two policy denials still burn quota.
    for _ in 0..2 {
        let decision = engine.evaluate(&request, &Policy::DenyAll).await;
        assert_eq!(decision.reason, "deny-all policy");
    }

    let decision = engine.evaluate(&request, &Policy::DenyAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "quota exceeded");
}

#[tokio::test]
async fn breaker_cycle_open_probe_close() {
    let engine = GovernanceEngine::builder()
        .with_circuit_breaker(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(150),
        }))
        .build();

    let request = GovernanceRequest::new("a1", "search", "query");

    engine.record_outcome("search", false);
    engine.record_outcome("search", false);

    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "circuit open");

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Cooldown elapsed: this request is admitted as the half-open probe.
    assert!(engine.evaluate(&request, &Policy::AllowAll).await.allow);

    engine.record_outcome("search", true);
    assert!(engine.evaluate(&request, &Policy::AllowAll).await.allow);
}

// =============================================================================
// Validation stage
// =============================================================================

#[tokio::test]
async fn validation_failures_short_circuit_with_prefixed_reason() {
    let engine = GovernanceEngine::builder()
        .with_validators(
            ValidationPipeline::new().with_validator(JustificationValidator::new(10)),
        )
        .build();

    let request = GovernanceRequest::new("a1", "db", "select_users");
    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(
        decision.reason,
        "validation: justification: missing justification"
    );

    let justified = GovernanceRequest::new("a1", "db", "select_users")
        .with_justification("scheduled compliance export");
    assert!(engine.evaluate(&justified, &Policy::AllowAll).await.allow);
}

#[tokio::test]
async fn broken_policy_becomes_an_internal_denial() {
    let engine = GovernanceEngine::builder().build();
    let request = GovernanceRequest::new("a1", "db", "select_users");

    let decision = engine.evaluate(&request, &Policy::custom(BrokenPolicy)).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "internal: policy error");
}

// =============================================================================
// Kill-switch
// =============================================================================

#[tokio::test]
async fn kill_switch_dominates_every_policy() {
    let kill_switch = Arc::new(KillSwitch::new());
    let auditor = Arc::new(MemoryAuditor::new());
    let engine = GovernanceEngine::builder()
        .with_kill_switch(kill_switch.clone())
        .with_auditor(auditor.clone())
        .build();

    kill_switch.activate("oncall", "containment drill");

    let request = GovernanceRequest::new("a1", "db", "select_users");
    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "kill-switch active: containment drill");

    // The denial is audited like any other decision.
    let records = auditor.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision_source, DecisionSource::KillSwitch);

    kill_switch.deactivate("oncall");
    assert!(engine.evaluate(&request, &Policy::AllowAll).await.allow);
}

// =============================================================================
// Oversight stages
// =============================================================================

#[tokio::test]
async fn high_risk_calls_wait_for_approval_then_pass_on_resubmit() {
    let workflow = Arc::new(
        ApprovalWorkflow::new(["payments".to_string()], Vec::<String>::new()).unwrap(),
    );
    let engine = GovernanceEngine::builder()
        .with_approvals(workflow.clone())
        .build();

    let request = GovernanceRequest::new("a1", "payments", "refund")
        .with_argument("amount", serde_json::json!(250));

    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "awaiting approval");
    let ticket_id = decision.metadata["approval_id"].as_str().unwrap().to_string();
    assert_eq!(workflow.pending().len(), 1);

    workflow.approve(&ticket_id, "supervisor").unwrap();

    // The caller re-submits the same request after approval.
    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(decision.allow);
    assert_eq!(decision.metadata["approval"], "granted");
}

#[tokio::test]
async fn approval_gate_only_intercepts_policy_allowed_calls() {
    let workflow = Arc::new(
        ApprovalWorkflow::new(["payments".to_string()], Vec::<String>::new()).unwrap(),
    );
    let engine = GovernanceEngine::builder()
        .with_approvals(workflow.clone())
        .build();

    let request = GovernanceRequest::new("a1", "payments", "refund");
    let decision = engine.evaluate(&request, &Policy::DenyAll).await;
    assert_eq!(decision.reason, "deny-all policy");
    assert!(workflow.pending().is_empty());
}

#[tokio::test]
async fn low_confidence_escalates_to_approval() {
    let workflow = Arc::new(
        ApprovalWorkflow::new(Vec::<String>::new(), Vec::<String>::new()).unwrap(),
    );
    let engine = GovernanceEngine::builder()
        .with_approvals(workflow.clone())
        .with_escalation(ConfidenceEscalation::default())
        .build();

    let request =
        GovernanceRequest::new("a1", "db", "select_users").with_confidence(0.4);

    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "awaiting approval");
    assert_eq!(decision.metadata["escalation"], "approval");
    assert!(decision.metadata.contains_key("approval_id"));
    assert_eq!(workflow.pending().len(), 1);
}

#[tokio::test]
async fn review_level_confidence_annotates_without_blocking() {
    let engine = GovernanceEngine::builder()
        .with_escalation(ConfidenceEscalation::default())
        .build();

    let request = GovernanceRequest::new("a1", "db", "select_users").with_confidence(0.6);
    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(decision.allow);
    assert_eq!(decision.metadata["escalation"], "review");
    assert_eq!(decision.metadata["requires_human"], true);

    let confident = GovernanceRequest::new("a1", "db", "select_users").with_confidence(0.95);
    let decision = engine.evaluate(&confident, &Policy::AllowAll).await;
    assert!(decision.allow);
    assert!(!decision.metadata.contains_key("escalation"));
}

#[tokio::test]
async fn out_of_range_confidence_is_an_internal_denial() {
    let engine = GovernanceEngine::builder()
        .with_escalation(ConfidenceEscalation::default())
        .build();

    let request = GovernanceRequest::new("a1", "db", "select_users").with_confidence(1.5);
    let decision = engine.evaluate(&request, &Policy::AllowAll).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "internal: escalation error");
}

// =============================================================================
// Audit fan-out
// =============================================================================

#[tokio::test]
async fn every_sink_sees_every_decision_exactly_once() {
    let failing = Arc::new(FailingAuditor::new());
    let first = Arc::new(MemoryAuditor::new());
    let second = Arc::new(MemoryAuditor::new());

    let engine = GovernanceEngine::builder()
        .with_auditor(first.clone())
        .with_auditor(failing.clone())
        .with_auditor(second.clone())
        .build();

    let request = GovernanceRequest::new("a1", "db", "select_users");
    engine.evaluate(&request, &Policy::AllowAll).await;
    engine.evaluate(&request, &Policy::DenyAll).await;

    // A failing sink in the middle never starves the one after it.
    assert_eq!(first.records().len(), 2);
    assert_eq!(failing.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(second.records().len(), 2);

    let records = second.records();
    assert!(records[0].allow);
    assert!(!records[1].allow);
    assert_eq!(records[0].correlation_id, request.correlation_id);
    assert!(records[0].duration_ms >= 0.0);
}

// =============================================================================
// Registry composition
// =============================================================================

#[tokio::test]
async fn tool_policy_wins_the_precedence_fight() {
    let registry = ToolRegistry::new();
    registry
        .create_group("ops", Some(Policy::AllowAll))
        .unwrap();
    registry.add_agent_to_group("alice", "ops").unwrap();
    registry.set_agent_policy("alice", Policy::AllowAll);
    registry
        .register_tool(ToolRegistration::new("db", "handle").with_policy(Policy::DenyAll))
        .unwrap();

    let engine = GovernanceEngine::builder().build();
    let request = GovernanceRequest::new("alice", "db", "select_users");

    let policy = registry.get_policy_for_tool("db", "alice").unwrap();
    let decision = engine.evaluate(&request, &policy).await;
    assert!(!decision.allow);
    assert_eq!(decision.reason, "deny-all policy");
}

#[tokio::test]
async fn expired_tools_produce_an_audited_standard_denial() {
    let registry = ToolRegistry::new();
    registry
        .register_tool(
            ToolRegistration::new("legacy", "handle")
                .expires_at(chrono::Utc::now() - chrono::Duration::hours(1)),
        )
        .unwrap();

    let auditor = Arc::new(MemoryAuditor::new());
    let engine = GovernanceEngine::builder().with_auditor(auditor.clone()).build();

    let request = GovernanceRequest::new("a1", "legacy", "run");
    let decision = match registry.access("legacy", "a1") {
        ToolAccess::Granted(_) => panic!("expired tool must not resolve"),
        _ => engine.reject(&request, "tool expired", DecisionSource::Registry).await,
    };

    assert!(!decision.allow);
    assert_eq!(decision.reason, "tool expired");

    let records = auditor.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decision_source, DecisionSource::Registry);
    assert_eq!(records[0].reason, "tool expired");
}
