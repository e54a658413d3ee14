//! Confidence-based escalation to human oversight.

use serde::{Deserialize, Serialize};

use enact_core::{Error, Result};

/// Escalation levels, from none to mandatory approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationLevel {
    /// High confidence, proceed.
    None,
    /// Medium confidence, notify a human.
    Notify,
    /// Low confidence, human review required.
    Review,
    /// Very low confidence, human approval required.
    Approval,
}

/// Confidence thresholds separating the levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// At or above this: no escalation.
    pub high: f64,
    /// At or above this: notify only.
    pub medium: f64,
    /// At or above this: review required. Below: approval required.
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.9,
            medium: 0.7,
            low: 0.5,
        }
    }
}

/// Result of an escalation evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    pub level: EscalationLevel,
    pub confidence: f64,
    pub requires_human: bool,
    pub message: String,
}

type LevelCallback = Box<dyn Fn(&EscalationDecision) + Send + Sync>;

/// Maps agent confidence to an oversight requirement.
///
/// Review and Approval set `requires_human`; the engine only gates the
/// decision on the Approval level, matching the pipeline contract.
pub struct ConfidenceEscalation {
    thresholds: ConfidenceThresholds,
    on_notify: Option<LevelCallback>,
    on_review: Option<LevelCallback>,
    on_approval: Option<LevelCallback>,
}

impl ConfidenceEscalation {
    /// Create an escalator with the given thresholds.
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self {
            thresholds,
            on_notify: None,
            on_review: None,
            on_approval: None,
        }
    }

    /// Callback fired when a notification-level escalation occurs.
    pub fn on_notify(mut self, callback: impl Fn(&EscalationDecision) + Send + Sync + 'static) -> Self {
        self.on_notify = Some(Box::new(callback));
        self
    }

    /// Callback fired when review is required.
    pub fn on_review(mut self, callback: impl Fn(&EscalationDecision) + Send + Sync + 'static) -> Self {
        self.on_review = Some(Box::new(callback));
        self
    }

    /// Callback fired when approval is required.
    pub fn on_approval(mut self, callback: impl Fn(&EscalationDecision) + Send + Sync + 'static) -> Self {
        self.on_approval = Some(Box::new(callback));
        self
    }

    /// Current thresholds.
    pub fn thresholds(&self) -> ConfidenceThresholds {
        self.thresholds
    }

    /// Evaluate a confidence score.
    ///
    /// Scores outside [0, 1] are an error; the engine converts it into an
    /// internal denial.
    pub fn evaluate(&self, confidence: f64) -> Result<EscalationDecision> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::oversight(format!(
                "confidence must be within [0, 1], got {confidence}"
            )));
        }

        let (level, requires_human, message) = if confidence >= self.thresholds.high {
            (EscalationLevel::None, false, "high confidence")
        } else if confidence >= self.thresholds.medium {
            (EscalationLevel::Notify, false, "medium confidence, human notified")
        } else if confidence >= self.thresholds.low {
            (EscalationLevel::Review, true, "low confidence, human review required")
        } else {
            (
                EscalationLevel::Approval,
                true,
                "very low confidence, human approval required",
            )
        };

        let decision = EscalationDecision {
            level,
            confidence,
            requires_human,
            message: message.to_string(),
        };

        let callback = match level {
            EscalationLevel::None => None,
            EscalationLevel::Notify => self.on_notify.as_ref(),
            EscalationLevel::Review => self.on_review.as_ref(),
            EscalationLevel::Approval => self.on_approval.as_ref(),
        };
        if let Some(callback) = callback {
            callback(&decision);
        }

        Ok(decision)
    }
}

impl Default for ConfidenceEscalation {
    fn default() -> Self {
        Self::new(ConfidenceThresholds::default())
    }
}
