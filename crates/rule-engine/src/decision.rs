use serde::{Deserialize, Serialize};

use crate::schema::{Rule, RuleStep, StepType};

/// Whether the request may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny,
}

/// Why a [`Verdict`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBasis {
    /// No rule is bound to the host, or the bound rule is disabled.
    NoRule,
    /// The rule source failed; admitted without evaluation.
    LookupFailed,
    /// The rule has no steps.
    EmptyRule,
    /// A matching step with the `allow` action ended evaluation.
    AllowStep,
    /// A matching step with the `intercept` action ended evaluation.
    InterceptStep,
    /// Every step was evaluated without reaching `allow` or `intercept`.
    FellThrough,
}

/// The step that ended evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedStep {
    pub id: u64,
    pub name: String,
    pub step_type: StepType,
    pub step_order: i32,
}

impl From<&RuleStep> for MatchedStep {
    fn from(step: &RuleStep) -> Self {
        Self {
            id: step.id,
            name: step.name.clone(),
            step_type: step.step_type(),
            step_order: step.step_order,
        }
    }
}

/// The outcome of evaluating a request against a rule, with enough context
/// to explain it in a log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDecision {
    pub verdict: Verdict,
    pub basis: DecisionBasis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_step: Option<MatchedStep>,
    /// Human-readable reason explaining the decision.
    pub reason: String,
}

impl RuleDecision {
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }

    /// Allow decision for a host with no applicable rule.
    pub fn no_rule(reason: impl Into<String>) -> Self {
        Self::unruled(DecisionBasis::NoRule, reason)
    }

    /// Allow decision for a rule source that could not answer.
    pub fn lookup_failed(reason: impl Into<String>) -> Self {
        Self::unruled(DecisionBasis::LookupFailed, reason)
    }

    fn unruled(basis: DecisionBasis, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Allow,
            basis,
            rule_id: None,
            rule_name: None,
            matched_step: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn empty_rule(rule: &Rule) -> Self {
        Self {
            verdict: Verdict::Allow,
            basis: DecisionBasis::EmptyRule,
            rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            matched_step: None,
            reason: format!("rule '{}' has no steps", rule.name),
        }
    }

    pub(crate) fn fell_through(rule: &Rule) -> Self {
        Self {
            verdict: Verdict::Allow,
            basis: DecisionBasis::FellThrough,
            rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            matched_step: None,
            reason: format!("no step of rule '{}' allowed or intercepted", rule.name),
        }
    }

    pub(crate) fn allowed_by(rule: &Rule, step: &RuleStep) -> Self {
        Self {
            verdict: Verdict::Allow,
            basis: DecisionBasis::AllowStep,
            rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            matched_step: Some(step.into()),
            reason: format!("allowed by step '{}' of rule '{}'", step.name, rule.name),
        }
    }

    pub(crate) fn intercepted_by(rule: &Rule, step: &RuleStep) -> Self {
        Self {
            verdict: Verdict::Deny,
            basis: DecisionBasis::InterceptStep,
            rule_id: Some(rule.id),
            rule_name: Some(rule.name.clone()),
            matched_step: Some(step.into()),
            reason: format!("intercepted by step '{}' of rule '{}'", step.name, rule.name),
        }
    }
}
