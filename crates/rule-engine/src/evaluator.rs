use tracing::{debug, trace};

use crate::decision::RuleDecision;
use crate::matcher::matches_condition;
use crate::schema::{Rule, StepAction};
use crate::visitor::VisitorInfo;

/// Evaluate `rule` for `visitor`. `true` admits the request.
///
/// Equivalent to `evaluate_rule(visitor, rule).is_allowed()`.
pub fn evaluate(visitor: &VisitorInfo, rule: &Rule) -> bool {
    evaluate_rule(visitor, rule).is_allowed()
}

/// Evaluate `rule` for `visitor` and report which step, if any, decided.
///
/// Steps are scanned once, in the order given; disabled steps are skipped.
/// The first matching `intercept` step denies and the first matching
/// `allow` step admits. Matching `continue` steps (and actions this build
/// does not recognize) fall through to the next step. A rule that runs out
/// of steps admits the request.
pub fn evaluate_rule(visitor: &VisitorInfo, rule: &Rule) -> RuleDecision {
    if rule.steps.is_empty() {
        trace!(rule = %rule.name, "rule has no steps");
        return RuleDecision::empty_rule(rule);
    }

    debug!(
        rule = %rule.name,
        steps = rule.steps.len(),
        ip = %visitor.ip,
        "evaluating rule"
    );

    for step in rule.steps.iter().filter(|s| s.enabled) {
        if !matches_condition(visitor, &step.condition) {
            trace!(step = %step.name, step_type = %step.step_type(), "step did not match");
            continue;
        }

        match Transition::from(step.action) {
            Transition::Deny => {
                debug!(rule = %rule.name, step = %step.name, "step intercepted request");
                return RuleDecision::intercepted_by(rule, step);
            }
            Transition::Admit => {
                debug!(rule = %rule.name, step = %step.name, "step allowed request");
                return RuleDecision::allowed_by(rule, step);
            }
            Transition::Next => {
                if step.action == StepAction::Unknown {
                    debug!(step = %step.name, "unrecognized step action; continuing");
                }
                trace!(step = %step.name, "step matched; continuing");
            }
        }
    }

    RuleDecision::fell_through(rule)
}

/// Edge taken out of a step whose condition matched.
#[derive(Debug, PartialEq)]
enum Transition {
    Deny,
    Admit,
    Next,
}

impl From<StepAction> for Transition {
    fn from(action: StepAction) -> Self {
        match action {
            StepAction::Intercept => Transition::Deny,
            StepAction::Allow => Transition::Admit,
            StepAction::Continue | StepAction::Unknown => Transition::Next,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
