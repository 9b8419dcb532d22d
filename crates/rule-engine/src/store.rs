use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::decision::RuleDecision;
use crate::evaluator::evaluate_rule;
use crate::schema::{PolicyFile, Rule};
use crate::visitor::VisitorInfo;

/// Anything that can resolve the rule bound to a host.
///
/// `Ok(None)` means the host has no applicable rule. An `Err` is a lookup
/// failure; [`admit`] treats it the same as "no rule".
pub trait RuleSource: Send + Sync {
    fn rule_for_host(&self, host: &str) -> Result<Option<Rule>>;
}

/// Resolve the rule for `host` and evaluate it for `visitor`.
///
/// Hosts without a rule are admitted without evaluation. A failing source is
/// logged and also admits the request.
pub fn admit(source: &dyn RuleSource, host: &str, visitor: &VisitorInfo) -> RuleDecision {
    match source.rule_for_host(host) {
        Ok(Some(rule)) => evaluate_rule(visitor, &rule),
        Ok(None) => {
            debug!(host, "no rule bound to host");
            RuleDecision::no_rule(format!("no rule bound to host '{host}'"))
        }
        Err(e) => {
            warn!(host, error = %e, "rule lookup failed; admitting request");
            RuleDecision::lookup_failed(format!("rule lookup failed: {e:#}"))
        }
    }
}

/// Canonical form of a host name used as the store key.
///
/// Lowercases, trims, drops a trailing `:port` and a trailing dot.
/// Bracketed IPv6 literals keep their brackets; bare IPv6 literals are left
/// intact.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();

    let host = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => host[..=end].to_string(),
            None => host,
        }
    } else {
        match strip_port(&host) {
            Some(name) => name.to_string(),
            None => host,
        }
    };

    match host.strip_suffix('.') {
        Some(name) => name.to_string(),
        None => host,
    }
}

/// `host` without a trailing numeric `:port`, if it has one.
fn strip_port(host: &str) -> Option<&str> {
    let (name, port) = host.rsplit_once(':')?;
    if name.contains(':') || !port.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(name)
}

/// One protected website as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSummary {
    pub domain: String,
    pub name: String,
    pub rule_id: Option<u64>,
    pub rule_name: Option<String>,
    /// Enabled steps of the resolved rule, or 0 without a rule.
    pub active_steps: usize,
}

#[derive(Debug)]
struct Site {
    name: String,
    /// Declared binding, kept even when the rule is disabled.
    rule_id: Option<u64>,
    /// Resolved rule ready for evaluation.
    rule: Option<Rule>,
}

/// In-memory index from normalized host to resolved rule.
///
/// Built once from a [`PolicyFile`] and immutable afterwards. Resolved rules
/// carry only their enabled steps, sorted by `step_order`.
#[derive(Debug)]
pub struct PolicyStore {
    sites: BTreeMap<String, Site>,
    rule_count: usize,
}

impl PolicyStore {
    pub fn new(policy: PolicyFile) -> Self {
        let rule_count = policy.rules.len();
        let rules: HashMap<u64, Rule> = policy
            .rules
            .into_iter()
            .map(|rule| (rule.id, rule))
            .collect();

        let mut sites = BTreeMap::new();
        for website in policy.websites {
            let rule = website
                .rule_id
                .and_then(|id| rules.get(&id))
                .filter(|rule| rule.enabled)
                .map(resolve);
            let domain = normalize_host(&website.domain);
            sites.insert(
                domain,
                Site {
                    name: website.name,
                    rule_id: website.rule_id,
                    rule,
                },
            );
        }

        info!(
            rules = rule_count,
            sites = sites.len(),
            "policy store built"
        );

        Self { sites, rule_count }
    }

    /// Number of rules declared in the policy, enabled or not.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Resolved rule for `host`, if any.
    pub fn rule(&self, host: &str) -> Option<&Rule> {
        self.sites
            .get(&normalize_host(host))
            .and_then(|site| site.rule.as_ref())
    }

    /// Summaries of every website, ordered by domain.
    pub fn sites(&self) -> Vec<SiteSummary> {
        self.sites
            .iter()
            .map(|(domain, site)| SiteSummary {
                domain: domain.clone(),
                name: site.name.clone(),
                rule_id: site.rule_id,
                rule_name: site.rule.as_ref().map(|r| r.name.clone()),
                active_steps: site.rule.as_ref().map_or(0, |r| r.steps.len()),
            })
            .collect()
    }
}

impl RuleSource for PolicyStore {
    fn rule_for_host(&self, host: &str) -> Result<Option<Rule>> {
        Ok(self.rule(host).cloned())
    }
}

/// Copy of `rule` with disabled steps removed and the rest in `step_order`.
fn resolve(rule: &Rule) -> Rule {
    let mut resolved = rule.clone();
    resolved.steps.retain(|step| step.enabled);
    // Stable, so equal orders keep declaration order.
    resolved.steps.sort_by_key(|step| step.step_order);
    resolved
}
