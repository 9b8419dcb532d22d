use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::schema::{PolicyFile, Rule};
use crate::store::normalize_host;

/// Load a [`PolicyFile`] from a YAML file on disk.
///
/// Validates the policy after deserialization (version, identifiers, site
/// bindings).
pub fn load_policy(path: impl AsRef<Path>) -> Result<PolicyFile> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file: {}", path.display()))?;
    load_policy_from_str(&contents)
        .with_context(|| format!("failed to parse policy file: {}", path.display()))
}

/// Parse and validate a [`PolicyFile`] from a YAML string.
pub fn load_policy_from_str(yaml: &str) -> Result<PolicyFile> {
    let policy: PolicyFile = serde_yml::from_str(yaml).context("YAML deserialization failed")?;
    validate(&policy)?;
    Ok(policy)
}

/// Run post-deserialization validation checks.
fn validate(policy: &PolicyFile) -> Result<()> {
    if policy.version != "1.0" {
        bail!(
            "unsupported policy version '{}'; only '1.0' is supported",
            policy.version
        );
    }

    let mut rule_ids = HashSet::new();
    for rule in &policy.rules {
        if rule.name.trim().is_empty() {
            bail!("rule {} has an empty name", rule.id);
        }
        if !rule_ids.insert(rule.id) {
            bail!("duplicate rule id: {}", rule.id);
        }
        validate_steps(rule)?;
    }

    let mut domains = HashSet::new();
    for site in &policy.websites {
        let domain = normalize_host(&site.domain);
        if domain.is_empty() {
            bail!("website {} has an empty domain", site.id);
        }
        if !domains.insert(domain.clone()) {
            bail!("duplicate website domain: '{domain}'");
        }
        if let Some(rule_id) = site.rule_id {
            if !rule_ids.contains(&rule_id) {
                bail!(
                    "website '{}' references unknown rule id {}",
                    domain,
                    rule_id
                );
            }
        }
    }

    Ok(())
}

fn validate_steps(rule: &Rule) -> Result<()> {
    let mut ids = HashSet::new();
    let mut orders = HashSet::new();
    for step in &rule.steps {
        if !ids.insert(step.id) {
            bail!("rule '{}': duplicate step id {}", rule.name, step.id);
        }
        if !orders.insert(step.step_order) {
            bail!(
                "rule '{}': duplicate step_order {} (step {})",
                rule.name,
                step.step_order,
                step.id
            );
        }
    }
    Ok(())
}
