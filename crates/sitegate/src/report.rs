use std::fmt::Write;

use rule_engine::PolicyStore;

/// Human-readable summary of every site in `store`, one line per site.
pub fn site_summary(store: &PolicyStore) -> String {
    let mut out = format!(
        "policy ok: {} rule(s), {} site(s)\n",
        store.rule_count(),
        store.site_count()
    );

    for site in store.sites() {
        let binding = match (site.rule_id, &site.rule_name) {
            (None, _) => "no rule".to_string(),
            (Some(id), None) => format!("rule {id} (disabled)"),
            (Some(id), Some(name)) => {
                format!("rule {id} '{name}', {} active step(s)", site.active_steps)
            }
        };
        let _ = writeln!(out, "  {:<32} {}", site.domain, binding);
    }

    out
}
