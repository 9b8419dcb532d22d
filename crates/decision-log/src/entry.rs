use rule_engine::{DecisionBasis, RuleDecision, Verdict, VisitorInfo};
use serde::{Deserialize, Serialize};

/// One line of the decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    pub id: uuid::Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub event: DecisionEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor: Option<VisitorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<RuleDecision>,
    pub details: serde_json::Value,
}

impl DecisionEntry {
    /// Entry with a fresh UUID v4 and the current UTC time.
    pub fn new(event: DecisionEvent, details: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            event,
            host: None,
            visitor: None,
            decision: None,
            details,
        }
    }

    /// Entry describing the admission decision for one request.
    ///
    /// The event kind follows the decision: a failed rule lookup is
    /// recorded as [`DecisionEvent::RuleLookupFailed`] even though the
    /// request was admitted.
    pub fn for_request(host: &str, visitor: &VisitorInfo, decision: &RuleDecision) -> Self {
        let event = match (decision.basis, decision.verdict) {
            (DecisionBasis::LookupFailed, _) => DecisionEvent::RuleLookupFailed,
            (_, Verdict::Allow) => DecisionEvent::RequestAllowed,
            (_, Verdict::Deny) => DecisionEvent::RequestDenied,
        };
        Self::new(event, serde_json::Value::Null)
            .with_host(host)
            .with_visitor(visitor.into())
            .with_decision(decision.clone())
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_visitor(mut self, visitor: VisitorSummary) -> Self {
        self.visitor = Some(visitor);
        self
    }

    pub fn with_decision(mut self, decision: RuleDecision) -> Self {
        self.decision = Some(decision);
        self
    }
}

/// What the entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionEvent {
    RequestAllowed,
    RequestDenied,
    RuleLookupFailed,
    PolicyLoaded,
    ProcessStarted,
    ProcessStopped,
}

/// The visitor attributes worth keeping in a log line.
///
/// Query parameters are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitorSummary {
    pub ip: String,
    pub is_bot: bool,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_type: Option<String>,
}

impl From<&VisitorInfo> for VisitorSummary {
    fn from(visitor: &VisitorInfo) -> Self {
        Self {
            ip: visitor.ip.clone(),
            is_bot: visitor.is_bot,
            is_mobile: visitor.is_mobile,
            country: visitor.country.clone(),
            user_agent: visitor.user_agent.clone(),
            referer: visitor.referer.clone(),
            accept_language: visitor.accept_language.clone(),
            path: visitor.request_path.clone(),
            ip_type: visitor.ip_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_entry_takes_event_from_decision() {
        let visitor = VisitorInfo::new("203.0.113.7")
            .with_bot(true)
            .with_path("/cart")
            .with_param("coupon", "secret");

        let allowed = RuleDecision::no_rule("no rule bound to host 'a.example'");
        let entry = DecisionEntry::for_request("a.example", &visitor, &allowed);
        assert_eq!(entry.event, DecisionEvent::RequestAllowed);
        assert_eq!(entry.host.as_deref(), Some("a.example"));

        let failed = RuleDecision::lookup_failed("rule lookup failed: timeout");
        let entry = DecisionEntry::for_request("a.example", &visitor, &failed);
        assert_eq!(entry.event, DecisionEvent::RuleLookupFailed);
    }

    #[test]
    fn serializes_as_flat_json() {
        let visitor = VisitorInfo::new("198.51.100.2")
            .with_country("FR")
            .with_param("coupon", "secret");
        let decision = RuleDecision::no_rule("none");
        let entry = DecisionEntry::for_request("shop.example.com", &visitor, &decision);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], "request_allowed");
        assert_eq!(json["host"], "shop.example.com");
        assert_eq!(json["visitor"]["ip"], "198.51.100.2");
        assert_eq!(json["visitor"]["country"], "FR");
        assert!(json["visitor"].get("search_params").is_none());
        assert_eq!(json["decision"]["verdict"], "allow");
        assert!(json["details"].is_null());
    }

    #[test]
    fn summary_keeps_client_description() {
        let visitor = VisitorInfo::new("198.51.100.2")
            .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)")
            .with_mobile(true)
            .with_referer("https://news.example.org/")
            .with_accept_language("ja-JP,ja;q=0.9");
        let summary = VisitorSummary::from(&visitor);
        assert!(summary.is_mobile);
        assert_eq!(summary.referer.as_deref(), Some("https://news.example.org/"));
        assert_eq!(summary.accept_language.as_deref(), Some("ja-JP,ja;q=0.9"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["is_mobile"], true);
        assert_eq!(json["referer"], "https://news.example.org/");
        assert_eq!(json["accept_language"], "ja-JP,ja;q=0.9");

        let desktop = VisitorSummary::from(&VisitorInfo::new("198.51.100.3"));
        let json = serde_json::to_value(&desktop).unwrap();
        assert_eq!(json["is_mobile"], false);
        assert!(json.get("referer").is_none());
        assert!(json.get("accept_language").is_none());
    }

    #[test]
    fn lifecycle_entry_has_no_request_fields() {
        let entry = DecisionEntry::new(
            DecisionEvent::PolicyLoaded,
            serde_json::json!({"rules": 3, "sites": 2}),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"], "policy_loaded");
        assert_eq!(json["details"]["rules"], 3);
        assert!(json.get("host").is_none());
        assert!(json.get("visitor").is_none());
        assert!(json.get("decision").is_none());
    }
}
