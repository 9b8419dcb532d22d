use std::sync::Arc;

use anyhow::{anyhow, Result};
use decision_log::{DecisionEntry, DecisionSink};
use rule_engine::{admit, RuleDecision, RuleSource, VisitorInfo};
use serde::Serialize;
use tracing::info;
use visitor_extract::{request_host, VisitorExtractor};

use crate::request::RequestSpec;

/// Result of running one request through the gate.
#[derive(Debug, Serialize)]
pub struct GateOutcome {
    pub host: String,
    pub allowed: bool,
    pub decision: RuleDecision,
    pub visitor: VisitorInfo,
}

/// Extracts the visitor, resolves the host's rule and records the decision.
pub struct Gate {
    source: Arc<dyn RuleSource>,
    extractor: VisitorExtractor,
    log: Option<DecisionSink>,
}

impl Gate {
    pub fn new(
        source: Arc<dyn RuleSource>,
        extractor: VisitorExtractor,
        log: Option<DecisionSink>,
    ) -> Self {
        Self {
            source,
            extractor,
            log,
        }
    }

    /// Evaluate `request`. Errors only when the request itself is malformed.
    pub async fn check(&self, request: &RequestSpec) -> Result<GateOutcome> {
        let (headers, uri) = request.to_parts()?;
        let host = request
            .host
            .clone()
            .or_else(|| request_host(&headers, &uri))
            .ok_or_else(|| anyhow!("request has no host"))?;

        let visitor = self.extractor.extract(&headers, &uri);
        let decision = admit(self.source.as_ref(), &host, &visitor);

        info!(
            host = %host,
            ip = %visitor.ip,
            verdict = ?decision.verdict,
            basis = ?decision.basis,
            rule = decision.rule_name.as_deref().unwrap_or("-"),
            "request evaluated"
        );

        if let Some(log) = &self.log {
            log.record(DecisionEntry::for_request(&host, &visitor, &decision))
                .await;
        }

        Ok(GateOutcome {
            host,
            allowed: decision.is_allowed(),
            decision,
            visitor,
        })
    }
}
