use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Attributes of a single incoming request, as seen by the matchers.
///
/// Built once per request by the extractor and never mutated afterwards.
/// Optional fields that are `None` (or empty) never satisfy a condition that
/// needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitorInfo {
    /// Client address as reported by the edge, or `"unknown"`.
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Country code from the geo header. Expected to be ISO-3166 alpha-2,
    /// but not validated.
    pub country: Option<String>,
    /// Raw `Accept-Language` header value.
    pub accept_language: Option<String>,
    pub is_bot: bool,
    /// Phone or tablet user-agent. Recorded for the decision log; no
    /// condition type reads it.
    #[serde(default)]
    pub is_mobile: bool,
    pub request_path: Option<String>,
    #[serde(default)]
    pub search_params: HashMap<String, String>,
    /// Pre-resolved network category label such as `RESIDENTIAL` or `IDC`.
    pub ip_type: Option<String>,
}

impl VisitorInfo {
    /// A visitor with only a client address set.
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = Some(accept_language.into());
        self
    }

    pub fn with_bot(mut self, is_bot: bool) -> Self {
        self.is_bot = is_bot;
        self
    }

    pub fn with_mobile(mut self, is_mobile: bool) -> Self {
        self.is_mobile = is_mobile;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.request_path = Some(path.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.search_params.insert(name.into(), value.into());
        self
    }

    pub fn with_ip_type(mut self, ip_type: impl Into<String>) -> Self {
        self.ip_type = Some(ip_type.into());
        self
    }
}
