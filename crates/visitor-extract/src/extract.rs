use std::collections::HashMap;
use std::net::Ipv4Addr;

use http::header::{HeaderName, InvalidHeaderName, ACCEPT_LANGUAGE, HOST, REFERER, USER_AGENT};
use http::{HeaderMap, Uri};
use ipnet::Ipv4Net;
use percent_encoding::percent_decode_str;
use rule_engine::VisitorInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::detector::{BotDetector, DetectorError};

/// Client address recorded when no header carries one.
pub const UNKNOWN_IP: &str = "unknown";

/// Errors raised while building a [`VisitorExtractor`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid residential range '{range}': {source}")]
    InvalidRange {
        range: String,
        source: ipnet::AddrParseError,
    },

    #[error("invalid header name '{name}': {source}")]
    InvalidHeader {
        name: String,
        source: InvalidHeaderName,
    },

    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Which headers the edge uses to report client attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractorConfig {
    /// Comma-separated proxy chain; the first entry is the client.
    #[serde(default = "default_forwarded_for_header")]
    pub forwarded_for_header: String,

    /// Single-address headers consulted in order when the proxy chain is
    /// absent.
    #[serde(default = "default_client_ip_headers")]
    pub client_ip_headers: Vec<String>,

    /// Geo headers consulted in order; the first non-empty one wins.
    #[serde(default = "default_country_headers")]
    pub country_headers: Vec<String>,

    /// Header carrying a pre-resolved IP category, if the edge provides one.
    #[serde(default)]
    pub ip_type_header: Option<String>,

    /// IPv4 networks labelled with `residential_label` when no category
    /// header is present.
    #[serde(default = "default_residential_ranges")]
    pub residential_ranges: Vec<String>,

    #[serde(default = "default_residential_label")]
    pub residential_label: String,
}

fn default_forwarded_for_header() -> String {
    "x-forwarded-for".to_string()
}

fn default_client_ip_headers() -> Vec<String> {
    vec!["x-real-ip".to_string(), "cf-connecting-ip".to_string()]
}

fn default_country_headers() -> Vec<String> {
    vec!["cf-ipcountry".to_string(), "x-vercel-ip-country".to_string()]
}

fn default_residential_ranges() -> Vec<String> {
    ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "127.0.0.0/8"]
        .iter()
        .map(|r| r.to_string())
        .collect()
}

fn default_residential_label() -> String {
    "RESIDENTIAL".to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            forwarded_for_header: default_forwarded_for_header(),
            client_ip_headers: default_client_ip_headers(),
            country_headers: default_country_headers(),
            ip_type_header: None,
            residential_ranges: default_residential_ranges(),
            residential_label: default_residential_label(),
        }
    }
}

/// Turns a request's headers and URI into a [`VisitorInfo`].
#[derive(Debug, Clone)]
pub struct VisitorExtractor {
    forwarded_for: HeaderName,
    client_ip_headers: Vec<HeaderName>,
    country_headers: Vec<HeaderName>,
    ip_type_header: Option<HeaderName>,
    residential_ranges: Vec<Ipv4Net>,
    residential_label: String,
    detector: BotDetector,
}

impl VisitorExtractor {
    /// Validate `config` and compile the bot detector.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let residential_ranges = config
            .residential_ranges
            .iter()
            .map(|range| {
                range
                    .trim()
                    .parse::<Ipv4Net>()
                    .map_err(|source| ExtractError::InvalidRange {
                        range: range.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ip_type_header = config
            .ip_type_header
            .as_deref()
            .map(header_name)
            .transpose()?;

        let extractor = Self {
            forwarded_for: header_name(&config.forwarded_for_header)?,
            client_ip_headers: header_names(&config.client_ip_headers)?,
            country_headers: header_names(&config.country_headers)?,
            ip_type_header,
            residential_ranges,
            residential_label: config.residential_label.clone(),
            detector: BotDetector::new()?,
        };

        debug!(
            client_ip_headers = extractor.client_ip_headers.len(),
            country_headers = extractor.country_headers.len(),
            residential_ranges = extractor.residential_ranges.len(),
            "visitor extractor ready"
        );

        Ok(extractor)
    }

    /// Build the visitor attributes for one request.
    pub fn extract(&self, headers: &HeaderMap, uri: &Uri) -> VisitorInfo {
        let ip = self.client_ip(headers);
        let user_agent = header_str(headers, &USER_AGENT).map(str::to_string);
        let is_bot = self.detector.is_bot(user_agent.as_deref());
        let is_mobile = self.detector.is_mobile(user_agent.as_deref());
        let ip_type = self.ip_type(headers, &ip);

        let path = uri.path();
        let visitor = VisitorInfo {
            is_bot,
            is_mobile,
            user_agent,
            referer: header_str(headers, &REFERER).map(str::to_string),
            country: first_non_empty(headers, &self.country_headers),
            accept_language: header_str(headers, &ACCEPT_LANGUAGE).map(str::to_string),
            request_path: (!path.is_empty()).then(|| path.to_string()),
            search_params: uri.query().map(parse_query).unwrap_or_default(),
            ip_type,
            ip,
        };

        trace!(
            ip = %visitor.ip,
            is_bot = visitor.is_bot,
            is_mobile = visitor.is_mobile,
            country = ?visitor.country,
            path = ?visitor.request_path,
            "extracted visitor"
        );

        visitor
    }

    fn client_ip(&self, headers: &HeaderMap) -> String {
        let forwarded = header_str(headers, &self.forwarded_for)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        forwarded
            .map(str::to_string)
            .or_else(|| first_non_empty(headers, &self.client_ip_headers))
            .unwrap_or_else(|| UNKNOWN_IP.to_string())
    }

    fn ip_type(&self, headers: &HeaderMap, ip: &str) -> Option<String> {
        if let Some(header) = &self.ip_type_header {
            if let Some(value) = header_str(headers, header).map(str::trim) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }

        let addr: Ipv4Addr = ip.parse().ok()?;
        self.residential_ranges
            .iter()
            .any(|net| net.contains(&addr))
            .then(|| self.residential_label.clone())
    }
}

/// Host the request was addressed to: the URI authority, else the `Host`
/// header. The port, if any, is left for the store to strip.
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(host) = uri.host().filter(|h| !h.is_empty()) {
        return Some(host.to_string());
    }
    header_str(headers, &HOST)
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Decode a URL query string with form-urlencoded rules.
///
/// Empty keys are skipped and the last occurrence of a key wins.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        params.insert(key, decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn header_name(name: &str) -> Result<HeaderName, ExtractError> {
    HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes()).map_err(|source| {
        ExtractError::InvalidHeader {
            name: name.to_string(),
            source,
        }
    })
}

fn header_names(names: &[String]) -> Result<Vec<HeaderName>, ExtractError> {
    names.iter().map(|n| header_name(n)).collect()
}

/// Header value as text. Values that are not visible ASCII count as absent.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn first_non_empty(headers: &HeaderMap, names: &[HeaderName]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| header_str(headers, name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
