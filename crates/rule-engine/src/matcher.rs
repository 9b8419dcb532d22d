use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use regex::RegexBuilder;

use crate::schema::{IpListMode, ParamMode, SetMode, StepCondition, TextMode};
use crate::visitor::VisitorInfo;

/// Check whether `visitor` satisfies a step's condition.
///
/// Dispatches to the predicate for the condition type. Missing visitor
/// attributes and malformed patterns both yield `false`; nothing here fails.
pub fn matches_condition(visitor: &VisitorInfo, condition: &StepCondition) -> bool {
    match condition {
        StepCondition::Country {
            countries,
            match_mode,
        } => matches_country(visitor.country.as_deref(), countries, *match_mode),
        StepCondition::Language {
            languages,
            match_mode,
        } => matches_language(visitor.accept_language.as_deref(), languages, *match_mode),
        StepCondition::Ip { ips, match_mode } => matches_ip_list(&visitor.ip, ips, *match_mode),
        StepCondition::UserAgent {
            pattern,
            match_mode,
        } => matches_text(visitor.user_agent.as_deref(), pattern, *match_mode),
        StepCondition::Path {
            pattern,
            match_mode,
        } => matches_text(visitor.request_path.as_deref(), pattern, *match_mode),
        StepCondition::Bot { match_bot } => matches_bot(visitor.is_bot, *match_bot),
        StepCondition::ParamsSearch {
            param_name,
            param_value,
            match_mode,
        } => matches_param(&visitor.search_params, param_name, param_value, *match_mode),
        StepCondition::IpType {
            ip_types,
            match_mode,
        } => matches_ip_type(visitor.ip_type.as_deref(), ip_types, *match_mode),
    }
}

/// Country code membership, case-insensitive.
pub fn matches_country(country: Option<&str>, countries: &[String], mode: SetMode) -> bool {
    let Some(country) = present(country) else {
        return false;
    };
    let country = country.to_uppercase();
    let in_set = countries.iter().any(|c| c.to_uppercase() == country);
    apply_set_mode(in_set, mode)
}

/// Split a raw `Accept-Language` value into lowercase candidate tags.
///
/// Quality weights are dropped and ignored for ordering. After each full tag
/// its primary subtag is appended, unless it equals the tag or is already in
/// the list: `"zh-CN,en;q=0.8"` gives `["zh-cn", "zh", "en"]`.
pub fn parse_accept_language(header: Option<&str>) -> Vec<String> {
    let Some(header) = header else {
        return Vec::new();
    };

    let mut tags: Vec<String> = Vec::new();
    for part in header.split(',') {
        let tag = part
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if tag.is_empty() {
            continue;
        }

        let primary = tag.split('-').next().unwrap_or_default().to_string();
        let has_subtags = primary != tag;
        tags.push(tag);
        if has_subtags && !primary.is_empty() && !tags.contains(&primary) {
            tags.push(primary);
        }
    }
    tags
}

/// Language membership with hyphen-prefix fallback in both directions:
/// configured `zh` matches `zh-cn`, and configured `zh-CN` matches `zh`.
pub fn matches_language(
    accept_language: Option<&str>,
    languages: &[String],
    mode: SetMode,
) -> bool {
    let candidates = parse_accept_language(accept_language);
    if candidates.is_empty() {
        return false;
    }

    let in_set = candidates.iter().any(|candidate| {
        languages
            .iter()
            .any(|configured| language_tags_match(candidate, configured))
    });
    apply_set_mode(in_set, mode)
}

/// `candidate` must already be lowercase (see [`parse_accept_language`]).
fn language_tags_match(candidate: &str, configured: &str) -> bool {
    let configured = configured.to_lowercase();
    candidate == configured
        || is_hyphen_prefix(&configured, candidate)
        || is_hyphen_prefix(candidate, &configured)
}

/// True when `tag` starts with `prefix` immediately followed by a hyphen.
fn is_hyphen_prefix(prefix: &str, tag: &str) -> bool {
    tag.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('-'))
}

/// Check whether `ip` matches a single address or IPv4 CIDR pattern.
///
/// * Exact string equality always matches, which is also the only way an
///   IPv6 address can match.
/// * A pattern containing `/` is read as `network/prefix` with a prefix in
///   `0..=32`; the top `prefix` bits of both addresses are compared.
/// * Anything else, including an unparsable address or prefix, is a
///   non-match.
pub fn matches_ip(ip: &str, pattern: &str) -> bool {
    if ip == pattern {
        return true;
    }

    let Some((network, prefix)) = pattern.split_once('/') else {
        return false;
    };
    let Ok(prefix) = prefix.trim().parse::<u8>() else {
        tracing::debug!(pattern, "invalid CIDR prefix length; treating as non-match");
        return false;
    };
    let (Ok(network), Ok(candidate)) = (
        network.trim().parse::<Ipv4Addr>(),
        ip.trim().parse::<Ipv4Addr>(),
    ) else {
        return false;
    };

    match Ipv4Net::new(network, prefix) {
        Ok(net) => net.contains(&candidate),
        Err(_) => {
            tracing::debug!(pattern, "CIDR prefix length out of range; treating as non-match");
            false
        }
    }
}

/// Membership of `ip` across a pattern list, inverted for blacklists.
pub fn matches_ip_list(ip: &str, patterns: &[String], mode: IpListMode) -> bool {
    let in_set = patterns.iter().any(|pattern| matches_ip(ip, pattern));
    apply_set_mode(in_set, mode.into())
}

/// Match a user-agent or request path.
///
/// `contains` is a case-insensitive substring test. `regex` is a
/// case-insensitive, unanchored search; a pattern that does not compile is
/// logged and treated as a non-match.
pub fn matches_text(value: Option<&str>, pattern: &str, mode: TextMode) -> bool {
    let Some(value) = present(value) else {
        return false;
    };
    match mode {
        TextMode::Contains => contains_ignore_case(value, pattern),
        TextMode::Regex => regex_matches(pattern, value),
    }
}

pub fn matches_bot(is_bot: bool, match_bot: bool) -> bool {
    is_bot == match_bot
}

/// Match the value of the query parameter `name`.
///
/// A missing or empty parameter never matches. `equals` is exact and
/// case-sensitive; `contains` and `regex` ignore case.
pub fn matches_param(
    params: &HashMap<String, String>,
    name: &str,
    expected: &str,
    mode: ParamMode,
) -> bool {
    let Some(value) = present(params.get(name).map(String::as_str)) else {
        return false;
    };
    match mode {
        ParamMode::Equals => value == expected,
        ParamMode::Contains => contains_ignore_case(value, expected),
        ParamMode::Regex => regex_matches(expected, value),
    }
}

/// Network category membership, case-insensitive.
pub fn matches_ip_type(ip_type: Option<&str>, ip_types: &[String], mode: SetMode) -> bool {
    let Some(ip_type) = present(ip_type) else {
        return false;
    };
    let ip_type = ip_type.to_uppercase();
    let in_set = ip_types.iter().any(|t| t.to_uppercase() == ip_type);
    apply_set_mode(in_set, mode)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Empty strings count as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn apply_set_mode(in_set: bool, mode: SetMode) -> bool {
    match mode {
        SetMode::Include => in_set,
        SetMode::Exclude => !in_set,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn regex_matches(pattern: &str, value: &str) -> bool {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern,
                error = %e,
                "failed to compile step regex; treating as non-match"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    // ---- country ----

    #[test]
    fn country_is_case_insensitive() {
        let list = strings(&["cn", "US"]);
        assert!(matches_country(Some("CN"), &list, SetMode::Include));
        assert!(matches_country(Some("us"), &list, SetMode::Include));
        assert!(!matches_country(Some("DE"), &list, SetMode::Include));
    }

    #[test]
    fn country_exclude_inverts() {
        let list = strings(&["CN"]);
        assert!(!matches_country(Some("CN"), &list, SetMode::Exclude));
        assert!(matches_country(Some("JP"), &list, SetMode::Exclude));
    }

    #[test]
    fn missing_country_never_matches() {
        let list = strings(&["CN"]);
        assert!(!matches_country(None, &list, SetMode::Include));
        // Absence is not inverted by exclude mode.
        assert!(!matches_country(None, &list, SetMode::Exclude));
        assert!(!matches_country(Some(""), &list, SetMode::Exclude));
    }

    // ---- language ----

    #[test]
    fn accept_language_parsing() {
        assert_eq!(
            parse_accept_language(Some("zh-CN,en;q=0.8")),
            vec!["zh-cn", "zh", "en"]
        );
        assert_eq!(
            parse_accept_language(Some(" en-US , en-GB;q=0.9, fr ;q=0.5")),
            vec!["en-us", "en", "en-gb", "fr"]
        );
        assert!(parse_accept_language(None).is_empty());
        assert!(parse_accept_language(Some(" , ;q=1")).is_empty());
    }

    #[test]
    fn language_primary_subtag_matches_region_tag() {
        let list = strings(&["zh"]);
        assert!(matches_language(Some("zh-CN,en;q=0.8"), &list, SetMode::Include));
    }

    #[test]
    fn language_region_tag_matches_primary_candidate() {
        let list = strings(&["zh-CN"]);
        assert!(matches_language(Some("zh"), &list, SetMode::Include));
        assert!(matches_language(Some("ZH-cn"), &list, SetMode::Include));
    }

    #[test]
    fn language_different_region_of_other_language_does_not_match() {
        let list = strings(&["en-GB"]);
        assert!(!matches_language(Some("zh-CN"), &list, SetMode::Include));
    }

    #[test]
    fn language_prefix_requires_hyphen_boundary() {
        // "zh" must not match "zhx".
        let list = strings(&["zh"]);
        assert!(!matches_language(Some("zhx"), &list, SetMode::Include));
    }

    #[test]
    fn language_exclude_and_absent_header() {
        let list = strings(&["ja"]);
        assert!(matches_language(Some("en-US"), &list, SetMode::Exclude));
        assert!(!matches_language(Some("ja-JP"), &list, SetMode::Exclude));
        assert!(!matches_language(None, &list, SetMode::Exclude));
        assert!(!matches_language(Some(""), &list, SetMode::Include));
    }

    // ---- ip ----

    #[test]
    fn ip_cidr_membership() {
        assert!(matches_ip("192.168.1.5", "192.168.1.0/24"));
        assert!(!matches_ip("192.168.2.5", "192.168.1.0/24"));
        assert!(matches_ip("10.200.3.4", "10.0.0.0/8"));
        assert!(matches_ip("172.31.255.255", "172.16.0.0/12"));
        assert!(!matches_ip("172.32.0.1", "172.16.0.0/12"));
    }

    #[test]
    fn ip_exact_match() {
        assert!(matches_ip("10.0.0.1", "10.0.0.1"));
        assert!(!matches_ip("10.0.0.2", "10.0.0.1"));
        assert!(matches_ip("::1", "::1"));
    }

    #[test]
    fn ip_cidr_with_host_bits_set_uses_network_bits() {
        assert!(matches_ip("192.168.1.200", "192.168.1.77/24"));
    }

    #[test]
    fn ip_invalid_prefix_never_matches() {
        for addr in ["192.168.1.5", "0.0.0.0", "255.255.255.255"] {
            assert!(!matches_ip(addr, "192.168.1.0/33"));
            assert!(!matches_ip(addr, "192.168.1.0/-1"));
            assert!(!matches_ip(addr, "192.168.1.0/abc"));
        }
    }

    #[test]
    fn ip_prefix_with_trailing_garbage_never_matches() {
        assert!(matches_ip("10.1.2.3", "10.0.0.0/8"));
        assert!(!matches_ip("10.1.2.3", "10.0.0.0/8abc"));
        assert!(!matches_ip("192.168.1.5", "192.168.1.0/24abc"));
        assert!(!matches_ip("192.168.1.5", "192.168.1.0/24.0"));
    }

    #[test]
    fn ip_prefix_bounds() {
        // `/0` covers everything, not just the network address.
        assert!(matches_ip("8.8.8.8", "0.0.0.0/0"));
        assert!(matches_ip("203.0.113.9", "10.0.0.0/0"));
        assert!(matches_ip("1.2.3.4", "1.2.3.4/32"));
        assert!(!matches_ip("1.2.3.5", "1.2.3.4/32"));
    }

    #[test]
    fn ip_unparsable_inputs_never_match() {
        assert!(!matches_ip("unknown", "10.0.0.0/8"));
        assert!(!matches_ip("10.0.0.1", "not-a-network/8"));
        assert!(!matches_ip("2001:db8::1", "2001:db8::/32"));
        assert!(!matches_ip("10.0.0.1", "10.0.0.0"));
    }

    #[test]
    fn ip_list_whitelist_and_blacklist() {
        let list = strings(&["10.0.0.0/8", "203.0.113.9"]);
        assert!(matches_ip_list("10.1.2.3", &list, IpListMode::Whitelist));
        assert!(matches_ip_list("203.0.113.9", &list, IpListMode::Whitelist));
        assert!(!matches_ip_list("8.8.8.8", &list, IpListMode::Whitelist));
        assert!(matches_ip_list("8.8.8.8", &list, IpListMode::Blacklist));
        assert!(!matches_ip_list("10.1.2.3", &list, IpListMode::Blacklist));
    }

    // ---- user agent / path ----

    #[test]
    fn text_contains_ignores_case() {
        assert!(matches_text(Some("/Admin/login"), "/admin", TextMode::Contains));
        assert!(!matches_text(Some("/home"), "/admin", TextMode::Contains));
    }

    #[test]
    fn text_regex_is_case_insensitive_search() {
        let ua = Some("Mozilla/5.0 (compatible; Googlebot/2.1)");
        assert!(matches_text(ua, r"googlebot/\d", TextMode::Regex));
        assert!(!matches_text(ua, r"^googlebot", TextMode::Regex));
    }

    #[test]
    fn text_invalid_regex_returns_false() {
        assert!(!matches_text(Some("anything"), "[invalid", TextMode::Regex));
    }

    #[test]
    fn text_absent_value_never_matches() {
        assert!(!matches_text(None, "", TextMode::Contains));
        assert!(!matches_text(Some(""), "", TextMode::Contains));
        assert!(!matches_text(None, ".*", TextMode::Regex));
    }

    // ---- bot ----

    #[test]
    fn bot_is_equality() {
        assert!(matches_bot(true, true));
        assert!(matches_bot(false, false));
        assert!(!matches_bot(true, false));
        assert!(!matches_bot(false, true));
    }

    // ---- params_search ----

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn param_equals_is_exact() {
        let p = params(&[("src", "Mail")]);
        assert!(matches_param(&p, "src", "Mail", ParamMode::Equals));
        assert!(!matches_param(&p, "src", "mail", ParamMode::Equals));
    }

    #[test]
    fn param_contains_ignores_case() {
        let p = params(&[("utm_source", "NewsLetter-Spring")]);
        assert!(matches_param(&p, "utm_source", "letter", ParamMode::Contains));
        assert!(!matches_param(&p, "utm_source", "autumn", ParamMode::Contains));
    }

    #[test]
    fn param_regex() {
        let p = params(&[("token", "12345")]);
        assert!(matches_param(&p, "token", "^[0-9]+$", ParamMode::Regex));
        let p = params(&[("token", "abc")]);
        assert!(!matches_param(&p, "token", "^[0-9]+$", ParamMode::Regex));
        assert!(!matches_param(&p, "token", "(unclosed", ParamMode::Regex));
    }

    #[test]
    fn param_missing_or_empty_never_matches() {
        let p = params(&[("other", "1"), ("empty", "")]);
        assert!(!matches_param(&p, "token", "", ParamMode::Equals));
        assert!(!matches_param(&p, "empty", "", ParamMode::Equals));
        assert!(!matches_param(&p, "empty", ".*", ParamMode::Regex));
    }

    // ---- ip_type ----

    #[test]
    fn ip_type_membership() {
        let list = strings(&["idc", "ISP"]);
        assert!(matches_ip_type(Some("IDC"), &list, SetMode::Include));
        assert!(!matches_ip_type(Some("RESIDENTIAL"), &list, SetMode::Include));
        assert!(matches_ip_type(Some("residential"), &list, SetMode::Exclude));
        assert!(!matches_ip_type(None, &list, SetMode::Exclude));
    }

    // ---- dispatch ----

    #[test]
    fn condition_dispatch_reads_the_right_attribute() {
        let visitor = VisitorInfo::new("10.0.0.8")
            .with_user_agent("curl/8.4.0")
            .with_path("/api/orders")
            .with_country("FR")
            .with_accept_language("fr-FR")
            .with_param("debug", "1")
            .with_ip_type("RESIDENTIAL")
            .with_bot(true);

        let cases = [
            StepCondition::Country {
                countries: strings(&["fr"]),
                match_mode: SetMode::Include,
            },
            StepCondition::Language {
                languages: strings(&["fr"]),
                match_mode: SetMode::Include,
            },
            StepCondition::Ip {
                ips: strings(&["10.0.0.0/24"]),
                match_mode: IpListMode::Whitelist,
            },
            StepCondition::UserAgent {
                pattern: "CURL".into(),
                match_mode: TextMode::Contains,
            },
            StepCondition::Path {
                pattern: r"^/api/".into(),
                match_mode: TextMode::Regex,
            },
            StepCondition::Bot { match_bot: true },
            StepCondition::ParamsSearch {
                param_name: "debug".into(),
                param_value: "1".into(),
                match_mode: ParamMode::Equals,
            },
            StepCondition::IpType {
                ip_types: strings(&["residential"]),
                match_mode: SetMode::Include,
            },
        ];

        for condition in &cases {
            assert!(
                matches_condition(&visitor, condition),
                "expected {:?} to match",
                condition.step_type()
            );
        }

        let stranger = VisitorInfo::new("8.8.4.4");
        for condition in &cases {
            assert!(
                !matches_condition(&stranger, condition),
                "expected {:?} not to match a bare visitor",
                condition.step_type()
            );
        }
    }
}
