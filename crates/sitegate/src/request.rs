use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Uri};
use serde::Deserialize;

/// A request to evaluate, as given on the command line or in a batch line.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RequestSpec {
    /// Target host. Taken from the URI authority or `Host` header when absent.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_uri() -> String {
    "/".to_string()
}

impl RequestSpec {
    /// Build a request from `Name: value` header arguments.
    pub fn from_args(host: String, uri: String, header_args: &[String]) -> Result<Self> {
        let headers = header_args
            .iter()
            .map(|arg| parse_header_arg(arg))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            host: Some(host),
            uri,
            headers,
        })
    }

    /// Convert into the `http` types the extractor reads.
    pub fn to_parts(&self) -> Result<(HeaderMap, Uri)> {
        let uri: Uri = self
            .uri
            .parse()
            .with_context(|| format!("invalid request URI '{}'", self.uri))?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name '{name}'"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header '{name}'"))?;
            headers.append(header, value);
        }

        Ok((headers, uri))
    }
}

/// Split a `Name: value` argument.
pub fn parse_header_arg(arg: &str) -> Result<(String, String)> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| anyhow!("header '{arg}' is not in 'Name: value' form"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("header '{arg}' has an empty name"));
    }
    Ok((name.to_ascii_lowercase(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_args() {
        assert_eq!(
            parse_header_arg("User-Agent: curl/8.0").unwrap(),
            ("user-agent".to_string(), "curl/8.0".to_string())
        );
        assert_eq!(
            parse_header_arg("referer:https://a.example/x").unwrap(),
            ("referer".to_string(), "https://a.example/x".to_string())
        );
        assert!(parse_header_arg("no-colon").is_err());
        assert!(parse_header_arg(": value").is_err());
    }

    #[test]
    fn spec_from_json_line() {
        let line = r#"{"host":"shop.example.com","uri":"/cart?x=1","headers":{"User-Agent":"curl/8.0"}}"#;
        let spec: RequestSpec = serde_json::from_str(line).unwrap();
        let (headers, uri) = spec.to_parts().unwrap();
        assert_eq!(uri.path(), "/cart");
        assert_eq!(uri.query(), Some("x=1"));
        assert_eq!(headers["user-agent"], "curl/8.0");
    }

    #[test]
    fn spec_defaults() {
        let spec: RequestSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.host, None);
        assert_eq!(spec.uri, "/");
        assert!(spec.headers.is_empty());
    }

    #[test]
    fn bad_parts_are_errors() {
        let spec = RequestSpec {
            host: None,
            uri: "not a uri".to_string(),
            headers: BTreeMap::new(),
        };
        assert!(spec.to_parts().is_err());

        let spec = RequestSpec::from_args(
            "a.example".to_string(),
            "/".to_string(),
            &["bad name: x".to_string()],
        )
        .unwrap();
        let err = spec.to_parts().unwrap_err();
        assert!(err.to_string().contains("invalid header name"));
    }
}
