//! # visitor-extract
//!
//! Builds the [`VisitorInfo`](rule_engine::VisitorInfo) that admission rules
//! are evaluated against, from the headers and URI of an incoming request.
//!
//! The crate is organised around three layers:
//!
//! 1. **[`patterns`]** -- static catalogues of user-agent fragments that mark
//!    automated clients and mobile devices.
//! 2. **[`detector`]** -- compiles the catalogues into
//!    [`RegexSet`](regex::RegexSet)s and classifies user-agents.
//! 3. **[`extract`]** -- reads client address, geo headers, query
//!    parameters and IP category according to an [`ExtractorConfig`].
//!
//! ## Quick start
//!
//! ```rust
//! use http::{HeaderMap, Uri};
//! use visitor_extract::{ExtractorConfig, VisitorExtractor};
//!
//! let extractor = VisitorExtractor::new(&ExtractorConfig::default()).unwrap();
//! let mut headers = HeaderMap::new();
//! headers.insert("user-agent", "curl/8.4.0".parse().unwrap());
//! let uri: Uri = "/pricing?plan=pro".parse().unwrap();
//! let visitor = extractor.extract(&headers, &uri);
//! assert!(visitor.is_bot);
//! ```

pub mod detector;
pub mod extract;
pub mod patterns;

pub use detector::{BotDetector, DetectorError};
pub use extract::{
    parse_query, request_host, ExtractError, ExtractorConfig, VisitorExtractor, UNKNOWN_IP,
};
pub use patterns::{AgentPattern, BOT_PATTERNS, MOBILE_PATTERNS};
