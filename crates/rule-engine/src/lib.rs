//! # rule-engine
//!
//! Admission rules for protected websites. A rule is an ordered list of
//! steps; each step pairs a condition on the visitor (country, language, IP,
//! user-agent, path, bot flag, query parameter, IP category) with an action.
//! Steps are evaluated in order and the first matching `allow` or
//! `intercept` step decides. Everything else admits the request.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rule_engine::{admit, loader, PolicyStore, VisitorInfo};
//!
//! let policy = loader::load_policy("policy.yaml").unwrap();
//! let store = PolicyStore::new(policy);
//! let visitor = VisitorInfo::new("203.0.113.7").with_bot(true);
//! let decision = admit(&store, "shop.example.com", &visitor);
//! println!("{:?}", decision);
//! ```

mod decision;
mod evaluator;
pub mod loader;
pub mod matcher;
mod schema;
mod store;
mod visitor;

// Re-export primary public API at crate root.
pub use decision::{DecisionBasis, MatchedStep, RuleDecision, Verdict};
pub use evaluator::{evaluate, evaluate_rule};
pub use schema::{
    IpListMode, ParamMode, PolicyFile, Rule, RuleStep, SetMode, StepAction, StepCondition,
    StepType, TextMode, Website,
};
pub use store::{admit, normalize_host, PolicyStore, RuleSource, SiteSummary};
pub use visitor::VisitorInfo;
