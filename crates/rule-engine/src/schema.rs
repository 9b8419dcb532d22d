use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level policy snapshot loaded from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    /// Schema version; currently must be "1.0".
    pub version: String,
    /// Every rule known to the authoring layer, enabled or not.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Websites and the rule bound to each of them.
    #[serde(default)]
    pub websites: Vec<Website>,
}

/// A protected website, keyed by its domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Website {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Host the website is served on. Normalized before lookup, so
    /// `Shop.Example.com:443` and `shop.example.com` are the same site.
    pub domain: String,
    /// Rule applied to requests for this website. `None` admits everything.
    #[serde(default)]
    pub rule_id: Option<u64>,
}

/// An ordered admission policy.
///
/// Steps are evaluated in the order of the `steps` vector. When a rule comes
/// out of [`PolicyStore`](crate::PolicyStore) that vector has already been
/// filtered to enabled steps and sorted by `step_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: u64,
    /// Human-readable rule name.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// A disabled rule is treated as "no rule" by the store. The evaluator
    /// itself does not look at this flag.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub steps: Vec<RuleStep>,
}

/// One condition + action unit within a [`Rule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStep {
    pub id: u64,
    /// Display/persistence ordering. Unique within a rule.
    #[serde(default)]
    pub step_order: i32,
    /// Human label shown in the authoring UI and in decision logs.
    #[serde(default)]
    pub name: String,
    /// What to do when the condition matches.
    #[serde(default)]
    pub action: StepAction,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub condition: StepCondition,
}

impl RuleStep {
    /// The condition type of this step.
    pub fn step_type(&self) -> StepType {
        self.condition.step_type()
    }
}

fn default_true() -> bool {
    true
}

/// Effect of a matching step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Deny the request now.
    Intercept,
    /// Evaluate the next step.
    #[default]
    Continue,
    /// Admit the request now.
    Allow,
    /// Any action name this build does not know. Evaluated as `Continue`.
    #[serde(other)]
    Unknown,
}

/// Membership inversion for set-based conditions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SetMode {
    #[default]
    Include,
    Exclude,
}

/// Membership inversion for the IP condition.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IpListMode {
    #[default]
    Whitelist,
    Blacklist,
}

impl From<IpListMode> for SetMode {
    fn from(mode: IpListMode) -> Self {
        match mode {
            IpListMode::Whitelist => SetMode::Include,
            IpListMode::Blacklist => SetMode::Exclude,
        }
    }
}

/// How a pattern is applied to user-agent and path strings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    Regex,
    #[default]
    Contains,
}

/// How a query parameter value is compared.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamMode {
    #[default]
    Equals,
    Contains,
    Regex,
}

/// Condition-type-specific configuration of a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepCondition {
    Country {
        #[serde(default)]
        countries: Vec<String>,
        #[serde(default)]
        match_mode: SetMode,
    },
    Language {
        #[serde(default)]
        languages: Vec<String>,
        #[serde(default)]
        match_mode: SetMode,
    },
    /// Exact addresses or IPv4 CIDR blocks.
    Ip {
        #[serde(default)]
        ips: Vec<String>,
        #[serde(default)]
        match_mode: IpListMode,
    },
    UserAgent {
        pattern: String,
        #[serde(default)]
        match_mode: TextMode,
    },
    Path {
        pattern: String,
        #[serde(default)]
        match_mode: TextMode,
    },
    Bot {
        #[serde(default = "default_true")]
        match_bot: bool,
    },
    ParamsSearch {
        param_name: String,
        param_value: String,
        #[serde(default)]
        match_mode: ParamMode,
    },
    IpType {
        #[serde(default)]
        ip_types: Vec<String>,
        #[serde(default)]
        match_mode: SetMode,
    },
}

impl StepCondition {
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Country { .. } => StepType::Country,
            Self::Language { .. } => StepType::Language,
            Self::Ip { .. } => StepType::Ip,
            Self::UserAgent { .. } => StepType::UserAgent,
            Self::Path { .. } => StepType::Path,
            Self::Bot { .. } => StepType::Bot,
            Self::ParamsSearch { .. } => StepType::ParamsSearch,
            Self::IpType { .. } => StepType::IpType,
        }
    }
}

/// Discriminant-only view of [`StepCondition`], used in logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Country,
    Language,
    Ip,
    UserAgent,
    Path,
    Bot,
    ParamsSearch,
    IpType,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Country => "country",
            Self::Language => "language",
            Self::Ip => "ip",
            Self::UserAgent => "user_agent",
            Self::Path => "path",
            Self::Bot => "bot",
            Self::ParamsSearch => "params_search",
            Self::IpType => "ip_type",
        };
        f.write_str(name)
    }
}
