//! Bot and mobile classification over the user-agent string.

use regex::RegexSet;

use crate::patterns::{BOT_PATTERNS, MOBILE_PATTERNS};

/// Errors that can occur while building a [`BotDetector`].
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to compile user-agent pattern: {0}")]
    RegexCompile(#[from] regex::Error),
}

/// Compiled [`RegexSet`]s over the bot and mobile pattern catalogues.
#[derive(Debug, Clone)]
pub struct BotDetector {
    bots: RegexSet,
    mobile: RegexSet,
}

impl BotDetector {
    /// Compile the built-in [`BOT_PATTERNS`] and [`MOBILE_PATTERNS`].
    pub fn new() -> Result<Self, DetectorError> {
        Self::with_patterns(
            BOT_PATTERNS.iter().map(|p| p.pattern),
            MOBILE_PATTERNS.iter().map(|p| p.pattern),
        )
    }

    /// Compile arbitrary bot and mobile pattern lists.
    pub fn with_patterns<B, M>(bots: B, mobile: M) -> Result<Self, DetectorError>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Ok(Self {
            bots: RegexSet::new(bots)?,
            mobile: RegexSet::new(mobile)?,
        })
    }

    /// `true` when any bot pattern matches. A missing user-agent is not a bot.
    pub fn is_bot(&self, user_agent: Option<&str>) -> bool {
        user_agent.is_some_and(|ua| self.bots.is_match(ua))
    }

    /// `true` when any mobile pattern matches. A missing user-agent is not
    /// mobile.
    pub fn is_mobile(&self, user_agent: Option<&str>) -> bool {
        user_agent.is_some_and(|ua| self.mobile.is_match(ua))
    }

    /// Names of the built-in bot patterns that match `user_agent`.
    ///
    /// Only meaningful for a detector built with [`BotDetector::new`].
    pub fn matched_names(&self, user_agent: &str) -> Vec<&'static str> {
        self.bots
            .matches(user_agent)
            .into_iter()
            .filter_map(|idx| BOT_PATTERNS.get(idx).map(|p| p.name))
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.bots.len() + self.mobile.len()
    }
}
