//! User-agent fragments that classify the client.
//!
//! Both catalogues are compiled into the
//! [`BotDetector`](crate::detector::BotDetector). Matching any entry of
//! [`BOT_PATTERNS`] flags the visitor as a bot; matching any entry of
//! [`MOBILE_PATTERNS`] flags it as a mobile device.

/// A single user-agent fragment.
pub struct AgentPattern {
    /// Short identifier used in logs.
    pub name: &'static str,
    /// Regex source, matched anywhere in the user-agent.
    pub pattern: &'static str,
}

/// Automated clients.
pub static BOT_PATTERNS: &[AgentPattern] = &[
    // ---- Self-declared crawlers ------------------------------------------
    AgentPattern {
        name: "bot",
        pattern: r"(?i)bot",
    },
    AgentPattern {
        name: "crawler",
        pattern: r"(?i)crawler",
    },
    AgentPattern {
        name: "spider",
        pattern: r"(?i)spider",
    },
    AgentPattern {
        name: "scraper",
        pattern: r"(?i)scraper",
    },
    // ---- Command-line and scripting clients -------------------------------
    AgentPattern {
        name: "curl",
        pattern: r"(?i)curl",
    },
    AgentPattern {
        name: "wget",
        pattern: r"(?i)wget",
    },
    AgentPattern {
        name: "python",
        pattern: r"(?i)python",
    },
    // ---- API tooling ------------------------------------------------------
    AgentPattern {
        name: "postman",
        pattern: r"(?i)postman",
    },
    AgentPattern {
        name: "insomnia",
        pattern: r"(?i)insomnia",
    },
    AgentPattern {
        name: "httpie",
        pattern: r"(?i)httpie",
    },
];

/// Phones and tablets.
pub static MOBILE_PATTERNS: &[AgentPattern] = &[
    AgentPattern {
        name: "mobile",
        pattern: r"(?i)mobile",
    },
    AgentPattern {
        name: "android",
        pattern: r"(?i)android",
    },
    AgentPattern {
        name: "iphone",
        pattern: r"(?i)iphone",
    },
    AgentPattern {
        name: "ipad",
        pattern: r"(?i)ipad",
    },
    AgentPattern {
        name: "ipod",
        pattern: r"(?i)ipod",
    },
    AgentPattern {
        name: "blackberry",
        pattern: r"(?i)blackberry",
    },
    AgentPattern {
        name: "windows_phone",
        pattern: r"(?i)windows phone",
    },
];
