use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use visitor_extract::ExtractorConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_policy_file")]
    pub policy_file: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_file: default_policy_file(),
            logging: LoggingConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Decision log file. Decisions are not recorded when unset.
    #[serde(default)]
    pub decision_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            decision_log_path: None,
        }
    }
}

fn default_policy_file() -> PathBuf {
    PathBuf::from("policy.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a YAML file.
///
/// Returns `None` when the file does not exist; the caller falls back to
/// defaults and reports it once logging is up.
pub fn load(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    parse(&contents)
        .map(Some)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

fn parse(yaml: &str) -> anyhow::Result<Config> {
    Ok(serde_yml::from_str(yaml)?)
}
