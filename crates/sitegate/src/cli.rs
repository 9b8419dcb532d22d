use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sitegate", version, about = "Per-site admission rules for incoming requests")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "sitegate.yaml", global = true)]
    pub config: PathBuf,

    /// Path to the policy file (overrides config file setting)
    #[arg(short, long, global = true)]
    pub policy: Option<PathBuf>,

    /// Log level filter, e.g. `debug` or `rule_engine=trace` (overrides config file setting)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a single request and print the decision as JSON
    Check {
        /// Host the request is addressed to
        #[arg(long)]
        host: String,

        /// Request URI (path and query)
        #[arg(long, default_value = "/")]
        uri: String,

        /// Request header, repeatable
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,
    },

    /// Evaluate JSON-lines requests (`{host, uri, headers}`) and print one
    /// decision per line
    Batch {
        /// Input file; standard input when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Load the policy and print a summary of every site
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_with_headers() {
        let cli = Cli::parse_from([
            "sitegate",
            "--policy",
            "rules.yaml",
            "check",
            "--host",
            "shop.example.com",
            "-H",
            "User-Agent: curl/8.0",
            "--header",
            "x-forwarded-for: 203.0.113.7",
        ]);
        assert_eq!(cli.config, PathBuf::from("sitegate.yaml"));
        assert_eq!(cli.policy, Some(PathBuf::from("rules.yaml")));
        match cli.command {
            Command::Check { host, uri, headers } => {
                assert_eq!(host, "shop.example.com");
                assert_eq!(uri, "/");
                assert_eq!(headers.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sitegate", "validate", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Validate));
    }

    #[test]
    fn check_requires_host() {
        assert!(Cli::try_parse_from(["sitegate", "check"]).is_err());
    }
}
