mod batch;
mod cli;
mod config;
mod gate;
mod report;
mod request;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use decision_log::{DecisionEntry, DecisionEvent, DecisionSink};
use rule_engine::PolicyStore;
use visitor_extract::VisitorExtractor;

use crate::cli::{Cli, Command};
use crate::gate::Gate;
use crate::request::RequestSpec;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides. A missing file is reported
    //    after the subscriber is installed.
    let loaded = config::load(&cli.config)?;
    let config_missing = loaded.is_none();
    let mut cfg = loaded.unwrap_or_default();

    if let Some(ref policy) = cli.policy {
        cfg.policy_file = policy.clone();
    }
    if let Some(ref level) = cli.log_level {
        cfg.logging.level = level.clone();
    }

    // 3. Init tracing-subscriber with JSON format on stderr; stdout carries
    //    decisions only.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if config_missing {
        warn!(
            path = %cli.config.display(),
            "configuration file not found; using defaults"
        );
    }

    info!(
        config_file = %cli.config.display(),
        policy_file = %cfg.policy_file.display(),
        "sitegate starting"
    );

    // 4. Load policy.
    let policy = rule_engine::loader::load_policy(&cfg.policy_file)
        .context("failed to load policy file")?;
    let store = Arc::new(PolicyStore::new(policy));

    info!(
        policy_file = %cfg.policy_file.display(),
        rules = store.rule_count(),
        sites = store.site_count(),
        "policy loaded"
    );

    if matches!(cli.command, Command::Validate) {
        print!("{}", report::site_summary(&store));
        return Ok(());
    }

    // 5. Visitor extraction.
    let extractor = VisitorExtractor::new(&cfg.extractor)
        .context("invalid extractor configuration")?;

    // 6. Decision log, when configured.
    let (log, log_handle) = match &cfg.logging.decision_log_path {
        Some(path) => {
            let (sink, handle) = DecisionSink::start(path)
                .await
                .context("failed to start decision log")?;
            (Some(sink), Some(handle))
        }
        None => (None, None),
    };

    if let Some(log) = &log {
        log.record(DecisionEntry::new(
            DecisionEvent::ProcessStarted,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "config_file": cli.config.display().to_string(),
            }),
        ))
        .await;
        log.record(DecisionEntry::new(
            DecisionEvent::PolicyLoaded,
            serde_json::json!({
                "policy_file": cfg.policy_file.display().to_string(),
                "rules": store.rule_count(),
                "sites": store.site_count(),
            }),
        ))
        .await;
    }

    // 7. Run the command.
    let gate = Gate::new(store, extractor, log.clone());

    let result = match cli.command {
        Command::Check { host, uri, headers } => run_check(&gate, host, uri, &headers).await,
        Command::Batch { input } => run_batch(&gate, input.as_deref()).await,
        Command::Validate => Ok(()),
    };

    // 8. Drain the decision log.
    if let Some(log) = log {
        log.record(DecisionEntry::new(
            DecisionEvent::ProcessStopped,
            serde_json::json!({ "ok": result.is_ok() }),
        ))
        .await;
    }
    drop(gate);
    if let Some(handle) = log_handle {
        if let Err(err) = handle.await {
            warn!(%err, "decision log writer did not shut down cleanly");
        }
    }

    info!("sitegate finished");
    result
}

async fn run_check(gate: &Gate, host: String, uri: String, headers: &[String]) -> Result<()> {
    let request = RequestSpec::from_args(host, uri, headers)?;
    let outcome = gate.check(&request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_batch(gate: &Gate, input: Option<&Path>) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin> = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open batch input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let stats = batch::run(gate, reader, tokio::io::stdout()).await?;
    info!(
        allowed = stats.allowed,
        denied = stats.denied,
        errors = stats.errors,
        "batch complete"
    );
    Ok(())
}
