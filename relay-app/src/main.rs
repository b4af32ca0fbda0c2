use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use relay_common::observability::{LogConfig, LogFormat, init_logging};
use relay_config::{RelayConfig, RelayConfigLoader};
use relay_pipeline::PostOutcome;
use wiring::{accounts_to_run, build_pipeline};
mod wiring;

#[derive(Debug, Parser)]
#[command(name = "relay", version, about = "Translate recent posts and publish them to a blog")]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, env = "RELAY_CONFIG", default_value = "relay.yaml")]
    config: PathBuf,

    /// Account to process; repeat for several. Overrides `accounts` in the config.
    #[arg(short = 'a', long = "account")]
    accounts: Vec<String>,

    /// Posts to fetch per account. Overrides `fetch.limit`.
    #[arg(short, long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file)
    let mut cfg: RelayConfig = RelayConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(limit) = cli.limit {
        anyhow::ensure!(limit > 0, "--limit must be at least 1");
        cfg.fetch.limit = limit;
    }

    let log_path = init_logging(LogConfig {
        app_name: "relay",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: LogFormat::from_name(&cfg.logging.format),
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(event = "app.start", log = %log_path.display(), config = %cli.config.display());

    let accounts = accounts_to_run(&cli.accounts, &cfg);
    if accounts.is_empty() {
        tracing::warn!(event = "app.no_accounts");
        return Ok(());
    }

    let mut pipeline = build_pipeline(&cfg).await?;
    let report = pipeline.run(&accounts).await;

    for account in &report.accounts {
        match &account.error {
            Some(err) => tracing::warn!(event = "app.account.summary", account = %account.account, error = %err),
            None => tracing::info!(
                event = "app.account.summary",
                account = %account.account,
                endpoint = account.endpoint.as_deref().unwrap_or("-"),
                recorded = account.count(PostOutcome::Recorded),
                skipped = account.count(PostOutcome::SkippedDuplicate),
                abandoned = account.count(PostOutcome::AbandonedTranslation),
                failed = account.count(PostOutcome::FailedPublish)
            ),
        }
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(err) = &report.flush_error {
        tracing::error!(event = "app.flush.failed", error = %err);
    }
    Ok(())
}
