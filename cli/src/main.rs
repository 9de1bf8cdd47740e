mod commands;

use anyhow::{Context, Result};
use billing_client::{BillingClient, HttpBillingClient, MockClient, RetryPolicy, RetryingClient};
use clap::{Parser, Subcommand};
use config::AppConfig;
use rcly_core::{Notification, NotificationDispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Billing-provider webhook decoder and outbound client
#[derive(Parser, Debug)]
#[command(name = "rcly")]
#[command(about = "Decode billing webhook notifications and query the provider")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode notification payloads and run them through the dispatcher
    Dispatch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print each decoded notification as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Dispatch every *.xml payload under a directory and print a summary
    Replay { dir: PathBuf },
    /// Fetch a transaction from the provider, retrying transient failures
    Transaction { id: String },
    /// Show or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    SetProvider { kind: String },
    SetBaseUrl { url: String },
    SetApiKey {
        #[arg(env = "RCLY_API_KEY", hide_env_values = true)]
        key: String,
    },
    ClearApiKey,
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn retry_policy(cfg: &AppConfig) -> RetryPolicy {
    RetryPolicy::new(
        RetryPolicy::default().name,
        cfg.retry.max_attempts,
        Duration::from_millis(cfg.retry.min_delay_ms),
        Duration::from_millis(cfg.retry.max_delay_ms),
    )
}

fn create_billing_client(cfg: &AppConfig) -> Result<Arc<dyn BillingClient>> {
    let inner: Arc<dyn BillingClient> = match cfg.provider.kind.as_str() {
        "http" => {
            let base_url = cfg
                .provider
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("provider base_url not configured"))?;
            let api_key = config::api_key();
            if api_key.is_none() {
                tracing::warn!("no API key in {} or keychain", config::API_KEY_ENV);
            }
            tracing::info!(%base_url, "using HTTP billing client");
            HttpBillingClient::new(base_url, api_key)?
        }
        _ => {
            tracing::info!("using mock billing client");
            MockClient::new()
        }
    };
    Ok(RetryingClient::new(inner, retry_policy(cfg)))
}

fn print_json(notification: &Notification) {
    match serde_json::to_string(notification) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize notification"),
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Dispatch { files, json } => {
            let dispatcher = if json {
                NotificationDispatcher::new().on_all(print_json)
            } else {
                NotificationDispatcher::new()
            };
            let mut failed = 0usize;
            for path in &files {
                match commands::dispatch_file(&dispatcher, path)? {
                    commands::Outcome::Failed { .. } => failed += 1,
                    outcome => tracing::debug!(path = %path.display(), ?outcome, "dispatched"),
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} of {} payloads could not be decoded", files.len());
            }
        }
        Command::Replay { dir } => {
            let summary = commands::replay_dir(&NotificationDispatcher::new(), &dir)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Transaction { id } => {
            let cfg = config::load()?;
            cfg.validate()?;
            let client = create_billing_client(&cfg)?;
            let transaction = client
                .get_transaction(&id)
                .await
                .with_context(|| format!("Failed to fetch transaction {id}"))?;
            println!("{}", serde_json::to_string_pretty(&transaction)?);
        }
        Command::Config { action } => config_command(action)?,
    }
    Ok(())
}

fn config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load()?;
            println!("# {}", config::config_path()?.display());
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::SetProvider { kind } => {
            if !matches!(kind.as_str(), "mock" | "http") {
                anyhow::bail!("unknown provider kind {kind:?} (expected \"mock\" or \"http\")");
            }
            let mut cfg = config::load()?;
            cfg.provider.kind = kind;
            config::store(&cfg)?;
        }
        ConfigAction::SetBaseUrl { url } => {
            let mut cfg = config::load()?;
            cfg.provider.base_url = Some(url);
            cfg.validate()?;
            config::store(&cfg)?;
        }
        ConfigAction::SetApiKey { key } => {
            config::store_secret(config::API_KEY_SECRET, &key)?;
            tracing::info!("API key stored in keychain");
        }
        ConfigAction::ClearApiKey => {
            config::delete_secret(config::API_KEY_SECRET)?;
            tracing::info!("API key removed from keychain");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    run(Args::parse()).await
}
