use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use clap::Parser;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::json;

use retry_slot::config::loader::load_config;
use retry_slot::observability::{logging, metrics};
use retry_slot::{RetryingClient, RetrySlot, RetrySlotConfig};

#[derive(Parser)]
#[command(name = "retry-probe")]
#[command(about = "Issue an HTTP request through the retry decision slot", long_about = None)]
struct Cli {
    /// Target URL.
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial bearer token.
    #[arg(short, long)]
    token: Option<String>,

    /// Endpoint POSTed to on 401; a 2xx response body becomes the new token.
    #[arg(long)]
    auth_url: Option<String>,

    /// Overrides the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    metrics_address: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RetrySlotConfig::default(),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.observability.log_level);
    logging::init_logging(level);

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let method: Method = cli.method.to_ascii_uppercase().parse()?;
    let token = Arc::new(RwLock::new(cli.token.clone()));
    let authorizations = Arc::new(AtomicU32::new(0));

    let mut retry = config.retry.clone();
    if let Some(auth_url) = cli.auth_url.clone() {
        let auth_client = reqwest::Client::new();
        let token = token.clone();
        let counter = authorizations.clone();

        retry = retry
            .with_resolve_unauthorized(move || {
                let auth_client = auth_client.clone();
                let auth_url = auth_url.clone();
                let token = token.clone();
                async move {
                    let response = auth_client.post(&auth_url).send().await?.error_for_status()?;
                    let fresh = response.text().await?;
                    if let Ok(mut slot) = token.write() {
                        *slot = Some(fresh.trim().to_string());
                    }
                    Ok::<_, reqwest::Error>(true)
                }
            })
            .with_on_authorized(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
    }

    let client = RetryingClient::new(RetrySlot::try_new(retry)?, &config.client)?;

    let result = client
        .execute(method.clone(), &cli.url, |builder| {
            let current = token.read().ok().and_then(|t| t.clone());
            match current {
                Some(t) => builder.header(AUTHORIZATION, format!("Bearer {}", t)),
                None => builder,
            }
        })
        .await;

    let summary = match &result {
        Ok(response) => json!({
            "url": cli.url,
            "method": method.as_str(),
            "outcome": "success",
            "status": response.status().as_u16(),
            "authorizations": authorizations.load(Ordering::Relaxed),
        }),
        Err(e) => json!({
            "url": cli.url,
            "method": method.as_str(),
            "outcome": "failed",
            "error": e.to_string(),
            "attempts": e.attempts(),
            "authorizations": authorizations.load(Ordering::Relaxed),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
