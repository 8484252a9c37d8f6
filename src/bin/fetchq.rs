//! fetchq CLI: run a list of URLs through one single-flight queue.

use clap::{Parser, Subcommand};
use fetchq::telemetry::{TelemetryConfig, init_telemetry};
use fetchq::{Config, FetchQueue, HttpClient, Locale, cancel_after};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fetchq", about = "Single-flight sequential HTTP request queue")]
struct Cli {
    /// TOML config file (otherwise read from the environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// GET each URL in order and print one JSON line per outcome
    Get {
        /// URLs to fetch
        #[arg(required = true)]
        urls: Vec<String>,
        /// Attempts before an item is abandoned
        #[arg(long)]
        retry_bound: Option<u32>,
        /// Cancel each request this many milliseconds after submission
        #[arg(long)]
        cancel_after_ms: Option<u64>,
        /// Language of fault messages (en, es)
        #[arg(long)]
        locale: Option<Locale>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "fetchq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Get {
            urls,
            retry_bound,
            cancel_after_ms,
            locale,
        } => {
            if let Some(bound) = retry_bound {
                anyhow::ensure!(bound >= 1, "--retry-bound must be at least 1");
                config.retry_bound = bound;
            }
            if let Some(locale) = locale {
                config.locale = locale;
            }
            cmd_get(&config, urls, cancel_after_ms.map(Duration::from_millis)).await
        }
    }
}

async fn cmd_get(
    config: &Config,
    urls: Vec<String>,
    cancel_delay: Option<Duration>,
) -> anyhow::Result<()> {
    let http = HttpClient::new(config)?;
    let queue = FetchQueue::new(config);

    let mut completions = Vec::with_capacity(urls.len());
    for url in urls {
        let cancel = cancel_delay.map(cancel_after);
        let completion = queue.enqueue(http.factory(url.clone(), cancel))?;
        completions.push((url, completion));
    }

    let mut failures = 0usize;
    for (url, completion) in completions {
        let seq = completion.seq();
        let line = match completion.await {
            Ok(payload) => json!({ "item": seq.0, "url": url, "ok": true, "payload": payload }),
            Err(fault) => {
                failures += 1;
                json!({ "item": seq.0, "url": url, "ok": false, "fault": fault })
            }
        };
        println!("{line}");
    }

    queue.close().await?;

    if failures > 0 {
        anyhow::bail!("{failures} request(s) failed");
    }
    Ok(())
}
