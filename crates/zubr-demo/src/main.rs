/*
[INPUT]:  CLI arguments, YAML configuration file, environment credentials, OS shutdown signals
[OUTPUT]: A running Zubr session logging market data until shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zubr_demo::{DemoConfig, register_feeds};
use zubr_sdk::ZubrClient;

#[derive(Parser, Debug)]
#[command(name = "zubr-demo", version, about = "Zubr exchange WebSocket demo")]
struct Cli {
    /// YAML config; defaults are used when omitted
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(
        config_path = ?args.config_path,
        dry_run = args.dry_run,
        "starting zubr-demo"
    );

    let config = load_config(args.config_path.as_ref())?.apply_env();
    let client_config = config.client_config()?;
    info!(
        api_url = %config.api_url,
        authenticated = config.has_credentials(),
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let client = ZubrClient::new(client_config).context("create client")?;
    spawn_shutdown_listener(client.clone());

    let queued = register_feeds(&client, &config)
        .await
        .context("register feeds")?;
    info!(queued, "feeds registered");

    client.run().await.context("zubr session")?;
    info!("shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<DemoConfig> {
    let Some(path) = path else {
        return Ok(DemoConfig::default());
    };
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    DemoConfig::from_file(path_str).context("load config")
}

/// Stop the session on SIGINT or SIGTERM, logging where the connection stood
fn spawn_shutdown_listener(client: ZubrClient) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        let state = client.state().await;
        info!(
            signal,
            state = ?state,
            "shutdown signal received; closing session"
        );
        client.shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = ctrl_c() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        },
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable; listening for SIGINT only");
            ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await;
    "SIGINT"
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
}
