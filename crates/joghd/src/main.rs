use clap::Parser;
use joghd_alerter::{AlertDispatcher, TelegramSink};
use joghd_checker::{Checker, HttpProbeExecutor};
use joghd_core::{Config, RunMode, Target};
use joghd_scheduler::{run_once, Scheduler};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "joghd", version, about = "HTTP health-check and alerting daemon")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "JOGHD_CONFIG", default_value = "config.toml")]
    config: PathBuf,
    /// Run mode, overrides app.mode from the config
    #[arg(long)]
    mode: Option<RunMode>,
}

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(Some(cli.config.as_path()))?;
    if let Some(mode) = cli.mode {
        config.app.mode = mode;
    }

    // RUST_LOG wins over app.log_level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .init();

    let targets: Vec<Arc<Target>> = config.targets().into_iter().map(Arc::new).collect();
    if targets.is_empty() {
        return Err(miette::miette!(
            help = "Add at least one [[targets]] entry to the config",
            "No targets configured"
        ));
    }

    info!(
        "Joghd {} starting in {} mode with {} targets",
        env!("CARGO_PKG_VERSION"),
        config.app.mode,
        targets.len()
    );

    let executor = Arc::new(HttpProbeExecutor::new(&config.http)?);
    let checker =
        Checker::new(executor, config.retry.clone()).with_concurrency(config.app.concurrency);
    let dispatcher = build_dispatcher(&config)?;

    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    match config.app.mode {
        RunMode::Oneshot => {
            let summary = run_once(&checker, &dispatcher, &targets, &token).await;
            if summary.any_failed() {
                return Ok(ExitCode::FAILURE);
            }
        }
        RunMode::Continuous => {
            let scheduler = Scheduler::new(Arc::new(checker), dispatcher, targets);
            scheduler.run(token).await;
        }
    }

    info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

/// Register every enabled alert sink
fn build_dispatcher(config: &Config) -> miette::Result<AlertDispatcher> {
    let mut dispatcher = AlertDispatcher::new();

    let telegram = &config.alerters.telegram;
    if telegram.enabled {
        dispatcher.add(Arc::new(TelegramSink::new(telegram)?));
        info!("Telegram alerter enabled");
    }

    if dispatcher.is_empty() {
        info!("No alerters enabled, failures will only be logged");
    }

    Ok(dispatcher)
}

/// Cancel `token` on Ctrl-C or SIGTERM
async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl-C, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down...");
    }

    token.cancel();
}
