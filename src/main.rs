use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use potluck_keeper::api::{create_api_router, ApiState};
use potluck_keeper::chain::ContractClient;
use potluck_keeper::config::{KeeperConfig, Tuning};
use potluck_keeper::error::ScanError;
use potluck_keeper::notify::NotificationClient;
use potluck_keeper::ScanOrchestrator;

#[derive(Parser)]
#[clap(rename_all = "kebab-case", author, version)]
struct Args {
    #[clap(env = "POTLUCK_LISTEN_ADDRESS", long, default_value = "0.0.0.0:8080")]
    listen_address: SocketAddr,
    /// Optional TOML file with scan, cache, dispatch and notify tuning
    #[clap(env = "POTLUCK_CONFIG", long)]
    config: Option<PathBuf>,
    /// Also run the payout scan on this interval, next to the HTTP trigger
    #[clap(env = "POTLUCK_SCAN_INTERVAL_SECS", long)]
    scan_interval_secs: Option<u64>,
}

fn init_tracing() -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::daily("logs", "potluck-keeper.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // The writer must outlive main
    std::mem::forget(guard);

    Ok(())
}

/// Periodic scans run through the same orchestrator as the HTTP trigger, so the job lock
/// keeps the two from overlapping.
fn spawn_scan_loop(
    orchestrator: Arc<ScanOrchestrator>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_secs = every.as_secs(), "⏱️  Scheduled payout scans enabled");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match orchestrator.run_now().await {
                        Ok(result) if result.success => {}
                        Ok(result) => warn!(
                            error = result.error_message.as_deref().unwrap_or_default(),
                            "Scheduled payout scan finished with a dispatch failure"
                        ),
                        Err(ScanError::AlreadyRunning) => {
                            info!("Skipping scheduled scan, another scan is running")
                        }
                        Err(e) => error!(error = %e, "Scheduled payout scan failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("🛑 Scheduled payout scans stopping");
                    break;
                }
            }
        }
    })
}

#[instrument(skip_all)]
async fn build_orchestrator(config: &KeeperConfig, tuning: &Tuning) -> Result<ScanOrchestrator> {
    let contract = Arc::new(
        ContractClient::new(config, tuning.dispatch.confirmations)
            .context("Failed to create registry client")?,
    );
    contract
        .verify_deployment(config.network.chain_id())
        .await
        .context("Registry contract check failed")?;
    info!(
        network = %config.network,
        testnet = config.network.is_testnet(),
        contract = ?config.contract_address,
        "🔗 Connected to registry contract"
    );

    let notifier = Arc::new(
        NotificationClient::new(config, tuning).context("Failed to create notification client")?,
    );

    Ok(ScanOrchestrator::new(
        contract.clone(),
        contract,
        notifier,
        config.app_url.clone(),
        tuning,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    info!("🍲 Potluck Keeper - payout scanner");

    let config = KeeperConfig::from_env().context("Invalid environment configuration")?;
    let tuning = match &args.config {
        Some(path) => Tuning::load_from_file(path)
            .with_context(|| format!("Failed to load tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    info!(?config, ?tuning, "Configuration loaded");

    let orchestrator = Arc::new(build_orchestrator(&config, &tuning).await?);
    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let scan_loop = args
        .scan_interval_secs
        .filter(|secs| *secs > 0)
        .map(|secs| {
            spawn_scan_loop(
                orchestrator.clone(),
                Duration::from_secs(secs),
                shutdown_tx.subscribe(),
            )
        });

    let router = create_api_router(ApiState::new(orchestrator, config.cron_secret.clone()));
    let listener = tokio::net::TcpListener::bind(args.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_address))?;
    info!(address = %args.listen_address, "🚀 Payout trigger listening");

    let mut server_shutdown = shutdown_tx.subscribe();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = server_shutdown.recv().await;
    });
    let server = tokio::spawn(async move { server.await });

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    let _ = shutdown_tx.send(());

    match server.await {
        Ok(Ok(())) => info!("✅ HTTP server shut down cleanly"),
        Ok(Err(e)) => warn!("⚠️  HTTP server error during shutdown: {}", e),
        Err(e) => error!("❌ HTTP server task failed: {}", e),
    }
    if let Some(task) = scan_loop {
        if let Err(e) = task.await {
            error!("❌ Scan loop task failed: {}", e);
        }
    }

    info!("👋 Potluck Keeper shutdown complete");
    Ok(())
}
