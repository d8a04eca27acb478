//! Cross-chain contract call watcher
//!
//! Sends one bridged `increment` call from the source chain to the target
//! contract on the destination chain, prints progress while it travels, and
//! exits once the bridge's indexer reports it executed.
//!
//! Exits non-zero if the run deadline passes or the process is interrupted
//! before that.

use eyre::WrapErr;
use tracing::info;

use xcall_watcher::bridge::EvmBridgeSdk;
use xcall_watcher::chain::{EvmDestination, EvmSource};
use xcall_watcher::constants::{
    BRIDGE_ADDRESS, FEE_HANDLER_ROUTER_ADDRESS, SOURCE_DOMAIN_ID, TARGET_CONTRACT_ADDRESS,
};
use xcall_watcher::progress::{ProgressPrinter, ProgressSender};
use xcall_watcher::shutdown::StopReason;
use xcall_watcher::status::IndexerClient;
use xcall_watcher::{Config, Orchestrator, RunSettings};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    info!("Starting cross-chain call watcher");

    let config = Config::load()?;
    info!(
        source_rpc = %config.source_rpc_url,
        destination_rpc = %config.destination_rpc_url,
        status_api = %config.status_api_url,
        "Configuration loaded"
    );

    let request = config.transfer_request()?;

    let source = EvmSource::new(&config.source_rpc_url, config.signer()?)?;
    let sdk = EvmBridgeSdk::new(
        source.provider().clone(),
        BRIDGE_ADDRESS,
        FEE_HANDLER_ROUTER_ADDRESS,
        SOURCE_DOMAIN_ID,
    );
    let destination = EvmDestination::new(&config.destination_rpc_url, TARGET_CONTRACT_ADDRESS)?;
    let status_api = IndexerClient::new(&config.status_api_url)
        .wrap_err("Failed to build status API client")?;

    let (progress, progress_rx) = ProgressSender::channel();
    let printer = ProgressPrinter::spawn(progress_rx);

    let orchestrator = Orchestrator::new(
        sdk,
        source,
        destination,
        status_api,
        RunSettings::from(&config),
        progress,
    );

    // Handle signals
    let shutdown = orchestrator.shutdown_handle();
    let signals = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger(StopReason::Interrupted);
    });

    let result = orchestrator.run(&request).await;

    signals.abort();
    drop(orchestrator);
    printer.join().await;

    let report = result?;
    info!(
        destination_tx = ?report.status.execution_tx_hash(),
        final_value = ?report.summary.and_then(|s| s.final_value),
        "Cross-chain call watcher finished"
    );
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xcall_watcher=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
