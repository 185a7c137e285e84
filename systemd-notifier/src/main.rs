use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use systemd_notifier::config::AppConfig;
use systemd_notifier::listener;
use systemd_notifier::logging::init_logging;
use systemd_notifier::monitor::Monitor;
use systemd_notifier::notification::NotificationCenter;
use tracing::{error, info};

/// Notifier for systemd unit status changes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "SYSTEMD_NOTIFIER_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    let _log_guard = init_logging(config.logging.filter.as_deref(), config.logging.dir.as_deref())?;
    info!(
        "systemd-notifier {} starting with {}",
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let hostname = config.resolve_hostname();
    let center = Arc::new(NotificationCenter::from_config(
        &config.notifiers,
        config.notifier_timeout(),
    ));
    let listener = listener::connect(config.listener, config.poll_interval()).await;

    let mut monitor = Monitor::new(hostname, listener, center);
    monitor.register_units(&config.units).await?;

    monitor.run(shutdown_signal()).await?;
    info!("systemd-notifier stopped");
    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
