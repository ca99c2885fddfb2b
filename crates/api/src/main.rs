//! Straddle Premium Monitor - Main Entry Point

use alerting::{AlertMonitor, BellNotifier, CompositeNotifier, LogNotifier};
use anyhow::Context;
use api::{create_router, init_logging, install_metrics, AppState, Settings};
use clap::Parser;
use poll_scheduler::PollScheduler;
use quote_protocol::{MockQuoteSource, QuoteSource, ShoonyaClient};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{SessionLog, XlsxExporter};
use straddle::StraddleFetcher;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "straddle-monitor")]
#[command(about = "Watch the ATM straddle premium and alert on spikes", version)]
struct Cli {
    /// Settings file (TOML, optional)
    #[arg(short, long, default_value = "config/monitor.toml")]
    config: PathBuf,

    /// Use the mock quote source instead of the broker
    #[arg(long)]
    mock: bool,

    /// Dashboard listen address
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if cli.mock {
        settings.broker.mock = true;
    }
    if let Some(addr) = cli.addr {
        settings.server.addr = addr;
    }

    init_logging(&settings.logging).context("installing tracing subscriber")?;

    info!("=== Straddle Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Alerting at +{}% over the last {} logs",
        settings.monitor.percentage_increase, settings.monitor.window_size
    );

    let metrics = match install_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let source = connect(&settings).await?;

    let fetcher = StraddleFetcher::load(settings.instrument.clone())
        .await
        .context("loading instrument settings")?;
    let monitor = AlertMonitor::new(settings.monitor.monitor_config())?;
    let notifier = CompositeNotifier::new()
        .with(LogNotifier)
        .with(BellNotifier::new(settings.monitor.sound_on_alert));
    let mut scheduler = PollScheduler::new(settings.poll.clone(), fetcher, monitor, Box::new(notifier))?;

    let session = Arc::new(SessionLog::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = {
        let session = session.clone();
        let source = source.clone();
        tokio::spawn(async move { scheduler.run(source.as_ref(), &session, shutdown_rx).await })
    };

    let state = AppState::new(session.clone(), &settings).with_metrics(metrics);
    let app = create_router(Arc::new(RwLock::new(state)));

    let listener = tokio::net::TcpListener::bind(&settings.server.addr)
        .await
        .with_context(|| format!("binding {}", settings.server.addr))?;
    info!("Dashboard listening on {}", settings.server.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    // The poller also stops if the receiver sees the sender dropped
    let _ = shutdown_tx.send(true);
    let stats = poller.await.context("poll task failed")?;
    info!("Session: {} readings, {} alerts", stats.readings, stats.alerts);

    if let Some(path) = &settings.export.readings_path {
        let readings = session.all_readings()?;
        if readings.is_empty() {
            info!("No readings to export");
        } else {
            XlsxExporter::new(settings.instrument.utc_offset_minutes)
                .export(path, &readings)
                .with_context(|| format!("exporting readings to {}", path.display()))?;
        }
    }

    Ok(())
}

/// Build the configured quote source, logging in to the broker if needed
async fn connect(settings: &Settings) -> anyhow::Result<Arc<dyn QuoteSource>> {
    if settings.broker.mock {
        info!("Using mock quotes");
        return Ok(Arc::new(MockQuoteSource::nifty()));
    }

    let client = ShoonyaClient::new(&settings.broker.host, settings.broker.timeout())?;
    client
        .login(&settings.broker.credentials)
        .await
        .context("broker login")?;
    Ok(Arc::new(client))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
    }
}
