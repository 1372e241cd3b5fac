//! Order Router Binary
//!
//! Tails the inbound order journal, resolves every command against the
//! configured venue through one rate-limited dispatch lane, and appends the
//! results to the outbound journal.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin order-router
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_ROUTER_CONFIG`: config file path (default: `config.yaml`)
//! - `RUST_LOG`: log filter (default: `observability.logging.level`)
//! - `OTEL_ENABLED`: set to `false` to disable OTLP export
//! - Anything referenced as `${VAR}` in the config file, typically
//!   `BINANCE_API_KEY` and `BINANCE_API_SECRET`

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_router::application::ports::VenuePort;
use order_router::application::services::OrderDispatcher;
use order_router::application::use_cases::{OrderActionResolver, ProcessOrdersUseCase};
use order_router::config::{Config, ServerConfig, VenueConfig, VenueMode, load_config};
use order_router::infrastructure::http::{AppState, create_router};
use order_router::infrastructure::queue::{JournalOrderSource, JournalResultEmitter};
use order_router::infrastructure::venue::{BinanceVenueAdapter, PaperVenue};
use order_router::observability::{MetricsConfig, init_metrics};
use order_router::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout for the HTTP server.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let config = load_config(None).context("loading configuration")?;
    let _telemetry = init_telemetry(&config.observability.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        venue_mode = %config.venue.mode,
        pause_ms = config.dispatcher.pause_ms,
        max_in_flight = config.resolver.max_in_flight,
        "Starting order router"
    );

    start_metrics(&config);

    let venue = create_venue(&config.venue)?;
    check_venue(venue.as_ref()).await;

    let dispatcher = OrderDispatcher::start(config.dispatcher.to_settings())
        .context("starting order dispatcher")?;
    let resolver = OrderActionResolver::new(Arc::clone(&venue), dispatcher.clone());

    let source = JournalOrderSource::open(&config.queue.inbound_path, &config.queue.offset_path)
        .await
        .context("opening inbound journal")?
        .with_poll_interval(config.queue.poll_interval());
    let emitter = JournalResultEmitter::open(&config.queue.outbound_path)
        .await
        .context("opening outbound journal")?;
    let pipeline = ProcessOrdersUseCase::new(
        resolver.clone(),
        Arc::new(source),
        Arc::new(emitter),
        config.resolver.max_in_flight,
    );

    let shutdown = CancellationToken::new();
    let http_handle = start_http_server(&config.server, resolver, shutdown.clone()).await?;
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let report = pipeline.run(shutdown.clone()).await;

    // The pipeline may also stop on a queue error.
    shutdown.cancel();
    dispatcher.shutdown().await;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, http_handle).await.is_err() {
        tracing::warn!("HTTP server did not stop in time");
    }

    let report = report.context("order pipeline failed")?;
    tracing::info!(
        processed = report.processed,
        committed = report.committed,
        emit_failures = report.emit_failures,
        dispatcher = ?dispatcher.stats(),
        "Order router stopped"
    );

    Ok(())
}

fn start_metrics(config: &Config) {
    if !config.observability.metrics.enabled {
        return;
    }
    let ip = config
        .server
        .bind_address
        .parse::<IpAddr>()
        .unwrap_or(IpAddr::from([0, 0, 0, 0]));
    let addr = SocketAddr::new(ip, config.server.metrics_port);
    if let Err(e) = init_metrics(&MetricsConfig::with_addr(addr)) {
        tracing::warn!(error = %e, "Metrics exporter not started");
    }
}

fn create_venue(config: &VenueConfig) -> anyhow::Result<Arc<dyn VenuePort>> {
    match config.mode() {
        Some(VenueMode::Paper) => {
            tracing::info!("Using paper venue");
            Ok(Arc::new(PaperVenue::new()))
        }
        Some(VenueMode::Testnet | VenueMode::Production) => {
            let binance = config.to_binance_config()?;
            tracing::info!(
                environment = %binance.environment,
                base_url = %binance.base_url(),
                "Using Binance venue"
            );
            Ok(Arc::new(BinanceVenueAdapter::new(binance)?))
        }
        None => anyhow::bail!("unknown venue mode {:?}", config.mode),
    }
}

/// Report venue reachability and clock skew. Never fatal.
async fn check_venue(venue: &dyn VenuePort) {
    if let Err(e) = venue.ping().await {
        tracing::warn!(venue = venue.name(), error = %e, "Venue ping failed");
        return;
    }
    match venue.server_time().await {
        Ok(time) => {
            let skew_ms = (time - chrono::Utc::now()).num_milliseconds();
            tracing::info!(venue = venue.name(), skew_ms, "Venue reachable");
        }
        Err(e) => {
            tracing::warn!(venue = venue.name(), error = %e, "Venue server time unavailable");
        }
    }
}

async fn start_http_server(
    config: &ServerConfig,
    resolver: OrderActionResolver<dyn VenuePort>,
    shutdown: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let addr = format!("{}:{}", config.bind_address, config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding HTTP listener on {addr}"))?;

    let app = create_router(AppState {
        resolver: Arc::new(resolver),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    tracing::info!(%addr, "HTTP server starting");

    Ok(tokio::spawn(async move {
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(e) = server.await {
            tracing::error!("HTTP server error: {e}");
        }
    }))
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown.cancel();
}
