//! Application entry point for the `thermolog` service.
//!
//! This binary periodically fuses two weather stations and one thermostat into
//! a single measurement row. Startup covers:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the HTTP client, token provider and log sink
//! - Creating the PostgreSQL schema when the database sink is selected
//! - Spawning the measurement scheduler
//! - Binding the Axum HTTP server for `/health` and `/measure`
//!
//! # Environment Variables
//! See [`config::load_from_env`] for the full list. Logging is controlled by
//! `RUST_LOG`, or `LOG_LEVEL` (default: `debug`), plus `SPAN_EVENTS` and
//! `FORCE_COLOR`.
//!
//! Pipeline stages live in sibling modules (`readers`, `weather`, `setpoints`,
//! `compose`, `sink`) and are wired together by `cycle`; this module only
//! assembles them.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod compose;
mod config;
mod cycle;
mod fetch;
mod models;
mod readers;
mod routes;
mod schema;
mod setpoints;
mod sink;
mod weather;

// Shared vocabulary for the pipeline modules, so stages import from the crate
// root rather than from each other.
pub use models::{
    EcoMode, FusedReading, HvacStatus, MeasurementRecord, PartialReading, ResolvedSetpoints,
    Setpoint, SetpointPair, ThermostatMode, ThermostatState, HEADER,
};

use config::{SinkConfig, TokenConfig};
use cycle::MeasurementCycle;
use fetch::{ConfiguredToken, RefreshTokenProvider, ReqwestFetch, StaticToken};
use readers::{StationReader, ThermostatReader};
use sink::{ConfiguredSink, CsvLogSink, PgLogSink};

/// The cycle as wired from configuration.
pub type AppCycle = MeasurementCycle<ReqwestFetch, ConfiguredToken, ConfiguredSink>;

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let client = fetch::build_client(&cfg.user_agent)?;
    let fetcher = Arc::new(ReqwestFetch::new(client.clone()));

    let token = Arc::new(match &cfg.token {
        TokenConfig::Static(token) => ConfiguredToken::Static(StaticToken(token.clone())),
        TokenConfig::Refresh(refresh) => ConfiguredToken::Refresh(RefreshTokenProvider::new(
            client,
            cfg.oauth_token_url.clone(),
            cfg.oauth_client_id.clone(),
            cfg.oauth_client_secret.clone(),
            refresh.clone(),
        )),
    });

    let sink = match &cfg.sink {
        SinkConfig::Csv { path } => ConfiguredSink::Csv(CsvLogSink::new(path)),
        SinkConfig::Postgres { db_url, pool_max } => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(*pool_max)
                .connect(db_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            tracing::info!("Successfully connected to database");

            schema::create_schema(&pool).await?;
            ConfiguredSink::Postgres(PgLogSink::new(pool))
        }
    };

    let cycle = Arc::new(MeasurementCycle::new(
        cfg.stations.clone(),
        StationReader::new(fetcher.clone(), cfg.weather_api_url.clone()),
        ThermostatReader::new(fetcher, token, &cfg.sdm_api_url, &cfg.project_id),
        sink,
    ));

    if cfg.measure_interval_secs > 0 {
        let period = Duration::from_secs(u64::from(cfg.measure_interval_secs));
        tokio::spawn(schedule(cycle.clone(), period));
    } else {
        tracing::info!("Scheduler disabled; cycles run only via POST /measure");
    }

    let app: Router = routes::router(cycle);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run a cycle every `period`, one at a time.
///
/// A failed cycle is logged and the next tick proceeds as normal; late ticks
/// are skipped rather than bunched up.
async fn schedule(cycle: Arc<AppCycle>, period: Duration) {
    // ---
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if let Err(e) = cycle.run().await {
            tracing::error!("Measurement cycle failed: {:#}", e);
        }
    }
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
