//! `tw-service` binary: the axum HTTP/SSE server exposing the marker
//! collection and the three `/simulate*` endpoints.
//!
//! A single `main`, `tracing_subscriber::fmt` + `EnvFilter` bootstrap, CLI
//! config knobs for the simulation defaults (`max_vehicles`,
//! `live_sample_size`, `live_tick_seconds`, `road_cache_ttl`) plus a
//! `--seed` flag so a run is reproducible end-to-end.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tw_core::SimConfig;
use tw_output::SqliteStore;
use tw_service::providers::FallbackOnlyProvider;
use tw_service::{build_router, AppState, Orchestrator};

#[derive(Parser)]
#[command(version, about = "Microscopic urban traffic microsimulation service", long_about = None)]
struct Cli {
    /// TCP port the HTTP/SSE server listens on.
    #[arg(env, long, default_value_t = 8080)]
    port: u16,

    /// Directory the SQLite store's database file lives under.
    #[arg(env, long, default_value = ".")]
    data_dir: PathBuf,

    /// Default simulated duration, in minutes, for requests that omit it.
    #[arg(env, long, default_value_t = 60)]
    duration_minutes: u32,

    /// Default graph-extraction radius, in km, for requests that omit it.
    #[arg(env, long, default_value_t = 3.0)]
    radius_km: f64,

    /// Hard cap on generated demand per run.
    #[arg(env, long, default_value_t = 500)]
    max_vehicles: u32,

    /// Vehicles included per live snapshot.
    #[arg(env, long, default_value_t = 50)]
    live_sample_size: usize,

    /// Live snapshot interval, in simulated seconds.
    #[arg(env, long, default_value_t = 10)]
    live_tick_seconds: u64,

    /// Road-network provider cache TTL, in seconds.
    #[arg(env, long, default_value_t = 600)]
    road_cache_ttl_secs: u64,

    /// Master RNG seed. The same seed reproduces the same run.
    #[arg(env, long, default_value_t = 0)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tw_service=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = SimConfig {
        duration_minutes: cli.duration_minutes,
        radius_km: cli.radius_km,
        max_vehicles: cli.max_vehicles,
        live_sample_size: cli.live_sample_size,
        live_tick_seconds: cli.live_tick_seconds,
        road_cache_ttl_secs: cli.road_cache_ttl_secs,
        seed: cli.seed,
    };

    let provider = Arc::new(FallbackOnlyProvider);
    let orchestrator = Arc::new(Orchestrator::new(config, provider.clone(), provider.clone(), provider));
    let store = Arc::new(SqliteStore::open(&cli.data_dir)?);

    let state = Arc::new(AppState { orchestrator, store });
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!(%addr, "tw-service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
