//! Feed Insights: binary entrypoint.
//! Boots the Axum HTTP server: shared state, daily sweep, metrics.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_insights::config::AppConfig;
use feed_insights::ingest::{config as seeds, scheduler};
use feed_insights::metrics::Metrics;

/// `RUST_LOG` filter (default `feed_insights=info,warn`); `LOG_FORMAT=json`
/// switches to JSON lines. Keeps an already installed subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feed_insights=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    let state = feed_insights::build_state(&cfg)?;

    let seed_list = match &cfg.sources_path {
        Some(path) => seeds::load_sources_from(path),
        None => seeds::load_sources_default(),
    };
    match seed_list {
        Ok(list) if !list.is_empty() => match state.ingest.seed_sources(list).await {
            Ok(n) => tracing::info!(created = n, "source configurations seeded"),
            Err(e) => tracing::warn!(error = %e, "seeding source configurations failed"),
        },
        Ok(_) => {}
        Err(e) => tracing::warn!("ignoring source seeds: {e:#}"),
    }

    if let Err(e) = state.search.init().await {
        tracing::warn!("search index init failed: {e:#}");
    }

    if cfg.schedule.enabled {
        tracing::info!(
            hour = cfg.schedule.hour,
            minute = cfg.schedule.minute,
            retry_failed = cfg.schedule.retry_failed,
            "daily sweep enabled"
        );
        scheduler::spawn_daily_sweep(state.ingest.clone(), cfg.schedule);
    }

    let metrics = Metrics::init(&cfg.pipeline)?;
    let router = feed_insights::create_router(state).merge(metrics.router());

    Ok(router.into())
}
