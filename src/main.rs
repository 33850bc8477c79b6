//! Groundwatch - groundwater station data reconciliation with multi-provider fallback.
//!
//! # API Endpoints
//!
//! - `GET /stations` - Current station list (`?force=true` bypasses the cache)
//! - `GET /stations/search?q=` - Search stations
//! - `GET /stations/filter` - Filter stations by state, district, status and level
//! - `GET /stations/:id/water-levels` - Water-level history
//! - `GET /stations/:id/water-quality` - Latest water-quality sample
//! - `GET /stations/:id/risk` - Depletion risk assessment
//! - `GET /stations/:id/insights` - Station insights
//! - `GET /stations/:id/predictions` - Water-level forecast
//! - `GET /rainfall` - Daily rainfall
//! - `GET /states/:state/stats` - State statistics
//! - `GET /drought` - District drought assessment
//! - `GET /dashboard/stats` - Dashboard summary
//! - `GET /data-source` - Cache and provider status
//! - `POST /cache/clear` - Clear the station cache
//! - `PUT /data-mode` - Switch between real and synthetic data
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use groundwatch::api::{AppState, router};
use groundwatch::config::Config;
use groundwatch::service::DataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("groundwatch=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(
        port = config.port,
        use_real_data = config.use_real_data,
        nwic_configured = config.nwic.base_url.is_some(),
        cache_ttl_secs = config.cache_duration.as_secs(),
        "Starting Groundwatch server"
    );

    let service = DataService::from_config(&config)?;
    let app = router(AppState {
        service: Arc::new(service),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Groundwatch is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
