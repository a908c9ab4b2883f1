mod analysis;
mod config;
mod errors;
mod layout;
mod models;
mod report;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::{default_layout_config, SoftwareSurfaceFactory};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on out-of-range values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Diagnostico API v{}", env!("CARGO_PKG_VERSION"));

    // Layout defaults: A4 page budget, section capacities 3 / 2 / 2
    let layout = default_layout_config();
    info!(
        usable_height_mm = layout.page.usable_height_mm,
        rep_per_page = layout.sections.rep_products,
        "Layout config loaded"
    );
    info!(
        scale = config.raster_scale,
        settle_timeout_ms = config.raster_settle_timeout_ms,
        output_dir = %config.report_output_dir.display(),
        "Rasterization configured"
    );

    let surfaces = SoftwareSurfaceFactory::new();
    if surfaces.font_faces() == 0 {
        warn!("No system fonts found, chart labels will not be drawn");
    } else {
        info!(font_faces = surfaces.font_faces(), "Chart fonts loaded");
    }

    let state = AppState {
        config: config.clone(),
        layout,
        surfaces: Arc::new(surfaces),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
