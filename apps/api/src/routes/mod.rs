pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::report::handlers as report;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/diagnostics/analysis",
            post(analysis::handle_analysis),
        )
        .route(
            "/api/v1/diagnostics/report",
            post(report::handle_generate_report),
        )
        .with_state(state)
}
