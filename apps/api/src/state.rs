use std::sync::Arc;

use crate::config::Config;
use crate::layout::{LayoutConfig, SurfaceFactory};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Page budget, text metrics and per-section item capacities.
    pub layout: LayoutConfig,
    /// Hands each report generation its own rendering surface.
    pub surfaces: Arc<dyn SurfaceFactory>,
}
