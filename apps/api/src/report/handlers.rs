//! Axum route handlers for the Report API.

use std::path::PathBuf;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::scoring::MaturityLevel;
use crate::errors::AppError;
use crate::layout::RasterStats;
use crate::models::Evaluation;
use crate::report::artifact::{build_artifact, persist_artifact};
use crate::report::generator::{generate_document, ReportOptions};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub evaluation: Evaluation,
    /// Defaults to the current time. Pass it explicitly to reproduce a document.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub file_name: String,
    pub page_count: usize,
    pub fingerprint: String,
    pub raster: RasterStats,
    pub overall_score: f64,
    pub maturity: MaturityLevel,
    pub html_path: PathBuf,
    pub json_path: PathBuf,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/diagnostics/report
///
/// Generates the full document for one evaluation and persists it as HTML + JSON
/// in the configured output directory.
pub async fn handle_generate_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let evaluation = request.evaluation.validated()?;
    let generated_at = request.generated_at.unwrap_or_else(Utc::now);
    let raster = state.config.raster_config();

    let report = generate_document(
        &evaluation,
        generated_at,
        ReportOptions {
            layout: &state.layout,
            raster: &raster,
            surfaces: state.surfaces.as_ref(),
        },
    )
    .await?;

    let artifact = build_artifact(&report.document)?;
    let persisted = persist_artifact(&artifact, &state.config.report_output_dir).await?;

    info!(
        company = %evaluation.company.name,
        pages = report.document.page_count(),
        fingerprint = %artifact.fingerprint,
        "Report generated"
    );

    Ok(Json(ReportResponse {
        file_name: artifact.html_file_name(),
        page_count: report.document.page_count(),
        fingerprint: artifact.fingerprint,
        raster: report.document.raster_stats(),
        overall_score: report.analysis.overall_score,
        maturity: report.analysis.maturity,
        html_path: persisted.html_path,
        json_path: persisted.json_path,
    }))
}
