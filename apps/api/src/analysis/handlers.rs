//! Axum route handlers for the Analysis API.

use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::analysis::{run_analysis, Analysis};
use crate::errors::AppError;
use crate::models::Evaluation;

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub company: String,
    pub period: String,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// POST /api/v1/diagnostics/analysis
///
/// Scores, insights, ranked recommendations, quick wins and roadmap for one
/// evaluation. Nothing is persisted.
pub async fn handle_analysis(
    Json(evaluation): Json<Evaluation>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let evaluation = evaluation.validated()?;
    info!(company = %evaluation.company.name, "Analysis requested");

    let analysis = run_analysis(&evaluation);

    Ok(Json(AnalysisResponse {
        company: evaluation.company.name,
        period: evaluation.period,
        analysis,
    }))
}
