//! API request handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::types::AnalyzeRequest;
use crate::api::types::AnalyzeResponse;
use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::InfrastructureDescription;
use crate::rag::AnalysisPipeline;
use crate::rag::AnalysisRequest;
use crate::rag::SearchOutcome;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

fn parse_body(body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>) -> Result<AnalyzeRequest> {
    body.map(|Json(body)| body)
        .map_err(|rejection| VulnRagError::InvalidInput(rejection.body_text()))
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Run the two-phase analysis (POST /api/analyze)
pub async fn analyze(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>> {
    let body = parse_body(body)?;
    info!("POST /api/analyze");

    let graph_warnings = InfrastructureDescription::from_value(&body.infrastructure)?.validate();
    let infrastructure = body.infrastructure.clone();
    let analysis = state.pipeline.analyze(AnalysisRequest::from(body)).await?;

    Ok(Json(AnalyzeResponse {
        infrastructure,
        analysis,
        graph_warnings,
    }))
}

/// Retrieve matching references without calling the model (POST /api/search)
pub async fn search(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchOutcome>>> {
    let body = parse_body(body)?;
    info!("POST /api/search");

    let outcome = state.pipeline.search(&AnalysisRequest::from(body)).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
