//! API request and response types

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::models::AnalysisOutcome;
use crate::rag::AnalysisRequest;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of `/api/analyze` and `/api/search`
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub infrastructure: Value,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl From<AnalyzeRequest> for AnalysisRequest {
    fn from(body: AnalyzeRequest) -> Self {
        Self {
            infrastructure: body.infrastructure,
            threshold: body.threshold,
            top_k: body.top_k,
        }
    }
}

/// Analysis result, echoing the submitted infrastructure
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub infrastructure: Value,
    pub analysis: AnalysisOutcome,
    pub graph_warnings: Vec<String>,
}

/// Error body kind, alongside the message
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub kind: String,
}
