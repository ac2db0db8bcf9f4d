//! Mapping of pipeline errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;

use super::types::ErrorBody;
use crate::errors::VulnRagError;

impl VulnRagError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInfrastructure(_) | Self::InvalidInput(_) | Self::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MissingReferenceDocument(_) => StatusCode::NOT_FOUND,
            Self::EmbeddingError(_)
            | Self::IndexUnavailable(_)
            | Self::ModelInvocationError(_)
            | Self::HttpError(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for VulnRagError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), kind = self.kind(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            VulnRagError::InvalidInfrastructure("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VulnRagError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VulnRagError::MissingReferenceDocument("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VulnRagError::IndexUnavailable("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            VulnRagError::ModelInvocationError("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            VulnRagError::Timeout {
                stage: "request".into(),
                elapsed: Duration::from_secs(1)
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            VulnRagError::Custom("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = VulnRagError::InvalidInput("bad".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
