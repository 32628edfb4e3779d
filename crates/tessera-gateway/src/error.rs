//! HTTP mapping of gateway errors

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tessera_kernel::GatewayError;

/// Error returned by admin and authorization handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub GatewayError);

impl ApiError {
    fn code(&self) -> &'static str {
        match &self.0 {
            GatewayError::NotFound(_) => "PROJECT_NOT_FOUND",
            GatewayError::PolicyDenied(_) => "POLICY_DENIED",
            GatewayError::Configuration { .. } => "INVALID_CONFIG",
            GatewayError::ConfigurationFailures { .. } => "CONFIG_NOT_APPLIED",
            GatewayError::HookFailure { .. } => "HOOK_REJECTED",
            GatewayError::InvalidRequest(_) => "INVALID_REQUEST",
            GatewayError::Unauthorized(_) => "UNAUTHORIZED",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut error = json!({
            "code": self.code(),
            "message": self.0.to_string(),
        });
        if let GatewayError::ConfigurationFailures { failures, .. } = &self.0 {
            error["failures"] = failures
                .iter()
                .map(|f| json!({ "facet": f.facet.as_str(), "message": f.message }))
                .collect();
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
