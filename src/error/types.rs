use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::HandlerError;
use crate::models::ErrorResponse;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String },
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// The response carries the error in its extensions as a [`HandlerError`],
/// which is how the access log sees errors returned by ordinary handlers.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(self.error_code(), self.to_string()));

        tracing::debug!(
            error_code = self.error_code(),
            status_code = %status,
            "Rendering error response"
        );

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(HandlerError::new(self));
        response
    }
}

// Helper methods for creating specific errors
impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable {
            service: service.into(),
        }
    }
}
