use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::{AppError, HandlerError};

/// Turns a failed handler into the response the client receives.
///
/// The access log forwards every inner-service error here before logging, so
/// application-wide error rendering still happens in one place.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: &HandlerError) -> Response;
}

impl<F> ErrorReporter for F
where
    F: Fn(&HandlerError) -> Response + Send + Sync + 'static,
{
    fn report(&self, error: &HandlerError) -> Response {
        self(error)
    }
}

/// Renders [`AppError`] with its own status and body, anything else as a
/// bare 500.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorReporter;

impl ErrorReporter for DefaultErrorReporter {
    fn report(&self, error: &HandlerError) -> Response {
        if let Some(app_error) = error.downcast_ref::<AppError>() {
            return app_error.clone().into_response();
        }

        debug!(error = %error, "Unhandled service error, responding with 500");
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        response.extensions_mut().insert(error.clone());
        response
    }
}
