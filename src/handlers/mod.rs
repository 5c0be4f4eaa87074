pub mod demo;
pub mod health;

pub use demo::*;
pub use health::*;

use axum::{
    http::{HeaderName, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::AccessLogConfig;
use crate::middleware::{AccessLogLayer, X_REQUEST_ID};

#[derive(Debug, Clone)]
pub struct AppState {
    pub fields_key: String,
}

/// Demo application wrapped in the access log.
///
/// A response `x-request-id` is generated inside the access log when the
/// handler did not set one, so requests without an inbound id still get a
/// `request_id` field.
pub fn create_router(config: AccessLogConfig) -> Router {
    let state = AppState {
        fields_key: config.fields_key().to_string(),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/moved", get(moved_handler))
        .route("/missing", get(missing_handler))
        .route("/unavailable", get(unavailable_handler))
        .route("/fields", get(fields_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(AccessLogLayer::new(config))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static(X_REQUEST_ID),
                    generate_request_id,
                )),
        )
}

fn generate_request_id(_response: &Response) -> Option<HeaderValue> {
    HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()
}
