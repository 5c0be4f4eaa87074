//! Endpoints that walk the access log through each status class.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use super::AppState;
use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::logger::Field;

pub async fn index_handler() -> &'static str {
    "accesslog demo"
}

pub async fn moved_handler() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/")])
}

pub async fn missing_handler() -> AppResult<Json<Value>> {
    Err(AppError::not_found("demo resource"))
}

pub async fn unavailable_handler() -> AppResult<Json<Value>> {
    Err(AppError::service_unavailable("upstream"))
}

/// Adds two fields to this request's access-log record.
pub async fn fields_handler(State(state): State<AppState>, context: RequestContext) -> Json<Value> {
    context.append_fields(
        state.fields_key.as_str(),
        [Field::string("handler", "fields"), Field::int("items", 3)],
    );
    Json(json!({ "fields_added": 2 }))
}
