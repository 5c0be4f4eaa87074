//! Access-log middleware for axum/tower services.
//!
//! Wraps a handler, times it, and emits one structured record per request
//! with status, latency, client and request metadata. Handlers can add
//! fields, or swap the logger for a single request, through the
//! [`RequestContext`].

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod models;

pub use config::{AccessLogConfig, Config, DEFAULT_FIELDS_KEY, DEFAULT_LOGGER_KEY};
pub use context::{logger_from_context, ContextValue, FromContextValue, RequestContext};
pub use error::{AppError, AppResult, HandlerError};
pub use logger::{
    Field, FieldValue, LogRecord, LogSink, Logger, MemorySink, SugaredLogger, TracingSink,
};
pub use middleware::{AccessLog, AccessLogLayer, DefaultErrorReporter, ErrorReporter};
