//! Access-log middleware.
//!
//! [`AccessLogLayer`] wraps a service and emits exactly one structured record
//! per request once the response body has been fully sent, or dropped:
//!
//! ```text
//! remote_ip, latency, host, request, status, size, user_agent,
//! <extra fields from the request context>, [request_id]
//! ```
//!
//! Severity follows the final status: 5xx is ERROR ("Server: ..."), 4xx is
//! WARN ("Client: ..."), 3xx and everything else INFO ("Redirection: ..." /
//! "Success: ..."). 4xx and 5xx records also carry an `error` field, null when
//! the handler did not fail.
//!
//! Inner-service errors go to the layer's [`ErrorReporter`] to become the
//! response. The wrapped service itself never fails (`Error = Infallible`),
//! so this layer is an observer, not an application's only error handler.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::OriginalUri,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    BoxError,
};
use tower::{Layer, Service, ServiceExt};
use tracing::Level;

use super::body::CountingBody;
use super::client_ip::real_ip;
use super::reporter::{DefaultErrorReporter, ErrorReporter};
use crate::config::AccessLogConfig;
use crate::context::{logger_from_context, RequestContext};
use crate::error::HandlerError;
use crate::logger::{Field, Logger};

pub const X_REQUEST_ID: &str = "x-request-id";

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[derive(Clone)]
pub struct AccessLogLayer {
    config: Arc<AccessLogConfig>,
    reporter: Arc<dyn ErrorReporter>,
}

impl AccessLogLayer {
    pub fn new(config: AccessLogConfig) -> Self {
        Self {
            config: Arc::new(config),
            reporter: Arc::new(DefaultErrorReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog {
            inner,
            config: Arc::clone(&self.config),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

#[derive(Clone)]
pub struct AccessLog<S> {
    inner: S,
    config: Arc<AccessLogConfig>,
    reporter: Arc<dyn ErrorReporter>,
}

impl<S, B> Service<Request<B>> for AccessLog<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // readiness is driven per call by `oneshot`
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let reporter = Arc::clone(&self.reporter);

        Box::pin(async move {
            let context = RequestContext::ensure(request.extensions_mut());

            // Request-local only: an override never leaks into other requests.
            let logger = logger_from_context(&context, config.logger_key())
                .unwrap_or_else(|| config.logger().clone());

            let snapshot = RequestSnapshot::capture(&request);
            let start = Instant::now();

            let (response, error) = match inner.oneshot(request).await {
                Ok(response) => {
                    let error = response.extensions().get::<HandlerError>().cloned();
                    (response, error)
                }
                Err(err) => {
                    let error = HandlerError::from_boxed(err.into());
                    (reporter.report(&error), Some(error))
                }
            };

            let pending = PendingRecord {
                logger,
                snapshot,
                outcome: ResponseOutcome::capture(&response, start.elapsed()),
                extra: context.get::<Vec<Field>>(config.fields_key()),
                error,
            };

            // `size` is only known once the body has been written out.
            Ok(response.map(|body| {
                Body::new(CountingBody::new(body, move |size| pending.emit(size)))
            }))
        })
    }
}

/// Request attributes read before the request is handed to the inner service.
#[derive(Debug, Clone, Default)]
struct RequestSnapshot {
    remote_ip: String,
    host: String,
    request: String,
    user_agent: String,
    request_id: Option<String>,
}

impl RequestSnapshot {
    fn capture<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        let uri = request
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri)
            .unwrap_or(request.uri());

        let host = header_string(headers, header::HOST.as_str())
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            remote_ip: real_ip(headers, request.extensions()),
            host,
            request: format!("{} {}", request.method(), uri),
            user_agent: header_string(headers, header::USER_AGENT.as_str()).unwrap_or_default(),
            request_id: header_string(headers, X_REQUEST_ID),
        }
    }
}

#[derive(Debug, Clone)]
struct ResponseOutcome {
    status: StatusCode,
    latency: Duration,
    request_id: Option<String>,
}

impl ResponseOutcome {
    fn capture(response: &Response, latency: Duration) -> Self {
        Self {
            status: response.status(),
            latency,
            request_id: header_string(response.headers(), X_REQUEST_ID),
        }
    }
}

/// Status class a record is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Server,
    Client,
    Redirection,
    Success,
}

impl Severity {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            500..=u16::MAX => Severity::Server,
            400..=499 => Severity::Client,
            300..=399 => Severity::Redirection,
            _ => Severity::Success,
        }
    }

    pub fn level(self) -> Level {
        match self {
            Severity::Server => Level::ERROR,
            Severity::Client => Level::WARN,
            Severity::Redirection | Severity::Success => Level::INFO,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Server => "Server",
            Severity::Client => "Client",
            Severity::Redirection => "Redirection",
            Severity::Success => "Success",
        }
    }

    pub fn includes_error(self) -> bool {
        matches!(self, Severity::Server | Severity::Client)
    }

    pub fn message(self, status: StatusCode) -> String {
        format!("{}: {}", self.label(), status.canonical_reason().unwrap_or(""))
    }
}

/// Everything a record needs except the body size.
struct PendingRecord {
    logger: Logger,
    snapshot: RequestSnapshot,
    outcome: ResponseOutcome,
    extra: Option<Vec<Field>>,
    error: Option<HandlerError>,
}

impl PendingRecord {
    fn emit(self, size: u64) {
        emit(
            &self.logger,
            &self.snapshot,
            &self.outcome,
            size,
            self.extra,
            self.error.as_ref(),
        );
    }
}

fn emit(
    logger: &Logger,
    snapshot: &RequestSnapshot,
    outcome: &ResponseOutcome,
    size: u64,
    extra: Option<Vec<Field>>,
    error: Option<&HandlerError>,
) {
    let mut fields = base_fields(snapshot, outcome, size);
    if let Some(extra) = extra {
        fields.extend(extra);
    }
    let inbound = snapshot.request_id.as_deref();
    if let Some(field) = request_id_field(inbound, outcome.request_id.as_deref()) {
        fields.push(field);
    }

    let severity = Severity::from_status(outcome.status);
    let message = severity.message(outcome.status);

    if severity.includes_error() {
        logger
            .with([Field::error(error)])
            .log(severity.level(), message, fields);
    } else {
        logger.log(severity.level(), message, fields);
    }
}

fn base_fields(snapshot: &RequestSnapshot, outcome: &ResponseOutcome, size: u64) -> Vec<Field> {
    vec![
        Field::string("remote_ip", snapshot.remote_ip.clone()),
        Field::string("latency", format!("{:?}", outcome.latency)),
        Field::string("host", snapshot.host.clone()),
        Field::string("request", snapshot.request.clone()),
        Field::int("status", i64::from(outcome.status.as_u16())),
        Field::int64("size", i64::try_from(size).unwrap_or(i64::MAX)),
        Field::string("user_agent", snapshot.user_agent.clone()),
    ]
}

/// `request_id` is only emitted when the inbound header is missing, using the
/// response header (possibly empty). A request that arrives with its own id
/// gets no `request_id` field at all.
fn request_id_field(inbound: Option<&str>, outbound: Option<&str>) -> Option<Field> {
    match inbound {
        Some(id) if !id.is_empty() => None,
        _ => Some(Field::string("request_id", outbound.unwrap_or_default())),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
