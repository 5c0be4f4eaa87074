//! Integration tests for the access-log middleware

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use accesslog::{
    handlers::create_router,
    middleware::X_REQUEST_ID,
    AccessLogConfig, AccessLogLayer, AppError, Field, FieldValue, HandlerError, LogRecord,
    Logger, MemorySink, RequestContext, SugaredLogger, DEFAULT_FIELDS_KEY, DEFAULT_LOGGER_KEY,
};
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{
        header::{HOST, USER_AGENT},
        StatusCode,
    },
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::stream;
use http_body_util::BodyExt;
use tower::{service_fn, Layer, ServiceExt};
use tracing::Level;

const BASE_KEYS: [&str; 7] = [
    "remote_ip",
    "latency",
    "host",
    "request",
    "status",
    "size",
    "user_agent",
];

fn capture() -> (MemorySink, AccessLogConfig) {
    let sink = MemorySink::new();
    let config = AccessLogConfig::new(Logger::new(sink.clone()));
    (sink, config)
}

fn get_request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header(HOST, "example.com")
        .body(Body::empty())
        .unwrap()
}

fn only_record(sink: &MemorySink) -> LogRecord {
    let records = sink.records();
    assert_eq!(records.len(), 1, "expected exactly one record, got {:?}", records);
    records.into_iter().next().unwrap()
}

/// The record is written once the body has been sent, so drain it first.
async fn finish(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn text(record: &LogRecord, key: &str) -> String {
    match record.field(key) {
        Some(FieldValue::String(s)) => s.clone(),
        other => panic!("field {} is not a string: {:?}", key, other),
    }
}

fn parse_latency(value: &str) -> Option<f64> {
    for suffix in ["ns", "µs", "ms", "s"] {
        if let Some(number) = value.strip_suffix(suffix) {
            return number.parse::<f64>().ok();
        }
    }
    None
}

async fn extra_fields(context: RequestContext) -> &'static str {
    context.set(
        DEFAULT_FIELDS_KEY,
        vec![Field::string("user", "alice"), Field::int("items", 2)],
    );
    "ok"
}

async fn malformed_fields(context: RequestContext) -> &'static str {
    context.set(DEFAULT_FIELDS_KEY, "user=alice");
    "ok"
}

fn test_app(config: AccessLogConfig) -> Router {
    Router::new()
        .route("/ok", get(|| async { "hello" }))
        .route("/extra", get(extra_fields))
        .route("/malformed", get(malformed_fields))
        .route(
            "/with-response-id",
            get(|| async { ([(X_REQUEST_ID, "resp-1")], "ok") }),
        )
        .route(
            "/missing",
            get(|| async { AppError::not_found("order 9").into_response() }),
        )
        .layer(AccessLogLayer::new(config))
}

#[tokio::test]
async fn test_success_is_info() {
    let (sink, config) = capture();

    let response = test_app(config)
        .oneshot(
            Request::builder()
                .uri("/ok?page=2")
                .header(HOST, "example.com")
                .header(USER_AGENT, "curl/8.5.0")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(sink.is_empty());
    assert_eq!(&finish(response).await[..], b"hello");

    let record = only_record(&sink);
    assert_eq!(record.level, Level::INFO);
    assert_eq!(record.message, "Success: OK");
    assert_eq!(text(&record, "remote_ip"), "203.0.113.7");
    assert_eq!(text(&record, "host"), "example.com");
    assert_eq!(text(&record, "request"), "GET /ok?page=2");
    assert_eq!(text(&record, "user_agent"), "curl/8.5.0");
    assert_eq!(record.field("status"), Some(&FieldValue::Int(200)));
    assert_eq!(record.field("size"), Some(&FieldValue::Int(5)));
    assert!(record.field("error").is_none());
}

#[tokio::test]
async fn test_redirect_is_info() {
    let (sink, config) = capture();

    let response = create_router(config)
        .oneshot(get_request("/moved"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    finish(response).await;

    let record = only_record(&sink);
    assert_eq!(record.level, Level::INFO);
    assert!(record.message.starts_with("Redirection:"));
    assert_eq!(record.message, "Redirection: Moved Permanently");
    assert!(record.field("error").is_none());
}

#[tokio::test]
async fn test_client_error_is_warning_with_error_field() {
    let (sink, config) = capture();

    let response = test_app(config)
        .oneshot(get_request("/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    finish(response).await;

    let record = only_record(&sink);
    assert_eq!(record.level, Level::WARN);
    assert!(record.message.starts_with("Client:"));
    assert_eq!(
        record.field("error"),
        Some(&FieldValue::Error(Some("Not found: order 9".to_string())))
    );
}

#[tokio::test]
async fn test_unrouted_404_has_null_error_field() {
    let (sink, config) = capture();

    let response = test_app(config)
        .oneshot(get_request("/nowhere"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    drop(response);

    let record = only_record(&sink);
    assert_eq!(record.message, "Client: Not Found");
    assert_eq!(record.keys()[0], "error");
    assert_eq!(record.field("error"), Some(&FieldValue::Error(None)));
}

#[tokio::test]
async fn test_failing_service_is_server_error() {
    let (sink, config) = capture();
    let service = AccessLogLayer::new(config).layer(service_fn(|_req: Request| async {
        Err::<Response, _>(AppError::service_unavailable("database"))
    }));

    let response = service.oneshot(get_request("/orders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    finish(response).await;

    let record = only_record(&sink);
    assert_eq!(record.level, Level::ERROR);
    assert_eq!(record.message, "Server: Service Unavailable");
    assert_eq!(
        record.field("error"),
        Some(&FieldValue::Error(Some("Service unavailable: database".to_string())))
    );
}

#[tokio::test]
async fn test_unknown_service_error_goes_through_reporter() {
    let (sink, config) = capture();
    let layer = AccessLogLayer::new(config).with_reporter(|error: &HandlerError| {
        (StatusCode::BAD_GATEWAY, error.to_string()).into_response()
    });
    let service = layer.layer(service_fn(|_req: Request| async {
        Err::<Response, _>(std::io::Error::new(std::io::ErrorKind::Other, "upstream reset"))
    }));

    let response = service.oneshot(get_request("/proxy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(&finish(response).await[..], b"upstream reset");

    let record = only_record(&sink);
    assert_eq!(record.level, Level::ERROR);
    assert_eq!(record.message, "Server: Bad Gateway");
    assert_eq!(
        record.field("error"),
        Some(&FieldValue::Error(Some("upstream reset".to_string())))
    );
}

#[tokio::test]
async fn test_streamed_body_size_is_bytes_sent() {
    let (sink, config) = capture();
    let app = Router::new()
        .route(
            "/stream",
            get(|| async {
                let chunks = stream::iter(vec![
                    Ok::<_, std::io::Error>("hello "),
                    Ok("world"),
                ]);
                Body::from_stream(chunks)
            }),
        )
        .layer(AccessLogLayer::new(config));

    let response = app.oneshot(get_request("/stream")).await.unwrap();
    assert!(response.headers().get("content-length").is_none());
    assert_eq!(&finish(response).await[..], b"hello world");

    assert_eq!(only_record(&sink).field("size"), Some(&FieldValue::Int(11)));
}

#[tokio::test]
async fn test_dropped_body_logs_bytes_sent_so_far() {
    let (sink, config) = capture();
    let app = Router::new()
        .route(
            "/stream",
            get(|| async {
                let chunks = stream::iter(vec![Ok::<_, std::io::Error>("abcd"), Ok("efgh")]);
                Body::from_stream(chunks)
            }),
        )
        .layer(AccessLogLayer::new(config));

    let mut body = app.oneshot(get_request("/stream")).await.unwrap().into_body();
    body.frame().await.unwrap().unwrap();
    assert!(sink.is_empty());
    drop(body);

    let record = only_record(&sink);
    assert_eq!(record.message, "Success: OK");
    assert_eq!(record.field("size"), Some(&FieldValue::Int(4)));
}

#[tokio::test]
async fn test_latency_is_duration_string() {
    let (sink, config) = capture();
    let app = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                "done"
            }),
        )
        .layer(AccessLogLayer::new(config));

    app.oneshot(get_request("/slow")).await.unwrap();

    let record = only_record(&sink);
    let latency = text(&record, "latency");
    let value = parse_latency(&latency).unwrap_or(-1.0);
    assert!(value >= 0.0, "latency {:?} is not a duration", latency);
}

#[tokio::test]
async fn test_extra_fields_follow_base_fields() {
    let (sink, config) = capture();

    test_app(config)
        .oneshot(
            Request::builder()
                .uri("/extra")
                .header(X_REQUEST_ID, "inbound-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let record = only_record(&sink);
    let mut expected = BASE_KEYS.to_vec();
    expected.extend(["user", "items"]);
    assert_eq!(record.keys(), expected);
    assert_eq!(record.field("items"), Some(&FieldValue::Int(2)));
}

#[tokio::test]
async fn test_malformed_extra_fields_are_skipped() {
    let (sink, config) = capture();

    let response = test_app(config)
        .oneshot(
            Request::builder()
                .uri("/malformed")
                .header(X_REQUEST_ID, "inbound-2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    finish(response).await;

    let record = only_record(&sink);
    assert_eq!(record.keys(), BASE_KEYS.to_vec());
}

#[tokio::test]
async fn test_custom_fields_key() {
    let (sink, config) = capture();
    let config = config.with_fields_key("extra");
    let app = Router::new()
        .route(
            "/",
            get(|context: RequestContext| async move {
                context.append_fields("extra", [Field::bool("cached", true)]);
                context.append_fields(DEFAULT_FIELDS_KEY, [Field::bool("ignored", true)]);
                "ok"
            }),
        )
        .layer(AccessLogLayer::new(config));

    app.oneshot(get_request("/")).await.unwrap();

    let record = only_record(&sink);
    assert_eq!(record.field("cached"), Some(&FieldValue::Bool(true)));
    assert!(record.field("ignored").is_none());
}

#[tokio::test]
async fn test_request_id_field_rules() {
    // inbound id present: no request_id field, even with a response id
    let (sink, config) = capture();
    test_app(config)
        .oneshot(
            Request::builder()
                .uri("/with-response-id")
                .header(X_REQUEST_ID, "inbound-3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(only_record(&sink).field("request_id").is_none());

    // no inbound id: response id is used
    let (sink, config) = capture();
    test_app(config)
        .oneshot(get_request("/with-response-id"))
        .await
        .unwrap();
    let record = only_record(&sink);
    assert_eq!(text(&record, "request_id"), "resp-1");
    assert_eq!(record.keys().last(), Some(&"request_id"));

    // neither: empty request_id
    let (sink, config) = capture();
    test_app(config).oneshot(get_request("/ok")).await.unwrap();
    assert_eq!(text(&only_record(&sink), "request_id"), "");
}

#[tokio::test]
async fn test_demo_router_generates_response_request_id() {
    let (sink, config) = capture();

    let response = create_router(config)
        .oneshot(get_request("/health"))
        .await
        .unwrap();
    let generated = response
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    assert!(!generated.is_empty());

    let body = finish(response).await;

    let record = only_record(&sink);
    assert_eq!(text(&record, "request_id"), generated);
    assert_eq!(record.field("size"), Some(&FieldValue::Int(body.len() as i64)));
}

#[tokio::test]
async fn test_demo_fields_endpoint() {
    let (sink, config) = capture();

    create_router(config)
        .oneshot(get_request("/fields"))
        .await
        .unwrap();

    let record = only_record(&sink);
    assert_eq!(text(&record, "handler"), "fields");
    assert_eq!(record.field("items"), Some(&FieldValue::Int(3)));
}

#[tokio::test]
async fn test_nested_router_logs_original_uri() {
    let (sink, config) = capture();
    let app = Router::new()
        .nest("/api", Router::new().route("/items", get(|| async { "items" })))
        .layer(AccessLogLayer::new(config));

    app.oneshot(get_request("/api/items")).await.unwrap();

    assert_eq!(text(&only_record(&sink), "request"), "GET /api/items");
}

async fn sugared_override(
    State(sugared): State<SugaredLogger>,
    mut request: Request,
    next: Next,
) -> Response {
    RequestContext::ensure(request.extensions_mut()).set(DEFAULT_LOGGER_KEY, sugared);
    next.run(request).await
}

#[tokio::test]
async fn test_sugared_override_is_used() {
    let (default_sink, config) = capture();
    let override_sink = MemorySink::new();
    let sugared = Logger::new(override_sink.clone()).sugar();

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(AccessLogLayer::new(config))
        .layer(from_fn_with_state(sugared, sugared_override));

    app.oneshot(get_request("/")).await.unwrap();

    assert!(default_sink.is_empty());
    assert_eq!(override_sink.len(), 1);
}

type Loggers = Arc<HashMap<String, Logger>>;

async fn tenant_logger(
    State(loggers): State<Loggers>,
    mut request: Request,
    next: Next,
) -> Response {
    let tenant = request
        .headers()
        .get("x-tenant")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(logger) = tenant.and_then(|t| loggers.get(&t).cloned()) {
        RequestContext::ensure(request.extensions_mut()).set(DEFAULT_LOGGER_KEY, logger);
    }
    next.run(request).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overrides_stay_per_request() {
    let (default_sink, config) = capture();

    let tenants: Vec<String> = (0..5).map(|i| format!("t{}", i)).collect();
    let sinks: HashMap<String, MemorySink> = tenants
        .iter()
        .map(|t| (t.clone(), MemorySink::new()))
        .collect();
    let loggers: Loggers = Arc::new(
        sinks
            .iter()
            .map(|(t, sink)| (t.clone(), Logger::new(sink.clone())))
            .collect(),
    );

    let app = Router::new()
        .route(
            "/work",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(2)).await;
                "ok"
            }),
        )
        .layer(AccessLogLayer::new(config))
        .layer(from_fn_with_state(loggers, tenant_logger));

    let mut handles = Vec::new();
    for round in 0..10 {
        for tenant in &tenants {
            let app = app.clone();
            let request = Request::builder()
                .uri(format!("/work?tenant={}&round={}", tenant, round))
                .header("x-tenant", tenant.as_str())
                .body(Body::empty())
                .unwrap();
            handles.push(tokio::spawn(async move { app.oneshot(request).await }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(default_sink.is_empty());
    for (tenant, sink) in &sinks {
        let records = sink.records();
        assert_eq!(records.len(), 10, "tenant {}", tenant);
        for record in records {
            let request = text(&record, "request");
            assert!(
                request.contains(&format!("tenant={}&", tenant)),
                "tenant {} logged {}",
                tenant,
                request
            );
        }
    }
}
