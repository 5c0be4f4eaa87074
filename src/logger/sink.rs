use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::Level;

use super::{Field, FieldValue};

/// A finished log entry: severity, message and ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: Vec<Field>,
}

impl LogRecord {
    /// First field with the given key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.key() == key)
            .map(Field::value)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(Field::key).collect()
    }

    pub fn fields_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.key().to_string(), f.value().to_json()))
            .collect()
    }
}

/// Backend that receives finished records. Formatting, routing and level
/// filtering are the sink's business.
pub trait LogSink: Send + Sync {
    fn log(&self, record: LogRecord);
}

/// Forwards records to `tracing` under the `access_log` target.
///
/// The access-log keys become native event fields, so a JSON formatter
/// renders them as numbers and strings. Any other field is collected into a
/// single `fields` JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

macro_rules! access_event {
    ($level:expr, $parts:expr, $message:expr) => {
        tracing::event!(
            target: "access_log",
            $level,
            error = $parts.error,
            remote_ip = $parts.remote_ip,
            latency = $parts.latency,
            host = $parts.host,
            request = $parts.request,
            status = $parts.status,
            size = $parts.size,
            user_agent = $parts.user_agent,
            request_id = $parts.request_id,
            fields = $parts.rest.as_deref(),
            "{}",
            $message
        )
    };
}

impl LogSink for TracingSink {
    fn log(&self, record: LogRecord) {
        let parts = EventParts::from_record(&record);
        let message = &record.message;

        match record.level {
            Level::ERROR => access_event!(Level::ERROR, parts, message),
            Level::WARN => access_event!(Level::WARN, parts, message),
            Level::INFO => access_event!(Level::INFO, parts, message),
            Level::DEBUG => access_event!(Level::DEBUG, parts, message),
            _ => access_event!(Level::TRACE, parts, message),
        }
    }
}

/// A record split into the fixed access-log keys and everything else.
#[derive(Debug, Default, PartialEq)]
struct EventParts<'a> {
    error: Option<&'a str>,
    remote_ip: Option<&'a str>,
    latency: Option<&'a str>,
    host: Option<&'a str>,
    request: Option<&'a str>,
    status: Option<i64>,
    size: Option<i64>,
    user_agent: Option<&'a str>,
    request_id: Option<&'a str>,
    rest: Option<String>,
}

impl<'a> EventParts<'a> {
    fn from_record(record: &'a LogRecord) -> Self {
        let mut parts = EventParts::default();
        let mut rest = Map::new();

        for field in &record.fields {
            let value = field.value();
            let taken = match field.key() {
                "error" => match value {
                    FieldValue::Error(message) => {
                        parts.error = message.as_deref();
                        true
                    }
                    _ => false,
                },
                "status" => take(&mut parts.status, value.as_i64()),
                "size" => take(&mut parts.size, value.as_i64()),
                "remote_ip" => take(&mut parts.remote_ip, value.as_str()),
                "latency" => take(&mut parts.latency, value.as_str()),
                "host" => take(&mut parts.host, value.as_str()),
                "request" => take(&mut parts.request, value.as_str()),
                "user_agent" => take(&mut parts.user_agent, value.as_str()),
                "request_id" => take(&mut parts.request_id, value.as_str()),
                _ => false,
            };
            if !taken {
                rest.insert(field.key().to_string(), value.to_json());
            }
        }

        if !rest.is_empty() {
            parts.rest = Some(Value::Object(rest).to_string());
        }
        parts
    }
}

/// Fills an empty slot; a repeated key or a mistyped value stays in `fields`.
fn take<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match (slot.is_none(), value) {
        (true, Some(value)) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

/// Keeps every record in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
