use crate::logger::Logger;

/// Context key under which handlers store extra fields for the access log.
pub const DEFAULT_FIELDS_KEY: &str = "_customfields_";
/// Context key under which a per-request logger override is stored.
pub const DEFAULT_LOGGER_KEY: &str = "_customlogger_";

/// Settings for [`AccessLogLayer`](crate::middleware::AccessLogLayer).
///
/// Fixed once the layer is built and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct AccessLogConfig {
    logger: Logger,
    fields_key: String,
    logger_key: String,
}

impl AccessLogConfig {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            fields_key: DEFAULT_FIELDS_KEY.to_string(),
            logger_key: DEFAULT_LOGGER_KEY.to_string(),
        }
    }

    /// An empty key falls back to [`DEFAULT_FIELDS_KEY`].
    pub fn with_fields_key(mut self, key: impl Into<String>) -> Self {
        self.fields_key = or_default(key.into(), DEFAULT_FIELDS_KEY);
        self
    }

    /// An empty key falls back to [`DEFAULT_LOGGER_KEY`].
    pub fn with_logger_key(mut self, key: impl Into<String>) -> Self {
        self.logger_key = or_default(key.into(), DEFAULT_LOGGER_KEY);
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn fields_key(&self) -> &str {
        &self.fields_key
    }

    pub fn logger_key(&self) -> &str {
        &self.logger_key
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self::new(Logger::tracing())
    }
}

fn or_default(key: String, default: &str) -> String {
    if key.is_empty() {
        default.to_string()
    } else {
        key
    }
}
