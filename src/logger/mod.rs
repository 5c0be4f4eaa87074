//! Structured logger handed to the access-log middleware.
//!
//! A [`Logger`] is a cheap, cloneable handle to a [`LogSink`] plus a set of
//! context fields. Each call produces exactly one [`LogRecord`].

mod field;
mod sink;
mod sugared;

use std::fmt;
use std::sync::Arc;

use tracing::Level;

pub use field::{Field, FieldValue};
pub use sink::{LogRecord, LogSink, MemorySink, TracingSink};
pub use sugared::SugaredLogger;

/// Strict structured logger.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    context: Vec<Field>,
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self::from_sink(Arc::new(sink))
    }

    pub fn from_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            context: Vec::new(),
        }
    }

    /// Logger backed by [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Child logger whose records start with `fields`.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Self {
        let mut context = self.context.clone();
        context.extend(fields);
        Self {
            sink: Arc::clone(&self.sink),
            context,
        }
    }

    pub fn context(&self) -> &[Field] {
        &self.context
    }

    pub fn log(&self, level: Level, message: impl Into<String>, fields: Vec<Field>) {
        let mut all = Vec::with_capacity(self.context.len() + fields.len());
        all.extend(self.context.iter().cloned());
        all.extend(fields);

        self.sink.log(LogRecord {
            level,
            message: message.into(),
            fields: all,
        });
    }

    pub fn info(&self, message: impl Into<String>, fields: Vec<Field>) {
        self.log(Level::INFO, message, fields);
    }

    pub fn warn(&self, message: impl Into<String>, fields: Vec<Field>) {
        self.log(Level::WARN, message, fields);
    }

    pub fn error(&self, message: impl Into<String>, fields: Vec<Field>) {
        self.log(Level::ERROR, message, fields);
    }

    pub fn sugar(&self) -> SugaredLogger {
        SugaredLogger::new(self.clone())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
