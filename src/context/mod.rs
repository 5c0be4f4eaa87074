//! Request-scoped key/value store shared between middleware and handlers.
//!
//! A [`RequestContext`] lives in the request extensions. Cloning it clones the
//! handle, not the data, so values written by a handler are visible to the
//! access-log middleware once the handler returns.

mod resolver;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Extensions},
};
use dashmap::DashMap;

use crate::logger::{Field, Logger, SugaredLogger};

pub use resolver::logger_from_context;

/// Values the context knows how to hold.
#[derive(Debug, Clone)]
pub enum ContextValue {
    Logger(Logger),
    SugaredLogger(SugaredLogger),
    Fields(Vec<Field>),
    Text(String),
    Int(i64),
}

impl From<Logger> for ContextValue {
    fn from(value: Logger) -> Self {
        ContextValue::Logger(value)
    }
}

impl From<SugaredLogger> for ContextValue {
    fn from(value: SugaredLogger) -> Self {
        ContextValue::SugaredLogger(value)
    }
}

impl From<Vec<Field>> for ContextValue {
    fn from(value: Vec<Field>) -> Self {
        ContextValue::Fields(value)
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Int(value)
    }
}

/// Typed read out of a [`ContextValue`]. `None` means "not this type".
pub trait FromContextValue: Sized {
    fn from_context_value(value: &ContextValue) -> Option<Self>;
}

impl FromContextValue for Logger {
    fn from_context_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Logger(logger) => Some(logger.clone()),
            _ => None,
        }
    }
}

impl FromContextValue for SugaredLogger {
    fn from_context_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::SugaredLogger(logger) => Some(logger.clone()),
            _ => None,
        }
    }
}

impl FromContextValue for Vec<Field> {
    fn from_context_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Fields(fields) => Some(fields.clone()),
            _ => None,
        }
    }
}

impl FromContextValue for String {
    fn from_context_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl FromContextValue for i64 {
    fn from_context_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: Arc<DashMap<String, ContextValue>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the context already stored in `extensions`, inserting a fresh
    /// one if there is none.
    pub fn ensure(extensions: &mut Extensions) -> Self {
        if let Some(context) = extensions.get::<Self>() {
            return context.clone();
        }
        let context = Self::new();
        extensions.insert(context.clone());
        context
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn value(&self, key: &str) -> Option<ContextValue> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    /// Typed lookup; absent keys and values of another type both yield `None`.
    pub fn get<T: FromContextValue>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|entry| T::from_context_value(entry.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<ContextValue> {
        self.values.remove(key).map(|(_, value)| value)
    }

    /// Appends to the field list under `key`. A value of any other type under
    /// that key is replaced.
    pub fn append_fields(&self, key: impl Into<String>, fields: impl IntoIterator<Item = Field>) {
        let fields: Vec<Field> = fields.into_iter().collect();
        let mut entry = self
            .values
            .entry(key.into())
            .or_insert_with(|| ContextValue::Fields(Vec::new()));

        match entry.value_mut() {
            ContextValue::Fields(existing) => existing.extend(fields),
            other => *other = ContextValue::Fields(fields),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::ensure(&mut parts.extensions))
    }
}
