use std::borrow::Cow;
use std::fmt;

use tracing::Level;

use super::{Field, FieldValue, Logger};

/// Loose convenience wrapper over a [`Logger`].
///
/// Takes plain messages and untyped key/value pairs instead of prebuilt
/// fields. [`SugaredLogger::desugar`] hands back the strict logger it wraps.
#[derive(Debug, Clone)]
pub struct SugaredLogger {
    base: Logger,
}

impl SugaredLogger {
    pub fn new(base: Logger) -> Self {
        Self { base }
    }

    pub fn desugar(&self) -> Logger {
        self.base.clone()
    }

    pub fn with<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<FieldValue>,
    {
        Self::new(self.base.with(to_fields(pairs)))
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.base.log(Level::INFO, message.to_string(), Vec::new());
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.base.log(Level::WARN, message.to_string(), Vec::new());
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.base.log(Level::ERROR, message.to_string(), Vec::new());
    }

    pub fn infow<K, V>(&self, message: impl fmt::Display, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<Cow<'static, str>>,
        V: Into<FieldValue>,
    {
        self.base.log(Level::INFO, message.to_string(), to_fields(pairs));
    }

    pub fn warnw<K, V>(&self, message: impl fmt::Display, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<Cow<'static, str>>,
        V: Into<FieldValue>,
    {
        self.base.log(Level::WARN, message.to_string(), to_fields(pairs));
    }

    pub fn errorw<K, V>(&self, message: impl fmt::Display, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<Cow<'static, str>>,
        V: Into<FieldValue>,
    {
        self.base.log(Level::ERROR, message.to_string(), to_fields(pairs));
    }
}

fn to_fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Vec<Field>
where
    K: Into<Cow<'static, str>>,
    V: Into<FieldValue>,
{
    pairs.into_iter().map(|(k, v)| Field::new(k, v)).collect()
}
