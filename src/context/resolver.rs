use super::{ContextValue, RequestContext};
use crate::logger::Logger;

/// Looks up a per-request logger override under `key`.
///
/// A strict [`Logger`] is returned as is; a sugared one is desugared. Any
/// other value, or no value, yields `None` and the caller keeps its default.
pub fn logger_from_context(context: &RequestContext, key: &str) -> Option<Logger> {
    match context.value(key)? {
        ContextValue::Logger(logger) => Some(logger),
        ContextValue::SugaredLogger(sugared) => Some(sugared.desugar()),
        _ => None,
    }
}
