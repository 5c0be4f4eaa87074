use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::BoxError;

/// An error produced by the wrapped handler, captured for logging.
///
/// Cloneable so it can ride along in response extensions and still be handed
/// to the error reporter.
#[derive(Clone)]
pub struct HandlerError(Arc<dyn StdError + Send + Sync + 'static>);

impl HandlerError {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }

    pub fn from_boxed(err: BoxError) -> Self {
        Self(Arc::from(err))
    }

    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}
