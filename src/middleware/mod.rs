mod body;
pub mod client_ip;
pub mod logging;
pub mod reporter;

pub use client_ip::real_ip;
pub use logging::{AccessLog, AccessLogLayer, Severity, X_REQUEST_ID};
pub use reporter::{DefaultErrorReporter, ErrorReporter};
