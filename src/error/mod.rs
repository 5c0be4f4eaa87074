mod handler;
mod types;

pub use handler::HandlerError;
pub use types::{AppError, AppResult};
