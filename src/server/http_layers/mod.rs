mod error_details;
mod http_cache;
mod requests_logging;

pub use error_details::error_details;
pub use http_cache::http_cache;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
