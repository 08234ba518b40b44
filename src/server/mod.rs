pub mod api_error;
mod archive_routes;
pub mod config;
mod http_layers;
pub mod metrics;
mod page_routes;
pub mod pagination;
pub mod server;
pub(self) mod session;
pub mod state;
mod user_routes;

pub use api_error::ApiError;
pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{COOKIE_SESSION_TOKEN_KEY, HEADER_SESSION_TOKEN_KEY};
