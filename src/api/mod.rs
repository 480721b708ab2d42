//! HTTP surface: scoring form, JSON scoring API, model info, stats and health

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;
pub mod views;

pub use handlers::AppState;
pub use middleware::start_cleanup_task;
pub use routes::create_router;
pub use types::*;
