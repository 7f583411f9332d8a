//! HTTP surface
//!
//! Thin axum layer over the library: handlers validate input, ask the rate
//! limiter, call the orchestrator or the artifact store, and map failures to
//! uniform JSON errors.

pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, start_server, RouterOptions};
pub use state::AppState;
