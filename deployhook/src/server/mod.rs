//! HTTP server for the deploy hook
//!
//! # Endpoints
//!
//! - `POST /webhook` - GitHub deliveries; a push to the deploy ref runs the deploy script
//! - `GET /status` - deployment state, uptime and timestamp as JSON
//! - `GET /health` - liveness probe
//!
//! `OPTIONS` on any path is answered as a CORS preflight; unknown paths get
//! a JSON 404.

pub mod error;
pub mod handlers;
pub mod serve;
pub mod state;

pub use error::ApiError;
pub use serve::{build_router, serve};
pub use state::ServerState;
