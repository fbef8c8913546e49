//! Error types for the deploy hook
//!
//! Request-level failures are mapped to HTTP responses by
//! `server::ApiError`; `HookError` covers startup and shutdown.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Invalid config file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
