//! Moonbot Deploy Hook Library
//!
//! Receives GitHub push webhooks, authenticates them, and runs the deploy
//! script for pushes to the deploy branch, one deployment at a time.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod server;
pub mod utils;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
