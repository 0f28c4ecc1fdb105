//! Infrastructure
//!
//! This module contains the ambient service plumbing:
//! - Configuration management
//! - Logging and metrics
//! - HTTP API server

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

pub use api::{start_server, AppState};
