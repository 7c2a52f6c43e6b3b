//! Axum HTTP API server for garment try-on.
//!
//! This crate provides:
//! - One-shot and live try-on endpoints
//! - Background removal and photo uploads
//! - Housekeeping of live results, garment cache and limiter state
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{Housekeeper, TryOnPipeline};
pub use state::AppState;
