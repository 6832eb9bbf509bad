//! Axum HTTP API server for segment extraction.
//!
//! This crate provides:
//! - `POST /api/extract`, running a downloader piped into a transcoder
//! - WebSocket fan-out of every job's diagnostic output
//! - Static serving of produced segments under `/downloads`
//! - Rate limiting, security headers and Prometheus metrics

pub mod broadcast;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use broadcast::{SubscriberRegistry, Subscription};
pub use config::{ApiConfig, SegmentConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::SegmentJobService;
pub use state::AppState;
