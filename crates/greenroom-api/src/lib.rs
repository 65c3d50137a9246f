//! Axum HTTP/WebSocket API server for the Greenroom compositor.
//!
//! This crate provides:
//! - Upload, export/preview request, status and download endpoints
//! - The interactive preview session WebSocket
//! - CORS, request-id and security-header middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod workspace;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::JobService;
pub use state::AppState;
pub use workspace::{JobWorkspace, UploadKind};
