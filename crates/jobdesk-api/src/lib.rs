//! Axum HTTP API server for the JobDesk job board.
//!
//! This crate provides:
//! - Registration, login, and profile management for companies and students
//! - Job posting CRUD with role-gated access
//! - Application submission and status management
//! - Rate limiting, security headers, and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod state;

pub use auth::{AuthUser, TokenService};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
