//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with auth, catalog and stream endpoints
//! - JSON handlers for login, session checks and URL minting
//! - Range-aware streaming proxy
//! - Bearer token extraction and stream CORS middleware

pub mod handlers;
pub mod middleware;
pub mod range;
pub mod routes;
pub mod streams;

pub use routes::create_router;
